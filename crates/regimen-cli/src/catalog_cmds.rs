//! CLI handlers for `regimen catalog` subcommands.

use std::path::Path;

use anyhow::{Context, Result};

use regimen_core::catalog::{Catalog, ExerciseRecord, MovementPattern};
use regimen_core::profile::join_tokens;

use crate::CatalogCommands;
use crate::config::RegimenConfig;

pub fn run_catalog_command(command: &CatalogCommands, config: &RegimenConfig) -> Result<()> {
    match command {
        CatalogCommands::List { pattern } => {
            let pattern = pattern
                .as_deref()
                .map(|p| p.parse::<MovementPattern>())
                .transpose()
                .context("invalid --pattern")?;
            let catalog = config.load_catalog()?;
            cmd_list(&catalog, pattern);
            Ok(())
        }
        CatalogCommands::Check { path } => cmd_check(path),
    }
}

fn listed(catalog: &Catalog, pattern: Option<MovementPattern>) -> Vec<&ExerciseRecord> {
    catalog
        .exercises()
        .iter()
        .filter(|e| pattern.is_none_or(|p| e.pattern == p))
        .collect()
}

fn cmd_list(catalog: &Catalog, pattern: Option<MovementPattern>) {
    let records = listed(catalog, pattern);
    if records.is_empty() {
        println!("No exercises found.");
        return;
    }

    let id_w = records.iter().map(|e| e.id.len()).max().unwrap_or(2).max(2);
    let pattern_w = records
        .iter()
        .map(|e| e.pattern.as_str().len())
        .max()
        .unwrap_or(7)
        .max(7);
    let equip_w = records
        .iter()
        .map(|e| equipment_label(e).len())
        .max()
        .unwrap_or(9)
        .max(9);

    println!(
        "{:<id_w$}  {:<pattern_w$}  {:<equip_w$}  {:>4}  AVOID WITH",
        "ID", "PATTERN", "EQUIPMENT", "REPS",
    );
    for e in &records {
        let avoid = if e.contraindications.is_empty() {
            "-".to_string()
        } else {
            join_tokens(&e.contraindications)
        };
        let marker = if e.fallback { " (fallback)" } else { "" };
        println!(
            "{:<id_w$}  {:<pattern_w$}  {:<equip_w$}  {:>4}  {avoid}{marker}",
            e.id,
            e.pattern,
            equipment_label(e),
            e.default_reps,
        );
    }
    println!();
    println!(
        "{} exercise(s), catalog version {}",
        records.len(),
        catalog.version()
    );
}

fn equipment_label(record: &ExerciseRecord) -> String {
    if record.equipment.is_empty() {
        "bodyweight".to_string()
    } else {
        join_tokens(&record.equipment)
    }
}

fn cmd_check(path: &Path) -> Result<()> {
    let catalog = Catalog::from_path(path)
        .with_context(|| format!("exercise library {} is invalid", path.display()))?;

    println!("Exercise library is valid.");
    println!();
    println!("  Path:        {}", path.display());
    println!("  Version:     {}", catalog.version());
    println!("  Exercises:   {}", catalog.len());
    println!("  Patterns:    {}", catalog.patterns().len());
    Ok(())
}
