//! CLI handlers for `regimen intake` subcommands.
//!
//! - `regimen intake submit <file>` -- validate and store raw answers
//! - `regimen intake check <file>`  -- normalize and preview, store nothing

use std::io::Read;

use anyhow::{Context, Result};
use serde_json::Value;

use regimen_core::generate::PlanGenerator;
use regimen_core::intake::submit_intake;
use regimen_core::profile::{IntakeProfile, join_tokens, normalize};
use regimen_db::store::Store;

use crate::plan_cmds::{print_structure, print_validation};

/// Read an answers document from a file, or stdin when `file` is `-`.
pub fn read_answers(file: &str) -> Result<Value> {
    let content = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read answers from stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read answers file: {file}"))?
    };
    serde_json::from_str(&content).with_context(|| format!("answers in {file} are not valid JSON"))
}

// -----------------------------------------------------------------------
// regimen intake submit <file>
// -----------------------------------------------------------------------

pub async fn cmd_submit(store: &dyn Store, file: &str, client_ref: Option<&str>) -> Result<()> {
    let answers = read_answers(file)?;
    let (intake, profile) = submit_intake(store, client_ref, &answers).await?;

    println!("Intake stored.");
    println!();
    println!("  Intake ID:   {}", intake.id);
    if let Some(client) = &intake.client_ref {
        println!("  Client:      {client}");
    }
    print_profile(&profile);
    println!();
    println!("Next: run `regimen plan generate {}`.", intake.id);
    Ok(())
}

// -----------------------------------------------------------------------
// regimen intake check <file>
// -----------------------------------------------------------------------

pub async fn cmd_check(generator: &PlanGenerator, file: &str) -> Result<()> {
    let answers = read_answers(file)?;
    let profile = normalize(&answers)?;

    println!("Intake is valid.");
    print_profile(&profile);

    let preview = generator.draft(&profile).await;
    println!(
        "  Template:    {} ({} sets per session)",
        preview.template.split, preview.template.session_set_budget
    );
    println!();
    print_structure(&preview.structure);
    print_validation(&preview.validation);
    Ok(())
}

fn print_profile(profile: &IntakeProfile) {
    println!("  Goal:        {}", profile.goal.label());
    println!("  Days/week:   {}", profile.days_per_week);
    println!("  Session:     {} min", profile.session_length_minutes);
    println!("  Equipment:   {}", join_tokens(&profile.equipment));
    if !profile.injury_flags.is_empty() {
        println!("  Injuries:    {}", join_tokens(&profile.injury_flags));
    }
}
