//! CLI handlers for `regimen plan` subcommands.
//!
//! Implements:
//! - `regimen plan generate <intake-id>` -- generate (or reuse) a draft
//! - `regimen plan show [plan-id]`       -- show plan details or list all plans
//! - `regimen plan validate <plan-id>`   -- re-run validation on a stored plan
//! - `regimen plan approve <plan-id>`    -- record the trainer's decision
//! - `regimen plan sent <plan-id>`       -- confirm delivery
//! - `regimen plan export <plan-id>`     -- write the structure document as JSON

use anyhow::{Context, Result};
use uuid::Uuid;

use regimen_core::PlanError;
use regimen_core::approval::{ApprovalOutcome, SendOutcome, TrainerDecision, approve, mark_sent};
use regimen_core::generate::{GenerateMode, PlanGenerator};
use regimen_core::intake::load_profile;
use regimen_core::plan::PlanStructure;
use regimen_core::validate::{ValidationResult, Violation, validate_plan};
use regimen_db::models::Plan;
use regimen_db::store::{PlanStore, Store};

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: &PlanCommands, generator: &PlanGenerator) -> Result<()> {
    match command {
        PlanCommands::Generate {
            intake_id,
            regenerate,
        } => cmd_generate(generator, intake_id, *regenerate).await,
        PlanCommands::Show { plan_id } => match plan_id {
            Some(id) => cmd_show_one(generator.store(), id).await,
            None => cmd_show_all(generator.store()).await,
        },
        PlanCommands::Validate { plan_id } => cmd_validate(generator.store(), plan_id).await,
        PlanCommands::Approve {
            plan_id,
            trainer,
            decline,
        } => cmd_approve(generator.store(), plan_id, trainer, !*decline).await,
        PlanCommands::Sent { plan_id, channel } => {
            cmd_sent(generator.store(), plan_id, channel).await
        }
        PlanCommands::Export { plan_id, output } => {
            cmd_export(generator.store(), plan_id, output.as_deref()).await
        }
    }
}

fn parse_id(kind: &str, raw: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("invalid {kind} ID: {raw:?}"))
}

async fn fetch_plan(store: &dyn Store, plan_id: Uuid) -> Result<Plan> {
    store
        .get_plan(plan_id)
        .await?
        .with_context(|| format!("plan {plan_id} not found"))
}

// -----------------------------------------------------------------------
// regimen plan generate <intake-id>
// -----------------------------------------------------------------------

async fn cmd_generate(generator: &PlanGenerator, intake_id: &str, regenerate: bool) -> Result<()> {
    let intake_id = parse_id("intake", intake_id)?;
    let mode = if regenerate {
        GenerateMode::Regenerate
    } else {
        GenerateMode::Reuse
    };

    let outcome = generator.generate(intake_id, mode).await?;

    if outcome.reused {
        println!("Existing plan returned (use --regenerate for a new version).");
    } else {
        println!("Plan generated successfully.");
    }
    println!();
    print_summary(&outcome.plan);
    println!();
    print_structure(&outcome.structure);
    print_validation(&outcome.validation);
    Ok(())
}

// -----------------------------------------------------------------------
// regimen plan show
// -----------------------------------------------------------------------

/// List all plans with summary info.
async fn cmd_show_all(store: &dyn Store) -> Result<()> {
    let plans = store.list_plans().await?;

    if plans.is_empty() {
        println!("No plans found. Use `regimen plan generate <intake-id>` to create one.");
        return Ok(());
    }

    // IDs are 36 chars; "approved" is the longest status.
    let id_w = 36;
    let client_w = plans
        .iter()
        .filter_map(|p| p.client_ref.as_deref())
        .map(str::len)
        .max()
        .unwrap_or(6)
        .max(6);
    let status_w = 8;
    let ver_w = 3;

    println!(
        "{:<id_w$}  {:<client_w$}  {:>ver_w$}  {:<status_w$}  VALID  CREATED",
        "ID", "CLIENT", "VER", "STATUS",
    );

    for plan in &plans {
        let client = plan.client_ref.as_deref().unwrap_or("-");
        let valid = match plan.validation.get("pass").and_then(|v| v.as_bool()) {
            Some(true) => "yes",
            Some(false) => "no",
            None => "?",
        };
        let created = plan.created_at.format("%Y-%m-%d %H:%M");
        println!(
            "{:<id_w$}  {:<client_w$}  {:>ver_w$}  {:<status_w$}  {:<5}  {}",
            plan.id, client, plan.version, plan.status, valid, created,
        );
    }

    Ok(())
}

async fn cmd_show_one(store: &dyn Store, plan_id: &str) -> Result<()> {
    let plan = fetch_plan(store, parse_id("plan", plan_id)?).await?;
    let structure = PlanStructure::from_document(&plan.structure)
        .with_context(|| format!("plan {} has an unreadable structure document", plan.id))?;
    let validation: ValidationResult = serde_json::from_value(plan.validation.clone())
        .with_context(|| format!("plan {} has an unreadable validation document", plan.id))?;

    print_summary(&plan);
    println!();
    print_structure(&structure);
    print_validation(&validation);
    Ok(())
}

// -----------------------------------------------------------------------
// regimen plan validate <plan-id>
// -----------------------------------------------------------------------

/// Validate the stored structure against the intake it was generated from.
async fn cmd_validate(store: &dyn Store, plan_id: &str) -> Result<()> {
    let plan = fetch_plan(store, parse_id("plan", plan_id)?).await?;
    let structure = PlanStructure::from_document(&plan.structure)
        .with_context(|| format!("plan {} has an unreadable structure document", plan.id))?;
    let profile = load_profile(store, plan.intake_id).await?;

    let result = validate_plan(&structure, &profile);
    println!("Plan {} (version {}, {})", plan.id, plan.version, plan.status);
    print_validation(&result);

    if !result.pass {
        anyhow::bail!("plan {} does not pass validation", plan.id);
    }
    Ok(())
}

// -----------------------------------------------------------------------
// regimen plan approve <plan-id> --trainer <who>
// -----------------------------------------------------------------------

async fn cmd_approve(store: &dyn Store, plan_id: &str, trainer: &str, approved: bool) -> Result<()> {
    let plan_id = parse_id("plan", plan_id)?;
    let decision = TrainerDecision {
        approved,
        trainer: trainer.to_string(),
    };

    match approve(store, plan_id, &decision).await {
        Ok(ApprovalOutcome::Approved(plan)) => {
            println!("Plan approved.");
            println!();
            print_summary(&plan);
            Ok(())
        }
        Ok(ApprovalOutcome::Declined(plan)) => {
            println!("Plan declined by {trainer}; it remains a draft.");
            println!("Regenerate with `regimen plan generate {} --regenerate`.", plan.intake_id);
            Ok(())
        }
        Err(PlanError::ValidationFailed {
            plan_id,
            violations,
        }) => {
            println!("Plan {plan_id} cannot be approved:");
            print_violations(&violations);
            anyhow::bail!(
                "plan {plan_id} failed validation with {} violation(s)",
                violations.len()
            )
        }
        Err(e) => Err(e.into()),
    }
}

// -----------------------------------------------------------------------
// regimen plan sent <plan-id>
// -----------------------------------------------------------------------

async fn cmd_sent(store: &dyn Store, plan_id: &str, channel: &str) -> Result<()> {
    let plan_id = parse_id("plan", plan_id)?;
    match mark_sent(store, plan_id, channel).await? {
        SendOutcome::Sent(plan) => {
            println!("Plan marked as sent.");
            println!();
            print_summary(&plan);
        }
        SendOutcome::AlreadySent(plan) => {
            let when = plan
                .sent_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("Plan {} was already sent at {when}; nothing changed.", plan.id);
        }
    }
    Ok(())
}

// -----------------------------------------------------------------------
// regimen plan export <plan-id> [--output <file>]
// -----------------------------------------------------------------------

async fn cmd_export(store: &dyn Store, plan_id: &str, output: Option<&str>) -> Result<()> {
    let plan = fetch_plan(store, parse_id("plan", plan_id)?).await?;
    let content =
        serde_json::to_string_pretty(&plan.structure).context("failed to encode plan structure")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{content}\n"))
                .with_context(|| format!("failed to write to {path}"))?;
            println!("Plan exported to {path}");
        }
        None => {
            println!("{content}");
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Rendering
// -----------------------------------------------------------------------

fn print_summary(plan: &Plan) {
    println!("  Plan ID:      {}", plan.id);
    println!("  Intake ID:    {}", plan.intake_id);
    if let Some(client) = &plan.client_ref {
        println!("  Client:       {client}");
    }
    println!("  Version:      {}", plan.version);
    println!("  Status:       {}", plan.status);
    println!("  Catalog:      {}", short_version(&plan.catalog_version));
    println!(
        "  Suggestions:  {}",
        if plan.used_fallback {
            "deterministic"
        } else {
            "provider"
        }
    );
    println!(
        "  Created:      {}",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let (Some(at), Some(by)) = (plan.approved_at, &plan.approved_by) {
        println!(
            "  Approved:     {} by {by}",
            at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(at) = plan.sent_at {
        println!(
            "  Sent:         {} via {}",
            at.format("%Y-%m-%d %H:%M:%S UTC"),
            plan.delivery_channel.as_deref().unwrap_or("-")
        );
    }
}

fn short_version(version: &str) -> &str {
    version.get(..12).unwrap_or(version)
}

pub fn print_structure(structure: &PlanStructure) {
    println!("Split: {}", structure.split);
    for week in &structure.weeks {
        println!();
        println!("{}", week.title);
        println!("  Schedule:     {}", week.schedule.join(", "));
        println!("  Warm-up:      {}", week.warmup.join(", "));
        println!("  Main sets:");
        for set in &week.main_sets {
            println!("    [{}] {}", set.session, set.line());
        }
        if !week.accessories.is_empty() {
            println!("  Accessories:");
            for set in &week.accessories {
                println!("    [{}] {}", set.session, set.line());
            }
        }
        println!("  Cool-down:    {}", week.cooldown.join(", "));
        if !week.notes.is_empty() {
            println!("  Notes:");
            for line in week.notes.lines() {
                println!("    {line}");
            }
        }
    }
    println!();
}

pub fn print_validation(result: &ValidationResult) {
    let errors = result.errors().count();
    if result.pass {
        println!("Validation: PASS");
    } else {
        println!("Validation: FAIL ({errors} error(s))");
    }
    print_violations(&result.violations);
}

fn print_violations(violations: &[Violation]) {
    for v in violations {
        println!("  - {v}");
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
