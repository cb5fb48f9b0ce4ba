//! Plan approval state machine.
//!
//! Enforces the forward-only lifecycle:
//!
//! ```text
//! draft    -> approved   (passing validation + trainer approval)
//! approved -> sent       (confirmed delivery; repeat confirmations are no-ops)
//! ```
//!
//! A plan's structure never changes. Correcting a rejected draft means
//! generating a new plan version.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use regimen_db::models::{Plan, PlanStatus, StatusChange};
use regimen_db::store::{PlanStore, Store};

use crate::error::PlanError;
use crate::intake::load_profile;
use crate::plan::PlanStructure;
use crate::validate::validate_plan;

pub struct PlanStateMachine;

impl PlanStateMachine {
    /// Whether `from -> to` is an edge of the lifecycle graph.
    pub fn is_valid_transition(from: PlanStatus, to: PlanStatus) -> bool {
        matches!(
            (from, to),
            (PlanStatus::Draft, PlanStatus::Approved) | (PlanStatus::Approved, PlanStatus::Sent)
        )
    }
}

/// The external trainer decision on a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerDecision {
    pub approved: bool,
    /// Identity of the trainer making the call.
    pub trainer: String,
}

#[derive(Debug, Clone)]
pub enum ApprovalOutcome {
    Approved(Plan),
    /// The trainer said no. The plan stays in draft.
    Declined(Plan),
}

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Sent(Plan),
    /// Delivery was already confirmed; nothing changed.
    AlreadySent(Plan),
}

async fn fetch_plan(store: &dyn Store, plan_id: Uuid) -> Result<Plan, PlanError> {
    store
        .get_plan(plan_id)
        .await?
        .ok_or_else(|| PlanError::plan_not_found(plan_id))
}

/// Apply a trainer decision to a draft plan.
///
/// The stored structure is re-validated against the intake profile before
/// the status moves; a failing plan is rejected with its violations and
/// stays in draft.
pub async fn approve(
    store: &dyn Store,
    plan_id: Uuid,
    decision: &TrainerDecision,
) -> Result<ApprovalOutcome, PlanError> {
    let plan = fetch_plan(store, plan_id).await?;
    if plan.status != PlanStatus::Draft {
        return Err(PlanError::IllegalTransition {
            plan_id,
            from: plan.status,
            to: PlanStatus::Approved,
        });
    }

    let structure = PlanStructure::from_document(&plan.structure)
        .with_context(|| format!("plan {plan_id} has an unreadable structure document"))?;
    let profile = load_profile(store, plan.intake_id).await?;
    let validation = validate_plan(&structure, &profile);
    if !validation.pass {
        info!(plan_id = %plan_id, violations = validation.violations.len(), "approval blocked by validation");
        return Err(PlanError::ValidationFailed {
            plan_id,
            violations: validation.violations,
        });
    }

    if !decision.approved {
        info!(plan_id = %plan_id, trainer = %decision.trainer, "plan declined by trainer");
        return Ok(ApprovalOutcome::Declined(plan));
    }

    let change = StatusChange::Approve {
        approved_by: decision.trainer.clone(),
    };
    let plan = apply(store, plan_id, &change).await?;
    info!(plan_id = %plan_id, trainer = %decision.trainer, "plan approved");
    Ok(ApprovalOutcome::Approved(plan))
}

/// Record confirmed delivery of an approved plan. Confirming an already
/// sent plan again changes nothing.
pub async fn mark_sent(
    store: &dyn Store,
    plan_id: Uuid,
    channel: &str,
) -> Result<SendOutcome, PlanError> {
    let plan = fetch_plan(store, plan_id).await?;
    match plan.status {
        PlanStatus::Sent => return Ok(SendOutcome::AlreadySent(plan)),
        PlanStatus::Draft => {
            return Err(PlanError::IllegalTransition {
                plan_id,
                from: PlanStatus::Draft,
                to: PlanStatus::Sent,
            });
        }
        PlanStatus::Approved => {}
    }

    let change = StatusChange::MarkSent {
        channel: channel.to_owned(),
    };
    match apply(store, plan_id, &change).await {
        Ok(plan) => {
            info!(plan_id = %plan_id, channel, "plan marked sent");
            Ok(SendOutcome::Sent(plan))
        }
        // A concurrent confirmation won the race.
        Err(PlanError::IllegalTransition {
            from: PlanStatus::Sent,
            ..
        }) => Ok(SendOutcome::AlreadySent(fetch_plan(store, plan_id).await?)),
        Err(e) => Err(e),
    }
}

/// Guarded status update. A zero row count means the plan moved since it
/// was read.
async fn apply(store: &dyn Store, plan_id: Uuid, change: &StatusChange) -> Result<Plan, PlanError> {
    let (from, to) = (change.from(), change.to());
    debug_assert!(PlanStateMachine::is_valid_transition(from, to));

    let rows = store
        .transition_plan_status(plan_id, change)
        .await
        .with_context(|| format!("failed to transition plan {plan_id} from {from} to {to}"))?;

    let current = fetch_plan(store, plan_id).await?;
    if rows == 0 {
        return Err(PlanError::IllegalTransition {
            plan_id,
            from: current.status,
            to,
        });
    }
    Ok(current)
}
