//! Errors surfaced by the generation and approval pipeline.

use uuid::Uuid;

use regimen_db::models::PlanStatus;

use crate::profile::IntakeError;
use crate::validate::Violation;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Raw answers did not normalize. Nothing was stored.
    #[error(transparent)]
    InvalidIntake(#[from] IntakeError),

    /// The plan failed at least one error-severity rule and stays in draft.
    #[error("plan {plan_id} failed validation with {} violation(s)", violations.len())]
    ValidationFailed {
        plan_id: Uuid,
        violations: Vec<Violation>,
    },

    #[error("plan {plan_id} cannot move from {from} to {to}")]
    IllegalTransition {
        plan_id: Uuid,
        from: PlanStatus,
        to: PlanStatus,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("generation already in progress for intake {0}")]
    GenerationInProgress(Uuid),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PlanError {
    pub(crate) fn intake_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "intake", id }
    }

    pub(crate) fn plan_not_found(id: Uuid) -> Self {
        Self::NotFound { kind: "plan", id }
    }
}
