//! Intake submission and profile loading.

use tracing::info;
use uuid::Uuid;

use regimen_db::models::Intake;
use regimen_db::store::{IntakeStore, Store};

use crate::error::PlanError;
use crate::profile::{IntakeProfile, normalize};

/// Validate raw answers and store them. Invalid answers are rejected with
/// every offending field and nothing is stored.
pub async fn submit_intake(
    store: &dyn Store,
    client_ref: Option<&str>,
    answers: &serde_json::Value,
) -> Result<(Intake, IntakeProfile), PlanError> {
    let profile = normalize(answers)?;
    let intake = store.insert_intake(client_ref, answers).await?;
    info!(intake_id = %intake.id, goal = %profile.goal, "intake stored");
    Ok((intake, profile))
}

/// Fetch an intake and normalize its answers.
pub async fn load_profile(store: &dyn Store, intake_id: Uuid) -> Result<IntakeProfile, PlanError> {
    let (_, profile) = load_intake(store, intake_id).await?;
    Ok(profile)
}

pub(crate) async fn load_intake(
    store: &dyn Store,
    intake_id: Uuid,
) -> Result<(Intake, IntakeProfile), PlanError> {
    let intake = store
        .get_intake(intake_id)
        .await?
        .ok_or_else(|| PlanError::intake_not_found(intake_id))?;
    let profile = normalize(&intake.answers)?;
    Ok((intake, profile))
}
