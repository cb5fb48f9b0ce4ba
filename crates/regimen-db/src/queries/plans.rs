//! Database query functions for the `plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewPlan, Plan, StatusChange};

/// Insert a new draft plan. The version is one past the highest existing
/// version for the same intake.
pub async fn insert_plan(pool: &PgPool, new_plan: &NewPlan) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans \
             (intake_id, client_ref, version, structure, validation, catalog_version, used_fallback) \
         VALUES ($1, $2, \
             (SELECT COALESCE(MAX(version), 0) + 1 FROM plans WHERE intake_id = $1), \
             $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new_plan.intake_id)
    .bind(&new_plan.client_ref)
    .bind(&new_plan.structure)
    .bind(&new_plan.validation)
    .bind(&new_plan.catalog_version)
    .bind(new_plan.used_fallback)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to insert plan for intake {}", new_plan.intake_id))?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List all plans, newest first.
pub async fn list_plans(pool: &PgPool) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>("SELECT * FROM plans ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .context("failed to list plans")?;

    Ok(plans)
}

/// The highest-version plan generated from an intake, if any.
pub async fn latest_plan_for_intake(pool: &PgPool, intake_id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE intake_id = $1 ORDER BY version DESC LIMIT 1",
    )
    .bind(intake_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch latest plan for intake")?;

    Ok(plan)
}

/// Apply a forward status change guarded by the expected source status.
///
/// Returns the number of rows updated: `0` means the plan does not exist or
/// is not in the change's source status.
pub async fn transition_plan_status(pool: &PgPool, id: Uuid, change: &StatusChange) -> Result<u64> {
    let result = match change {
        StatusChange::Approve { approved_by } => {
            sqlx::query(
                "UPDATE plans \
                 SET status = 'approved', approved_at = now(), approved_by = $2 \
                 WHERE id = $1 AND status = 'draft'",
            )
            .bind(id)
            .bind(approved_by)
            .execute(pool)
            .await
        }
        StatusChange::MarkSent { channel } => {
            sqlx::query(
                "UPDATE plans \
                 SET status = 'sent', sent_at = now(), delivery_channel = $2 \
                 WHERE id = $1 AND status = 'approved'",
            )
            .bind(id)
            .bind(channel)
            .execute(pool)
            .await
        }
    }
    .with_context(|| format!("failed to move plan {id} to {}", change.to()))?;

    Ok(result.rows_affected())
}
