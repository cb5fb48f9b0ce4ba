//! Database query functions for the `intakes` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Intake;

/// Store raw intake answers and return the new row.
pub async fn insert_intake(
    pool: &PgPool,
    client_ref: Option<&str>,
    answers: &serde_json::Value,
) -> Result<Intake> {
    let intake = sqlx::query_as::<_, Intake>(
        "INSERT INTO intakes (client_ref, answers) VALUES ($1, $2) RETURNING *",
    )
    .bind(client_ref)
    .bind(answers)
    .fetch_one(pool)
    .await
    .context("failed to insert intake")?;

    Ok(intake)
}

/// Fetch an intake by its ID.
pub async fn get_intake(pool: &PgPool, id: Uuid) -> Result<Option<Intake>> {
    let intake = sqlx::query_as::<_, Intake>("SELECT * FROM intakes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch intake")?;

    Ok(intake)
}
