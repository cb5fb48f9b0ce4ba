//! Store traits the engine writes through, with a PostgreSQL backend and an
//! in-memory backend.
//!
//! ```text
//! PlanGenerator / approval
//!     |
//!     v
//! &dyn Store  (IntakeStore + PlanStore)
//!     |                    |
//!  PgStore (sqlx)     MemoryStore (tests, `serve --in-memory`)
//! ```

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Intake, NewPlan, Plan, PlanStatus, StatusChange};
use crate::queries::{intakes as intake_db, plans as plan_db};

/// Read/write access to raw intake records.
#[async_trait]
pub trait IntakeStore: Send + Sync {
    async fn insert_intake(
        &self,
        client_ref: Option<&str>,
        answers: &serde_json::Value,
    ) -> Result<Intake>;

    async fn get_intake(&self, id: Uuid) -> Result<Option<Intake>>;
}

/// Plan records. Rows are only ever inserted; afterwards the status columns
/// are the single mutation point.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Insert a new draft plan, assigning the next version for its intake.
    async fn insert_plan(&self, new_plan: &NewPlan) -> Result<Plan>;

    async fn get_plan(&self, id: Uuid) -> Result<Option<Plan>>;

    /// All plans, newest first.
    async fn list_plans(&self) -> Result<Vec<Plan>>;

    async fn latest_plan_for_intake(&self, intake_id: Uuid) -> Result<Option<Plan>>;

    /// Apply `change` only if the plan is currently in `change.from()`.
    /// Returns the number of rows changed (`0` or `1`).
    async fn transition_plan_status(&self, id: Uuid, change: &StatusChange) -> Result<u64>;
}

/// Everything the generation and approval pipeline needs.
pub trait Store: IntakeStore + PlanStore {}

impl<T: IntakeStore + PlanStore> Store for T {}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// [`Store`] backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IntakeStore for PgStore {
    async fn insert_intake(
        &self,
        client_ref: Option<&str>,
        answers: &serde_json::Value,
    ) -> Result<Intake> {
        intake_db::insert_intake(&self.pool, client_ref, answers).await
    }

    async fn get_intake(&self, id: Uuid) -> Result<Option<Intake>> {
        intake_db::get_intake(&self.pool, id).await
    }
}

#[async_trait]
impl PlanStore for PgStore {
    async fn insert_plan(&self, new_plan: &NewPlan) -> Result<Plan> {
        plan_db::insert_plan(&self.pool, new_plan).await
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<Plan>> {
        plan_db::get_plan(&self.pool, id).await
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        plan_db::list_plans(&self.pool).await
    }

    async fn latest_plan_for_intake(&self, intake_id: Uuid) -> Result<Option<Plan>> {
        plan_db::latest_plan_for_intake(&self.pool, intake_id).await
    }

    async fn transition_plan_status(&self, id: Uuid, change: &StatusChange) -> Result<u64> {
        plan_db::transition_plan_status(&self.pool, id, change).await
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    intakes: HashMap<Uuid, Intake>,
    /// Insertion order.
    plans: Vec<Plan>,
}

/// [`Store`] kept entirely in process memory. Same semantics as [`PgStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntakeStore for MemoryStore {
    async fn insert_intake(
        &self,
        client_ref: Option<&str>,
        answers: &serde_json::Value,
    ) -> Result<Intake> {
        let intake = Intake {
            id: Uuid::new_v4(),
            client_ref: client_ref.map(str::to_owned),
            answers: answers.clone(),
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .intakes
            .insert(intake.id, intake.clone());
        Ok(intake)
    }

    async fn get_intake(&self, id: Uuid) -> Result<Option<Intake>> {
        Ok(self.state.read().await.intakes.get(&id).cloned())
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn insert_plan(&self, new_plan: &NewPlan) -> Result<Plan> {
        let mut state = self.state.write().await;
        if !state.intakes.contains_key(&new_plan.intake_id) {
            anyhow::bail!("intake {} not found", new_plan.intake_id);
        }
        let version = state
            .plans
            .iter()
            .filter(|p| p.intake_id == new_plan.intake_id)
            .map(|p| p.version)
            .max()
            .unwrap_or(0)
            + 1;
        let plan = Plan {
            id: Uuid::new_v4(),
            intake_id: new_plan.intake_id,
            client_ref: new_plan.client_ref.clone(),
            version,
            status: PlanStatus::Draft,
            structure: new_plan.structure.clone(),
            validation: new_plan.validation.clone(),
            catalog_version: new_plan.catalog_version.clone(),
            used_fallback: new_plan.used_fallback,
            created_at: Utc::now(),
            approved_at: None,
            approved_by: None,
            sent_at: None,
            delivery_channel: None,
        };
        state.plans.push(plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<Plan>> {
        let state = self.state.read().await;
        Ok(state.plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        let state = self.state.read().await;
        Ok(state.plans.iter().rev().cloned().collect())
    }

    async fn latest_plan_for_intake(&self, intake_id: Uuid) -> Result<Option<Plan>> {
        let state = self.state.read().await;
        Ok(state
            .plans
            .iter()
            .filter(|p| p.intake_id == intake_id)
            .max_by_key(|p| p.version)
            .cloned())
    }

    async fn transition_plan_status(&self, id: Uuid, change: &StatusChange) -> Result<u64> {
        let mut state = self.state.write().await;
        let Some(plan) = state
            .plans
            .iter_mut()
            .find(|p| p.id == id && p.status == change.from())
        else {
            return Ok(0);
        };

        plan.status = change.to();
        match change {
            StatusChange::Approve { approved_by } => {
                plan.approved_at = Some(Utc::now());
                plan.approved_by = Some(approved_by.clone());
            }
            StatusChange::MarkSent { channel } => {
                plan.sent_at = Some(Utc::now());
                plan.delivery_channel = Some(channel.clone());
            }
        }
        Ok(1)
    }
}
