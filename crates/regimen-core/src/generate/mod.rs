//! Plan generation service.
//!
//! ```text
//! intake id --> load + normalize --> select_template --> [suggester, bounded]
//!                                                               |
//!            insert draft <-- validate_plan <-- assemble_plan <-+
//! ```
//!
//! At most one generation runs per intake id. By default a finished plan is
//! reused rather than regenerated, so repeated requests for the same intake
//! never fork into divergent drafts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};
use uuid::Uuid;

use regimen_db::models::{NewPlan, Plan};
use regimen_db::store::{PlanStore, Store};

use crate::catalog::Catalog;
use crate::error::PlanError;
use crate::intake::load_intake;
use crate::plan::{PlanStructure, assemble_plan};
use crate::profile::IntakeProfile;
use crate::suggest::{Advice, ContentSuggester, SuggestionError, SuggestionRequest};
use crate::template::{PlanTemplate, select_template};
use crate::validate::{ValidationResult, validate_plan};

/// Default bound on a content-suggestion call.
pub const DEFAULT_SUGGESTION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub suggestion_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            suggestion_timeout: DEFAULT_SUGGESTION_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerateMode {
    /// Return the intake's latest plan if one exists.
    #[default]
    Reuse,
    /// Always create a new plan version.
    Regenerate,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub plan: Plan,
    pub structure: PlanStructure,
    pub validation: ValidationResult,
    /// `true` when an existing plan was returned instead of a new one.
    pub reused: bool,
}

/// An unsaved plan, as produced for a profile right now.
#[derive(Debug, Clone)]
pub struct DraftPreview {
    pub template: PlanTemplate,
    pub structure: PlanStructure,
    pub validation: ValidationResult,
    pub used_fallback: bool,
}

pub struct PlanGenerator {
    store: Arc<dyn Store>,
    catalog: Arc<Catalog>,
    suggester: Option<Arc<dyn ContentSuggester>>,
    config: GenerationConfig,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Holds an intake id in the in-flight set until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<Uuid>>,
    intake_id: Uuid,
}

impl<'a> InFlightGuard<'a> {
    fn claim(set: &'a Mutex<HashSet<Uuid>>, intake_id: Uuid) -> Option<Self> {
        let mut ids = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(intake_id) {
            return None;
        }
        Some(Self { set, intake_id })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.intake_id);
    }
}

impl PlanGenerator {
    pub fn new(store: Arc<dyn Store>, catalog: Arc<Catalog>) -> Self {
        Self {
            store,
            catalog,
            suggester: None,
            config: GenerationConfig::default(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn ContentSuggester>) -> Self {
        self.suggester = Some(suggester);
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Generate (or reuse) the plan for a stored intake.
    ///
    /// Fails fast with [`PlanError::GenerationInProgress`] if another
    /// generation for the same intake has not finished, and with
    /// [`PlanError::InvalidIntake`] if the stored answers do not normalize.
    /// Either way nothing is written.
    pub async fn generate(
        &self,
        intake_id: Uuid,
        mode: GenerateMode,
    ) -> Result<GenerationOutcome, PlanError> {
        let _guard = InFlightGuard::claim(&self.in_flight, intake_id)
            .ok_or(PlanError::GenerationInProgress(intake_id))?;

        let (intake, profile) = load_intake(self.store(), intake_id).await?;

        if mode == GenerateMode::Reuse {
            if let Some(plan) = self.store.latest_plan_for_intake(intake_id).await? {
                debug!(intake_id = %intake_id, plan_id = %plan.id, "reusing existing plan");
                return reused_outcome(plan);
            }
        }

        let preview = self.draft(&profile).await;
        let new_plan = NewPlan {
            intake_id,
            client_ref: intake.client_ref.clone(),
            structure: preview
                .structure
                .to_document()
                .context("failed to encode plan structure")?,
            validation: preview
                .validation
                .to_document()
                .context("failed to encode validation result")?,
            catalog_version: self.catalog.version().to_owned(),
            used_fallback: preview.used_fallback,
        };
        let plan = self
            .store
            .insert_plan(&new_plan)
            .await
            .with_context(|| format!("failed to store plan for intake {intake_id}"))?;

        info!(
            intake_id = %intake_id,
            plan_id = %plan.id,
            version = plan.version,
            pass = preview.validation.pass,
            used_fallback = preview.used_fallback,
            "plan generated"
        );

        Ok(GenerationOutcome {
            plan,
            structure: preview.structure,
            validation: preview.validation,
            reused: false,
        })
    }

    /// Build and validate a plan for `profile` without storing it.
    pub async fn draft(&self, profile: &IntakeProfile) -> DraftPreview {
        let template = select_template(profile);
        let advice = self.advise(profile, &template).await;
        let structure = assemble_plan(profile, &template, &self.catalog, advice.as_ref());
        let validation = validate_plan(&structure, profile);
        DraftPreview {
            template,
            structure,
            validation,
            used_fallback: advice.is_none(),
        }
    }

    /// Ask the provider for advice, bounded by the configured timeout.
    /// `None` means the deterministic path is used.
    async fn advise(&self, profile: &IntakeProfile, template: &PlanTemplate) -> Option<Advice> {
        let suggester = self.suggester.as_ref()?;
        let request = SuggestionRequest {
            profile: profile.clone(),
            template: template.clone(),
        };
        let timeout = self.config.suggestion_timeout;

        let result = match tokio::time::timeout(timeout, suggester.suggest(&request)).await {
            Ok(result) => result,
            Err(_) => Err(SuggestionError::Timeout {
                provider: suggester.name().to_owned(),
                timeout,
            }),
        };

        match result {
            Ok(advice) => Some(advice),
            Err(e) => {
                warn!(
                    provider = suggester.name(),
                    error = %e,
                    "content suggestion failed, using deterministic selection"
                );
                None
            }
        }
    }
}

fn reused_outcome(plan: Plan) -> Result<GenerationOutcome, PlanError> {
    let structure = PlanStructure::from_document(&plan.structure)
        .with_context(|| format!("plan {} has an unreadable structure document", plan.id))?;
    let validation: ValidationResult = serde_json::from_value(plan.validation.clone())
        .with_context(|| format!("plan {} has an unreadable validation document", plan.id))?;
    Ok(GenerationOutcome {
        plan,
        structure,
        validation,
        reused: true,
    })
}
