//! Optional content-suggestion providers.
//!
//! A provider receives the normalized profile and the template and returns
//! advisory content: preferred exercises for specific slots and free-text
//! coaching notes. Advice never bypasses slot constraints; the selection
//! engine discards any suggestion that does not fit.
//!
//! ```text
//! PlanGenerator --timeout(suggest(request))--> Advice | SuggestionError
//!                                                  |           |
//!                                         select_exercises   fallback to the
//!                                         (advice checked)   deterministic path
//! ```

pub mod command;
pub mod fixed;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::profile::IntakeProfile;
use crate::template::{PlanTemplate, SessionKind};

pub use command::CommandSuggester;
pub use fixed::FixedSuggester;

/// Longest advisory note kept, in characters.
pub const MAX_NOTE_CHARS: usize = 280;

/// Most advisory notes kept per plan.
pub const MAX_NOTES: usize = 5;

/// What a provider is asked about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub profile: IntakeProfile,
    pub template: PlanTemplate,
}

/// A preferred exercise for one slot of one session type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAdvice {
    pub session: SessionKind,
    /// Index into the session blueprint's `slots`.
    pub slot: usize,
    pub exercise_id: String,
}

/// A provider response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    #[serde(default)]
    pub slots: Vec<SlotAdvice>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Advice {
    /// Non-blank notes, trimmed and length-limited.
    pub fn sanitized_notes(&self) -> Vec<String> {
        self.notes
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .take(MAX_NOTES)
            .map(|n| n.chars().take(MAX_NOTE_CHARS).collect())
            .collect()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SuggestionError {
    #[error("provider {provider:?} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// A pluggable source of advisory plan content.
///
/// # Object Safety
///
/// Stored as `Arc<dyn ContentSuggester>` by the generator.
#[async_trait]
pub trait ContentSuggester: Send + Sync {
    /// Short name used in logs (e.g. "command").
    fn name(&self) -> &str;

    async fn suggest(&self, request: &SuggestionRequest) -> Result<Advice, SuggestionError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn ContentSuggester) {}
};
