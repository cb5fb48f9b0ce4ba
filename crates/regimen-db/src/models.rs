use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a generated plan.
///
/// Plans only ever move forward: `draft -> approved -> sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Approved,
    Sent,
}

impl PlanStatus {
    /// Position in the lifecycle, used to reject backwards moves.
    pub fn rank(self) -> u8 {
        match self {
            Self::Draft => 0,
            Self::Approved => 1,
            Self::Sent => 2,
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Sent => "sent",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanStatus {
    type Err = PlanStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "approved" => Ok(Self::Approved),
            "sent" => Ok(Self::Sent),
            other => Err(PlanStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanStatus`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid plan status: {0:?}")]
pub struct PlanStatusParseError(pub String);

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// Raw intake answers exactly as the form submitted them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Intake {
    pub id: Uuid,
    pub client_ref: Option<String>,
    pub answers: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A generated plan. `structure` and `validation` are opaque JSON documents
/// owned by the engine; the database never looks inside them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub intake_id: Uuid,
    pub client_ref: Option<String>,
    /// 1-based generation counter per intake.
    pub version: i32,
    pub status: PlanStatus,
    pub structure: serde_json::Value,
    pub validation: serde_json::Value,
    pub catalog_version: String,
    /// Whether the content-suggestion provider was skipped or failed.
    pub used_fallback: bool,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivery_channel: Option<String>,
}

/// Fields supplied by the engine when recording a new plan. The store fills
/// in `id`, `version`, `status` (always draft) and `created_at`.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub intake_id: Uuid,
    pub client_ref: Option<String>,
    pub structure: serde_json::Value,
    pub validation: serde_json::Value,
    pub catalog_version: String,
    pub used_fallback: bool,
}

/// A forward status change and the data it records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// `draft -> approved`, recording the approving trainer.
    Approve { approved_by: String },
    /// `approved -> sent`, recording the confirmed delivery channel.
    MarkSent { channel: String },
}

impl StatusChange {
    pub fn from(&self) -> PlanStatus {
        match self {
            Self::Approve { .. } => PlanStatus::Draft,
            Self::MarkSent { .. } => PlanStatus::Approved,
        }
    }

    pub fn to(&self) -> PlanStatus {
        match self {
            Self::Approve { .. } => PlanStatus::Approved,
            Self::MarkSent { .. } => PlanStatus::Sent,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_status_parses_its_own_display() {
        for v in [PlanStatus::Draft, PlanStatus::Approved, PlanStatus::Sent] {
            let parsed: PlanStatus = v.to_string().parse().expect("should parse");
            assert_eq!(v, parsed);
        }
    }

    #[test]
    fn plan_status_invalid() {
        let err = "archived".parse::<PlanStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid plan status: \"archived\"");
    }

    #[test]
    fn status_rank_is_forward_only() {
        assert!(PlanStatus::Draft.rank() < PlanStatus::Approved.rank());
        assert!(PlanStatus::Approved.rank() < PlanStatus::Sent.rank());
    }

    #[test]
    fn status_change_edges() {
        let approve = StatusChange::Approve {
            approved_by: "coach".into(),
        };
        assert_eq!(approve.from(), PlanStatus::Draft);
        assert_eq!(approve.to(), PlanStatus::Approved);

        let sent = StatusChange::MarkSent {
            channel: "email".into(),
        };
        assert_eq!(sent.from(), PlanStatus::Approved);
        assert_eq!(sent.to(), PlanStatus::Sent);
    }
}
