//! The typed client profile every downstream component works from.

pub mod normalize;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use normalize::{FieldError, FieldProblem, IntakeError, normalize};

/// Lowest accepted `days_per_week`.
pub const MIN_DAYS_PER_WEEK: u32 = 1;
/// Highest accepted `days_per_week`.
pub const MAX_DAYS_PER_WEEK: u32 = 6;
/// Shortest accepted session, in minutes.
pub const MIN_SESSION_MINUTES: u32 = 15;
/// Longest accepted session, in minutes.
pub const MAX_SESSION_MINUTES: u32 = 120;

// ---------------------------------------------------------------------------
// Token enums
// ---------------------------------------------------------------------------

/// Error returned when a string is not a member of one of the closed token
/// enumerations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} token: {token:?}")]
pub struct TokenParseError {
    pub kind: &'static str,
    pub token: String,
}

/// Training goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    GeneralFitness,
    FatLoss,
    MuscleGain,
    Strength,
}

impl Goal {
    pub const ALL: [Self; 4] = [
        Self::GeneralFitness,
        Self::FatLoss,
        Self::MuscleGain,
        Self::Strength,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GeneralFitness => "general_fitness",
            Self::FatLoss => "fat_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Strength => "strength",
        }
    }

    /// Human wording used in plan notes ("fat loss").
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Goal {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| TokenParseError {
                kind: "goal",
                token: s.to_owned(),
            })
    }
}

/// Equipment the client has access to, and that an exercise may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    /// No equipment at all. Never appears in an exercise requirement: a
    /// bodyweight exercise requires the empty set.
    BodyweightOnly,
    Dumbbells,
    Kettlebells,
    Barbell,
    Bench,
    PullUpBar,
    ResistanceBands,
    CableMachine,
    Machines,
}

impl Equipment {
    pub const ALL: [Self; 9] = [
        Self::BodyweightOnly,
        Self::Dumbbells,
        Self::Kettlebells,
        Self::Barbell,
        Self::Bench,
        Self::PullUpBar,
        Self::ResistanceBands,
        Self::CableMachine,
        Self::Machines,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BodyweightOnly => "bodyweight_only",
            Self::Dumbbells => "dumbbells",
            Self::Kettlebells => "kettlebells",
            Self::Barbell => "barbell",
            Self::Bench => "bench",
            Self::PullUpBar => "pull_up_bar",
            Self::ResistanceBands => "resistance_bands",
            Self::CableMachine => "cable_machine",
            Self::Machines => "machines",
        }
    }
}

impl fmt::Display for Equipment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Equipment {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| TokenParseError {
                kind: "equipment",
                token: s.to_owned(),
            })
    }
}

/// Body region an injury flag refers to, and that an exercise may load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyRegion {
    Knee,
    LowerBack,
    Shoulder,
    Wrist,
    Hip,
    Ankle,
    Neck,
    Elbow,
}

impl BodyRegion {
    pub const ALL: [Self; 8] = [
        Self::Knee,
        Self::LowerBack,
        Self::Shoulder,
        Self::Wrist,
        Self::Hip,
        Self::Ankle,
        Self::Neck,
        Self::Elbow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Knee => "knee",
            Self::LowerBack => "lower_back",
            Self::Shoulder => "shoulder",
            Self::Wrist => "wrist",
            Self::Hip => "hip",
            Self::Ankle => "ankle",
            Self::Neck => "neck",
            Self::Elbow => "elbow",
        }
    }
}

impl fmt::Display for BodyRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BodyRegion {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| TokenParseError {
                kind: "body region",
                token: s.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A validated intake. Only [`normalize`] builds one from raw answers, so
/// the numeric fields are always inside their bounds and `equipment` is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeProfile {
    pub goal: Goal,
    pub days_per_week: u32,
    pub session_length_minutes: u32,
    pub equipment: BTreeSet<Equipment>,
    pub injury_flags: BTreeSet<BodyRegion>,
}

impl IntakeProfile {
    /// Whether the client can perform an exercise requiring `required`.
    pub fn has_equipment(&self, required: &BTreeSet<Equipment>) -> bool {
        required.is_subset(&self.equipment)
    }

    /// Whether an exercise loading `regions` is safe for this client.
    pub fn tolerates(&self, regions: &BTreeSet<BodyRegion>) -> bool {
        regions.is_disjoint(&self.injury_flags)
    }
}

/// Canonical form of a free-text token: trimmed, lowercased, with runs of
/// whitespace and `-` collapsed to a single `_`.
pub fn canonical_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Render a set of tokens as `a, b, c` for notes and messages.
pub fn join_tokens<T: fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_parses_its_own_display() {
        for g in Goal::ALL {
            let parsed: Goal = g.to_string().parse().expect("should parse");
            assert_eq!(g, parsed);
        }
    }

    #[test]
    fn equipment_parses_its_own_display() {
        for e in Equipment::ALL {
            let parsed: Equipment = e.to_string().parse().expect("should parse");
            assert_eq!(e, parsed);
        }
    }

    #[test]
    fn body_region_parses_its_own_display() {
        for r in BodyRegion::ALL {
            let parsed: BodyRegion = r.to_string().parse().expect("should parse");
            assert_eq!(r, parsed);
        }
    }

    #[test]
    fn serde_tokens_match_display() {
        assert_eq!(
            serde_json::to_string(&Equipment::PullUpBar).unwrap(),
            "\"pull_up_bar\""
        );
        assert_eq!(
            serde_json::to_string(&BodyRegion::LowerBack).unwrap(),
            "\"lower_back\""
        );
        assert_eq!(serde_json::to_string(&Goal::FatLoss).unwrap(), "\"fat_loss\"");
    }

    #[test]
    fn unknown_token_is_an_error() {
        let err = "yoga_mat".parse::<Equipment>().unwrap_err();
        assert_eq!(err.kind, "equipment");
        assert_eq!(err.token, "yoga_mat");
        assert!(err.to_string().contains("yoga_mat"));
    }

    #[test]
    fn canonical_token_collapses_separators() {
        assert_eq!(canonical_token("  Pull-Up Bar "), "pull_up_bar");
        assert_eq!(canonical_token("Lower  back"), "lower_back");
        assert_eq!(canonical_token("FAT_LOSS"), "fat_loss");
        assert_eq!(canonical_token(""), "");
    }

    #[test]
    fn goal_label_is_spaced() {
        assert_eq!(Goal::MuscleGain.label(), "muscle gain");
    }

    #[test]
    fn profile_equipment_and_injury_checks() {
        let profile = IntakeProfile {
            goal: Goal::Strength,
            days_per_week: 3,
            session_length_minutes: 60,
            equipment: [Equipment::Dumbbells, Equipment::Bench].into(),
            injury_flags: [BodyRegion::Knee].into(),
        };

        assert!(profile.has_equipment(&BTreeSet::new()));
        assert!(profile.has_equipment(&[Equipment::Dumbbells].into()));
        assert!(!profile.has_equipment(&[Equipment::Barbell].into()));

        assert!(profile.tolerates(&[BodyRegion::Shoulder].into()));
        assert!(!profile.tolerates(&[BodyRegion::Knee, BodyRegion::Hip].into()));
    }
}
