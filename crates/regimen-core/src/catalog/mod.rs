//! Versioned, read-only exercise reference data.
//!
//! A catalog is parsed once from TOML (the embedded `default_catalog.toml`
//! or a file supplied by the operator) and then shared immutably. Its
//! version is the SHA-256 of the source text, so a plan can record exactly
//! which snapshot it was generated from.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::profile::{BodyRegion, Equipment, TokenParseError};

/// The embedded default catalog.
static DEFAULT_CATALOG_TOML: &str = include_str!("default_catalog.toml");

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Primary movement pattern of an exercise, and the pattern a template slot
/// asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Squat,
    Hinge,
    Lunge,
    HorizontalPush,
    VerticalPush,
    HorizontalPull,
    VerticalPull,
    Core,
    Arms,
    Conditioning,
}

impl MovementPattern {
    pub const ALL: [Self; 10] = [
        Self::Squat,
        Self::Hinge,
        Self::Lunge,
        Self::HorizontalPush,
        Self::VerticalPush,
        Self::HorizontalPull,
        Self::VerticalPull,
        Self::Core,
        Self::Arms,
        Self::Conditioning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Hinge => "hinge",
            Self::Lunge => "lunge",
            Self::HorizontalPush => "horizontal_push",
            Self::VerticalPush => "vertical_push",
            Self::HorizontalPull => "horizontal_pull",
            Self::VerticalPull => "vertical_pull",
            Self::Core => "core",
            Self::Arms => "arms",
            Self::Conditioning => "conditioning",
        }
    }
}

impl fmt::Display for MovementPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementPattern {
    type Err = TokenParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TokenParseError {
                kind: "movement pattern",
                token: s.to_owned(),
            })
    }
}

/// One exercise in the reference library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: String,
    pub name: String,
    pub pattern: MovementPattern,
    /// Everything the exercise needs. Empty means bodyweight.
    #[serde(default)]
    pub equipment: BTreeSet<Equipment>,
    #[serde(default)]
    pub contraindications: BTreeSet<BodyRegion>,
    pub default_reps: u32,
    pub default_tempo: String,
    /// The designated bodyweight substitute for `pattern`.
    #[serde(default)]
    pub fallback: bool,
}

impl ExerciseRecord {
    /// Whether the record can be performed with `equipment` and loads none
    /// of `excluded`.
    pub fn fits(&self, equipment: &BTreeSet<Equipment>, excluded: &BTreeSet<BodyRegion>) -> bool {
        self.equipment.is_subset(equipment) && self.contraindications.is_disjoint(excluded)
    }
}

/// Errors raised while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalog TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("catalog must contain at least one exercise")]
    Empty,

    #[error("duplicate exercise id: {0:?}")]
    DuplicateId(String),

    #[error("exercise {0:?} has a blank name")]
    BlankName(String),

    #[error("exercise {0:?} must have default_reps of at least 1")]
    ZeroReps(String),

    #[error("exercise {0:?} lists bodyweight_only as a requirement (use an empty list)")]
    BodyweightRequirement(String),

    #[error("no fallback exercise for pattern {0}")]
    MissingFallback(MovementPattern),

    #[error("pattern {pattern} has more than one fallback: {first:?} and {second:?}")]
    DuplicateFallback {
        pattern: MovementPattern,
        first: String,
        second: String,
    },

    #[error("fallback exercise {0:?} must not require equipment")]
    FallbackNeedsEquipment(String),
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    exercises: Vec<ExerciseRecord>,
}

/// An immutable, validated exercise library.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: String,
    exercises: Vec<ExerciseRecord>,
    by_id: HashMap<String, usize>,
    fallbacks: HashMap<MovementPattern, usize>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Catalog {
    /// Parse and validate a catalog from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(source)?;
        let version = hex::encode(Sha256::digest(source.as_bytes()));
        Self::from_records(version, file.exercises)
    }

    /// Read a catalog file from disk.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// The catalog compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is invalid. The unit tests load it, so a
    /// build that passes its tests always has a valid default catalog.
    pub fn builtin() -> Self {
        Self::from_toml_str(DEFAULT_CATALOG_TOML).expect("embedded default_catalog.toml is invalid")
    }

    fn from_records(version: String, exercises: Vec<ExerciseRecord>) -> Result<Self, CatalogError> {
        if exercises.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut by_id = HashMap::with_capacity(exercises.len());
        let mut fallbacks: HashMap<MovementPattern, usize> = HashMap::new();

        for (idx, record) in exercises.iter().enumerate() {
            if by_id.insert(record.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateId(record.id.clone()));
            }
            if record.name.trim().is_empty() {
                return Err(CatalogError::BlankName(record.id.clone()));
            }
            if record.default_reps == 0 {
                return Err(CatalogError::ZeroReps(record.id.clone()));
            }
            if record.equipment.contains(&Equipment::BodyweightOnly) {
                return Err(CatalogError::BodyweightRequirement(record.id.clone()));
            }
            if record.fallback {
                if !record.equipment.is_empty() {
                    return Err(CatalogError::FallbackNeedsEquipment(record.id.clone()));
                }
                if let Some(&first) = fallbacks.get(&record.pattern) {
                    return Err(CatalogError::DuplicateFallback {
                        pattern: record.pattern,
                        first: exercises[first].id.clone(),
                        second: record.id.clone(),
                    });
                }
                fallbacks.insert(record.pattern, idx);
            }
        }

        let used: HashSet<MovementPattern> = exercises.iter().map(|e| e.pattern).collect();
        if let Some(missing) = MovementPattern::ALL
            .into_iter()
            .find(|p| !fallbacks.contains_key(p) && used.contains(p))
        {
            return Err(CatalogError::MissingFallback(missing));
        }

        Ok(Self {
            version,
            exercises,
            by_id,
            fallbacks,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl Catalog {
    /// Hex SHA-256 of the catalog source.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// All records in declaration order.
    pub fn exercises(&self) -> &[ExerciseRecord] {
        &self.exercises
    }

    pub fn get(&self, id: &str) -> Option<&ExerciseRecord> {
        self.by_id.get(id).map(|&idx| &self.exercises[idx])
    }

    /// Non-fallback records for `pattern`, highest priority first.
    pub fn candidates(&self, pattern: MovementPattern) -> impl Iterator<Item = &ExerciseRecord> {
        self.exercises
            .iter()
            .filter(move |e| e.pattern == pattern && !e.fallback)
    }

    /// The bodyweight substitute for `pattern`, if the catalog covers it.
    pub fn fallback(&self, pattern: MovementPattern) -> Option<&ExerciseRecord> {
        self.fallbacks.get(&pattern).map(|&idx| &self.exercises[idx])
    }

    /// Movement patterns present in the catalog, in [`MovementPattern::ALL`]
    /// order.
    pub fn patterns(&self) -> Vec<MovementPattern> {
        MovementPattern::ALL
            .into_iter()
            .filter(|p| self.fallbacks.contains_key(p))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"
[[exercises]]
id = "goblet_squat"
name = "Goblet Squat"
pattern = "squat"
equipment = ["dumbbells"]
contraindications = ["knee"]
default_reps = 10
default_tempo = "3-1-1"

[[exercises]]
id = "bodyweight_squat"
name = "Bodyweight Squat"
pattern = "squat"
default_reps = 15
default_tempo = "2-1-1"
fallback = true
"#;

    #[test]
    fn builtin_catalog_is_valid_and_complete() {
        let catalog = Catalog::builtin();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.patterns(), MovementPattern::ALL.to_vec());
        for pattern in MovementPattern::ALL {
            let fallback = catalog.fallback(pattern).expect("fallback for every pattern");
            assert!(fallback.equipment.is_empty());
            assert!(catalog.candidates(pattern).next().is_some(), "{pattern} has candidates");
        }
    }

    #[test]
    fn version_is_sha256_of_source() {
        let a = Catalog::from_toml_str(TINY).unwrap();
        let b = Catalog::from_toml_str(TINY).unwrap();
        assert_eq!(a.version(), b.version());
        assert_eq!(a.version().len(), 64);

        let edited = TINY.replace("default_reps = 10", "default_reps = 8");
        let c = Catalog::from_toml_str(&edited).unwrap();
        assert_ne!(a.version(), c.version());
    }

    #[test]
    fn candidates_follow_declaration_order_and_skip_fallback() {
        let catalog = Catalog::builtin();
        let ids: Vec<&str> = catalog
            .candidates(MovementPattern::Hinge)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids.first(), Some(&"barbell_romanian_deadlift"));
        assert!(!ids.contains(&"glute_bridge"));
        assert_eq!(
            catalog.fallback(MovementPattern::Hinge).map(|e| e.id.as_str()),
            Some("glute_bridge")
        );
    }

    #[test]
    fn lookup_by_id() {
        let catalog = Catalog::from_toml_str(TINY).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get("goblet_squat").map(|e| e.pattern),
            Some(MovementPattern::Squat)
        );
        assert!(catalog.get("nope").is_none());
    }

    #[test]
    fn fits_checks_equipment_and_injuries() {
        let catalog = Catalog::from_toml_str(TINY).unwrap();
        let goblet = catalog.get("goblet_squat").unwrap();

        let dumbbells: BTreeSet<Equipment> = [Equipment::Dumbbells].into();
        assert!(goblet.fits(&dumbbells, &BTreeSet::new()));
        assert!(!goblet.fits(&BTreeSet::new(), &BTreeSet::new()));
        assert!(!goblet.fits(&dumbbells, &[BodyRegion::Knee].into()));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let doubled = format!("{TINY}\n{}", &TINY[..TINY.find("[[exercises]]\nid = \"bodyweight").unwrap()]);
        let err = Catalog::from_toml_str(&doubled).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(id) if id == "goblet_squat"));
    }

    #[test]
    fn rejects_pattern_without_fallback() {
        let src = TINY.replace("fallback = true", "");
        let err = Catalog::from_toml_str(&src).unwrap_err();
        assert!(matches!(err, CatalogError::MissingFallback(MovementPattern::Squat)));
    }

    #[test]
    fn rejects_fallback_with_equipment() {
        let src = TINY.replace(
            "pattern = \"squat\"\ndefault_reps = 15",
            "pattern = \"squat\"\nequipment = [\"bench\"]\ndefault_reps = 15",
        );
        let err = Catalog::from_toml_str(&src).unwrap_err();
        assert!(matches!(err, CatalogError::FallbackNeedsEquipment(id) if id == "bodyweight_squat"));
    }

    #[test]
    fn rejects_bodyweight_only_requirement() {
        let src = TINY.replace("[\"dumbbells\"]", "[\"bodyweight_only\"]");
        let err = Catalog::from_toml_str(&src).unwrap_err();
        assert!(matches!(err, CatalogError::BodyweightRequirement(_)));
    }

    #[test]
    fn rejects_unknown_tokens_and_empty_files() {
        let src = TINY.replace("[\"knee\"]", "[\"spleen\"]");
        assert!(matches!(
            Catalog::from_toml_str(&src).unwrap_err(),
            CatalogError::Toml(_)
        ));
        assert!(matches!(
            Catalog::from_toml_str("exercises = []").unwrap_err(),
            CatalogError::Empty
        ));
    }

    #[test]
    fn loads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exercises.toml");
        std::fs::write(&path, TINY).unwrap();

        let catalog = Catalog::from_path(&path).unwrap();
        assert_eq!(catalog.version(), Catalog::from_toml_str(TINY).unwrap().version());

        let missing = Catalog::from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, CatalogError::Io { .. }));
    }
}
