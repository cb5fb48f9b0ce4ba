//! The canonical plan document and its assembly.
//!
//! A [`PlanStructure`] is persisted as opaque JSON. Each prescription
//! carries the exercise's equipment and contraindications, so the document
//! can be validated on its own, without the catalog that produced it.

pub mod assemble;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::profile::{BodyRegion, Equipment, IntakeProfile};
use crate::template::Split;

pub use assemble::{assemble_plan, build_structure};

/// One exercise prescribed in one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPrescription {
    /// Session label this exercise belongs to ("Upper").
    pub session: String,
    pub exercise_id: String,
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    pub tempo: String,
    pub rest_seconds: u32,
    pub equipment: BTreeSet<Equipment>,
    pub contraindications: BTreeSet<BodyRegion>,
}

impl SetPrescription {
    /// Sets times reps. Any pair of `u32` counts fits in a `u64`.
    pub fn volume(&self) -> u64 {
        u64::from(self.sets) * u64::from(self.reps)
    }

    /// "Dead Bug 2x10 @ 2-2-2, rest 60s"
    pub fn line(&self) -> String {
        format!(
            "{} {}x{} @ {}, rest {}s",
            self.exercise, self.sets, self.reps, self.tempo, self.rest_seconds
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    pub number: u32,
    pub title: String,
    pub deload: bool,
    /// Session label for each training day, in day order.
    pub schedule: Vec<String>,
    pub warmup: Vec<String>,
    pub main_sets: Vec<SetPrescription>,
    pub accessories: Vec<SetPrescription>,
    pub cooldown: Vec<String>,
    pub notes: String,
}

impl Week {
    /// Accessories rendered as display lines.
    pub fn accessory_lines(&self) -> Vec<String> {
        self.accessories.iter().map(SetPrescription::line).collect()
    }

    /// Main sets followed by accessories.
    pub fn prescriptions(&self) -> impl Iterator<Item = &SetPrescription> {
        self.main_sets.iter().chain(&self.accessories)
    }

    /// Working sets per session label, in order of first appearance.
    pub fn session_sets(&self) -> Vec<(&str, u32)> {
        let mut totals: Vec<(&str, u32)> = Vec::new();
        for p in self.prescriptions() {
            match totals.iter_mut().find(|(label, _)| *label == p.session) {
                Some((_, sets)) => *sets = sets.saturating_add(p.sets),
                None => totals.push((p.session.as_str(), p.sets)),
            }
        }
        totals
    }

    /// Total volume per exercise id across every session of the week.
    pub fn exercise_volumes(&self) -> BTreeMap<&str, u64> {
        let mut volumes = BTreeMap::new();
        for p in self.prescriptions() {
            let total: &mut u64 = volumes.entry(p.exercise_id.as_str()).or_insert(0);
            *total = total.saturating_add(p.volume());
        }
        volumes
    }
}

/// The generated program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStructure {
    pub split: Split,
    /// The profile the plan was generated for.
    pub generated_from: IntakeProfile,
    pub weeks: Vec<Week>,
}

impl PlanStructure {
    pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_document(document: &serde_json::Value) -> serde_json::Result<Self> {
        Self::deserialize(document)
    }
}
