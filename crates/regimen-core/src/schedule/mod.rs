//! Progressive overload scheduling.
//!
//! Weeks 1-3 are loading weeks: reps are held, sets rise by the goal's
//! offsets and conditioning goals shorten rest. Week 4 is a deload with one
//! set fewer than week 1. A slot already at one set keeps it and cuts a
//! third of its reps instead (at least one rep cut, never below one rep), so
//! week 4 is lighter than week 3 whenever reps allow. Per-slot caps keep
//! the peak week inside the session budget; because every week takes
//! `min(desired, cap)`, capping cannot break either the non-decreasing
//! loading weeks or the deload guarantee.

pub mod policy;

use serde::{Deserialize, Serialize};

use crate::template::SlotKind;
use policy::{DELOAD_WEEK, GoalPolicy};

/// The concrete prescription for one exercise in one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dose {
    pub sets: u32,
    pub reps: u32,
    pub rest_seconds: u32,
}

impl Dose {
    pub fn volume(&self) -> u64 {
        u64::from(self.sets) * u64::from(self.reps)
    }
}

fn progression(policy: &GoalPolicy, kind: SlotKind) -> policy::SetProgression {
    match kind {
        SlotKind::MainCompound => policy.main_sets,
        SlotKind::Accessory => policy.accessory_sets,
    }
}

/// Highest set count each slot may reach, so that one session's peak week
/// never exceeds `budget` sets.
///
/// Starts from each slot's desired peak and removes one set at a time from
/// the largest cap, preferring accessories and later slots on ties. No cap
/// drops below one.
pub fn peak_caps(policy: &GoalPolicy, kinds: &[SlotKind], budget: u32) -> Vec<u32> {
    let mut caps: Vec<u32> = kinds
        .iter()
        .map(|kind| progression(policy, *kind).peak())
        .collect();
    let mut total: u32 = caps.iter().sum();

    while total > budget {
        let Some(idx) = (0..caps.len())
            .filter(|&i| caps[i] > 1)
            .max_by_key(|&i| (caps[i], kinds[i] == SlotKind::Accessory))
        else {
            break;
        };
        caps[idx] -= 1;
        total -= 1;
    }
    caps
}

/// Sets, reps and rest for a slot in `week` (1-based).
///
/// `accessory_reps` is the exercise's default rep target; main compounds use
/// the goal's fixed reps instead.
pub fn dose(policy: &GoalPolicy, kind: SlotKind, week: u32, cap: u32, accessory_reps: u32) -> Dose {
    let sets_progression = progression(policy, kind);
    let week_one = sets_progression.loading_sets(1).min(cap);
    let reps = match kind {
        SlotKind::MainCompound => policy.main_reps,
        SlotKind::Accessory => accessory_reps,
    };
    let (sets, reps) = if week < DELOAD_WEEK {
        (sets_progression.loading_sets(week).min(cap), reps)
    } else if week_one > 1 {
        (week_one - 1, reps)
    } else {
        (1, reps.saturating_sub((reps / 3).max(1)).max(1))
    };
    Dose {
        sets,
        reps,
        rest_seconds: policy.rest.seconds(week),
    }
}
