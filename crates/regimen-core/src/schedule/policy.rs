//! Fixed programming constants. None of these are client-tunable.

use serde::{Deserialize, Serialize};

use crate::profile::Goal;

/// Every plan spans exactly this many weeks.
pub const HORIZON_WEEKS: u32 = 4;

/// The reduced-volume week.
pub const DELOAD_WEEK: u32 = 4;

/// Minutes budgeted per working set, rest included.
pub const PER_SET_MINUTES: f64 = 2.0;

/// Warm-up plus cooldown minutes added to every session.
pub const SESSION_OVERHEAD_MINUTES: f64 = 8.0;

/// How far a session estimate may exceed the requested length.
pub const DURATION_TOLERANCE: f64 = 0.10;

/// Set counts for weeks 1-3: `base + offsets[week - 1]`. Offsets never
/// decrease and grow by at most one per week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetProgression {
    pub base: u32,
    pub offsets: [u32; 3],
}

impl SetProgression {
    /// Desired sets for a loading week (1-3).
    pub fn loading_sets(&self, week: u32) -> u32 {
        let idx = week.clamp(1, 3) as usize - 1;
        self.base + self.offsets[idx]
    }

    /// The largest loading-week set count.
    pub fn peak(&self) -> u32 {
        self.loading_sets(3)
    }
}

/// Rest for weeks 1-3: `start - step * (week - 1)`, never below `floor`.
/// The deload week rests as long as week 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestProgression {
    pub start: u32,
    pub step: u32,
    pub floor: u32,
}

impl RestProgression {
    pub fn seconds(&self, week: u32) -> u32 {
        if week >= DELOAD_WEEK {
            return self.start;
        }
        let shortened = self.step * week.saturating_sub(1);
        self.start.saturating_sub(shortened).max(self.floor)
    }
}

/// Main-compound and accessory slot counts for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCounts {
    pub main: usize,
    pub accessory: usize,
}

/// Everything a goal decides about volume and session shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalPolicy {
    pub main_sets: SetProgression,
    pub accessory_sets: SetProgression,
    /// Held constant across the horizon for main compounds. Accessories
    /// use the exercise's own default reps.
    pub main_reps: u32,
    pub rest: RestProgression,
    pub preferred_slots: SlotCounts,
    pub max_slots: SlotCounts,
}

const STRENGTH: GoalPolicy = GoalPolicy {
    main_sets: SetProgression {
        base: 3,
        offsets: [0, 1, 2],
    },
    accessory_sets: SetProgression {
        base: 2,
        offsets: [0, 0, 1],
    },
    main_reps: 5,
    rest: RestProgression {
        start: 150,
        step: 0,
        floor: 150,
    },
    preferred_slots: SlotCounts {
        main: 3,
        accessory: 1,
    },
    max_slots: SlotCounts {
        main: 4,
        accessory: 2,
    },
};

const MUSCLE_GAIN: GoalPolicy = GoalPolicy {
    main_sets: SetProgression {
        base: 3,
        offsets: [0, 1, 2],
    },
    accessory_sets: SetProgression {
        base: 3,
        offsets: [0, 0, 1],
    },
    main_reps: 10,
    rest: RestProgression {
        start: 90,
        step: 0,
        floor: 90,
    },
    preferred_slots: SlotCounts {
        main: 3,
        accessory: 3,
    },
    max_slots: SlotCounts {
        main: 4,
        accessory: 4,
    },
};

const FAT_LOSS: GoalPolicy = GoalPolicy {
    main_sets: SetProgression {
        base: 2,
        offsets: [0, 1, 1],
    },
    accessory_sets: SetProgression {
        base: 2,
        offsets: [0, 0, 1],
    },
    main_reps: 12,
    rest: RestProgression {
        start: 60,
        step: 10,
        floor: 30,
    },
    preferred_slots: SlotCounts {
        main: 2,
        accessory: 3,
    },
    max_slots: SlotCounts {
        main: 3,
        accessory: 4,
    },
};

const GENERAL_FITNESS: GoalPolicy = GoalPolicy {
    main_sets: SetProgression {
        base: 3,
        offsets: [0, 0, 1],
    },
    accessory_sets: SetProgression {
        base: 2,
        offsets: [0, 0, 1],
    },
    main_reps: 10,
    rest: RestProgression {
        start: 75,
        step: 5,
        floor: 45,
    },
    preferred_slots: SlotCounts {
        main: 2,
        accessory: 2,
    },
    max_slots: SlotCounts {
        main: 3,
        accessory: 3,
    },
};

/// The policy table entry for `goal`.
pub fn policy_for(goal: Goal) -> &'static GoalPolicy {
    match goal {
        Goal::Strength => &STRENGTH,
        Goal::MuscleGain => &MUSCLE_GAIN,
        Goal::FatLoss => &FAT_LOSS,
        Goal::GeneralFitness => &GENERAL_FITNESS,
    }
}

/// Working sets that fit in one session of `minutes`.
pub fn session_set_budget(minutes: u32) -> u32 {
    let available = f64::from(minutes) - SESSION_OVERHEAD_MINUTES;
    if available <= 0.0 {
        return 0;
    }
    (available / PER_SET_MINUTES).floor() as u32
}

/// Estimated length of a session with `total_sets` working sets.
pub fn estimate_session_minutes(total_sets: u32) -> f64 {
    f64::from(total_sets) * PER_SET_MINUTES + SESSION_OVERHEAD_MINUTES
}

/// Longest acceptable estimate for a requested session length.
pub fn duration_limit(minutes: u32) -> f64 {
    f64::from(minutes) * (1.0 + DURATION_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_monotonic_with_unit_steps() {
        for goal in Goal::ALL {
            let policy = policy_for(goal);
            for progression in [policy.main_sets, policy.accessory_sets] {
                let mut previous = 0;
                for (i, offset) in progression.offsets.iter().enumerate() {
                    assert!(*offset >= previous, "{goal}: offsets must not decrease");
                    if i > 0 {
                        assert!(*offset - previous <= 1, "{goal}: at most +1 set per week");
                    }
                    previous = *offset;
                }
            }
        }
    }

    #[test]
    fn preferred_slots_never_exceed_max() {
        for goal in Goal::ALL {
            let p = policy_for(goal);
            assert!(p.preferred_slots.main <= p.max_slots.main);
            assert!(p.preferred_slots.accessory <= p.max_slots.accessory);
            assert!(p.preferred_slots.main >= 1);
        }
    }

    #[test]
    fn rest_shortens_to_floor_and_resets_on_deload() {
        let rest = policy_for(Goal::FatLoss).rest;
        assert_eq!(rest.seconds(1), 60);
        assert_eq!(rest.seconds(2), 50);
        assert_eq!(rest.seconds(3), 40);
        assert_eq!(rest.seconds(DELOAD_WEEK), 60);

        let steep = RestProgression {
            start: 40,
            step: 20,
            floor: 30,
        };
        assert_eq!(steep.seconds(3), 30);

        let strength = policy_for(Goal::Strength).rest;
        assert!((1..=4).all(|w| strength.seconds(w) == 150));
    }

    #[test]
    fn set_budget_matches_overhead_and_per_set_time() {
        assert_eq!(session_set_budget(45), 18);
        assert_eq!(session_set_budget(15), 3);
        assert_eq!(session_set_budget(120), 56);
        assert_eq!(session_set_budget(8), 0);
    }

    #[test]
    fn estimate_within_budget_never_exceeds_length() {
        for minutes in 15..=120 {
            let budget = session_set_budget(minutes);
            assert!(estimate_session_minutes(budget) <= f64::from(minutes));
        }
    }

    #[test]
    fn duration_limit_adds_tolerance() {
        assert!((duration_limit(45) - 49.5).abs() < 1e-9);
    }
}
