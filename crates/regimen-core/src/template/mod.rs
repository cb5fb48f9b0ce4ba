//! Template selection: the structural skeleton of a plan before any
//! exercise is chosen.
//!
//! The split comes from `days_per_week` alone; the goal decides slot counts,
//! which are then fitted to the session length so every slot can receive at
//! least one working set. The result is a pure function of the profile.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::MovementPattern;
use crate::profile::{BodyRegion, Equipment, Goal, IntakeProfile};
use crate::schedule::policy::{
    DELOAD_WEEK, GoalPolicy, HORIZON_WEEKS, SlotCounts, policy_for, session_set_budget,
};

/// Highest `days_per_week` that still gets a full-body split.
pub const FULL_BODY_MAX_DAYS: u32 = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// One compound-heavy session type repeated.
    FullBody,
    /// Alternating upper and lower sessions.
    UpperLower,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FullBody => "full_body",
            Self::UpperLower => "upper_lower",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    FullBody,
    Upper,
    Lower,
}

impl SessionKind {
    /// Display label, also used to key prescriptions to their session.
    pub fn label(self) -> &'static str {
        match self {
            Self::FullBody => "Full Body",
            Self::Upper => "Upper",
            Self::Lower => "Lower",
        }
    }

    fn main_patterns(self) -> &'static [MovementPattern] {
        use MovementPattern::*;
        match self {
            Self::FullBody => &[Squat, HorizontalPush, Hinge, HorizontalPull],
            Self::Upper => &[HorizontalPush, HorizontalPull, VerticalPush, VerticalPull],
            Self::Lower => &[Squat, Hinge, Lunge, Hinge],
        }
    }

    fn accessory_patterns(self) -> &'static [MovementPattern] {
        use MovementPattern::*;
        match self {
            Self::FullBody => &[Core, Lunge, VerticalPull, Conditioning],
            Self::Upper => &[Core, Arms, Arms, Conditioning],
            Self::Lower => &[Core, Lunge, Core, Conditioning],
        }
    }

    fn warmup(self) -> &'static [&'static str] {
        match self {
            Self::FullBody => &["5 min easy cardio", "Cat-cow x10", "Hip openers", "Arm circles"],
            Self::Upper => &[
                "5 min easy cardio",
                "Arm circles",
                "Cat-cow x10",
                "Scapular wall slides",
            ],
            Self::Lower => &[
                "5 min easy cardio",
                "Dynamic leg swings",
                "Hip openers",
                "Glute bridge x10",
            ],
        }
    }

    fn cooldown(self) -> &'static [&'static str] {
        match self {
            Self::FullBody => &["3 min easy walk", "Hip flexor stretch", "Doorway chest stretch"],
            Self::Upper => &[
                "3 min easy walk",
                "Doorway chest stretch",
                "Cross-body shoulder stretch",
            ],
            Self::Lower => &["3 min easy walk", "Hamstring stretch", "Hip flexor stretch"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    MainCompound,
    Accessory,
}

/// A placeholder for one exercise, with the constraints any filler must
/// satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub kind: SlotKind,
    pub pattern: MovementPattern,
    /// The filler's requirement must be a subset of this.
    pub allowed_equipment: BTreeSet<Equipment>,
    /// The filler must load none of these.
    pub excluded_regions: BTreeSet<BodyRegion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBlueprint {
    /// 1-based training day within the week.
    pub day: u32,
    pub kind: SessionKind,
    pub warmup: Vec<String>,
    /// Main compounds first, then accessories.
    pub slots: Vec<Slot>,
    pub cooldown: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekBlueprint {
    pub number: u32,
    pub deload: bool,
    pub sessions: Vec<SessionBlueprint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTemplate {
    pub goal: Goal,
    pub split: Split,
    /// Working sets one session may hold.
    pub session_set_budget: u32,
    pub slot_counts: SlotCounts,
    pub weeks: Vec<WeekBlueprint>,
}

impl PlanTemplate {
    /// One blueprint per distinct session kind, in first-training-day order.
    pub fn session_types(&self) -> Vec<&SessionBlueprint> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        if let Some(week) = self.weeks.first() {
            for session in &week.sessions {
                if !seen.contains(&session.kind) {
                    seen.push(session.kind);
                    out.push(session);
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Build the template for a profile.
pub fn select_template(profile: &IntakeProfile) -> PlanTemplate {
    let policy = policy_for(profile.goal);
    let budget = session_set_budget(profile.session_length_minutes);
    let counts = fit_slot_counts(policy, budget);

    let split = if profile.days_per_week <= FULL_BODY_MAX_DAYS {
        Split::FullBody
    } else {
        Split::UpperLower
    };

    let sessions: Vec<SessionBlueprint> = (1..=profile.days_per_week)
        .map(|day| {
            let kind = match split {
                Split::FullBody => SessionKind::FullBody,
                Split::UpperLower if day % 2 == 1 => SessionKind::Upper,
                Split::UpperLower => SessionKind::Lower,
            };
            session_blueprint(day, kind, counts, profile)
        })
        .collect();

    let weeks = (1..=HORIZON_WEEKS)
        .map(|number| WeekBlueprint {
            number,
            deload: number == DELOAD_WEEK,
            sessions: sessions.clone(),
        })
        .collect();

    PlanTemplate {
        goal: profile.goal,
        split,
        session_set_budget: budget,
        slot_counts: counts,
        weeks,
    }
}

/// Slot counts for a session holding at most `budget` working sets.
///
/// Starts from the goal's preferred counts and drops accessory, then main,
/// slots until each slot can get one set (never below one main slot). Then
/// adds accessory, then main, slots up to the goal maximum while the peak
/// loading week still fits.
pub fn fit_slot_counts(policy: &GoalPolicy, budget: u32) -> SlotCounts {
    let budget = budget as usize;
    let SlotCounts {
        mut main,
        mut accessory,
    } = policy.preferred_slots;

    while main + accessory > budget {
        if accessory > 0 {
            accessory -= 1;
        } else if main > 1 {
            main -= 1;
        } else {
            break;
        }
    }

    let peak = |m: usize, a: usize| {
        m * policy.main_sets.peak() as usize + a * policy.accessory_sets.peak() as usize
    };
    while accessory < policy.max_slots.accessory && peak(main, accessory + 1) <= budget {
        accessory += 1;
    }
    while main < policy.max_slots.main && peak(main + 1, accessory) <= budget {
        main += 1;
    }

    SlotCounts { main, accessory }
}

fn session_blueprint(
    day: u32,
    kind: SessionKind,
    counts: SlotCounts,
    profile: &IntakeProfile,
) -> SessionBlueprint {
    let slot = |slot_kind, pattern| Slot {
        kind: slot_kind,
        pattern,
        allowed_equipment: profile.equipment.clone(),
        excluded_regions: profile.injury_flags.clone(),
    };

    let mut accessory_patterns = kind.accessory_patterns().to_vec();
    if profile.goal == Goal::FatLoss {
        // Conditioning leads so it survives when accessory slots are cut.
        if let Some(pos) = accessory_patterns
            .iter()
            .position(|p| *p == MovementPattern::Conditioning)
        {
            let conditioning = accessory_patterns.remove(pos);
            accessory_patterns.insert(0, conditioning);
        }
    }

    let slots = kind
        .main_patterns()
        .iter()
        .take(counts.main)
        .map(|p| slot(SlotKind::MainCompound, *p))
        .chain(
            accessory_patterns
                .into_iter()
                .take(counts.accessory)
                .map(|p| slot(SlotKind::Accessory, p)),
        )
        .collect();

    SessionBlueprint {
        day,
        kind,
        warmup: kind.warmup().iter().map(|s| (*s).to_owned()).collect(),
        slots,
        cooldown: kind.cooldown().iter().map(|s| (*s).to_owned()).collect(),
    }
}
