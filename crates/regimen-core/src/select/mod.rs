//! Exercise selection and substitution.
//!
//! Every slot of every session type is filled in this order:
//!
//! 1. provider advice for the slot, if the advised record exists, matches
//!    the slot's pattern and satisfies its constraints;
//! 2. the first record in the pattern's priority list that satisfies the
//!    constraints;
//! 3. the pattern's bodyweight fallback, if the client's injuries allow it;
//! 4. otherwise the slot is omitted and a note explains why.
//!
//! An exercise is used at most once per session. No path, advice included,
//! can place an exercise whose contraindications intersect the slot's
//! excluded regions.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, ExerciseRecord, MovementPattern};
use crate::profile::join_tokens;
use crate::suggest::SlotAdvice;
use crate::template::{PlanTemplate, SessionKind, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSource {
    Advice,
    Priority,
    Fallback,
}

/// Why a slot ended up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmissionReason {
    /// The catalog has no record at all for the pattern.
    PatternNotInCatalog,
    /// Even the bodyweight fallback loads an injured region.
    FallbackContraindicated,
    /// The fallback already fills another slot of the same session.
    NoDistinctExercise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledSlot {
    /// Index into the session blueprint's `slots`.
    pub index: usize,
    pub slot: Slot,
    pub exercise: ExerciseRecord,
    pub source: ChoiceSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmittedSlot {
    pub index: usize,
    pub slot: Slot,
    pub reason: OmissionReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSelection {
    pub kind: SessionKind,
    /// In slot order.
    pub filled: Vec<FilledSlot>,
    pub omitted: Vec<OmittedSlot>,
}

/// Assignments for every session type of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub sessions: Vec<SessionSelection>,
}

impl Selection {
    pub fn session(&self, kind: SessionKind) -> Option<&SessionSelection> {
        self.sessions.iter().find(|s| s.kind == kind)
    }

    /// One note per omitted slot, in session then slot order.
    pub fn substitution_notes(&self) -> Vec<String> {
        self.sessions
            .iter()
            .flat_map(|session| {
                session
                    .omitted
                    .iter()
                    .map(move |o| omission_note(session.kind, o))
            })
            .collect()
    }

    /// How many slots were filled from provider advice.
    pub fn advised_count(&self) -> usize {
        self.sessions
            .iter()
            .flat_map(|s| &s.filled)
            .filter(|f| f.source == ChoiceSource::Advice)
            .count()
    }
}

struct PatternLabel(MovementPattern);

impl fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.as_str().replace('_', " "))
    }
}

fn omission_note(kind: SessionKind, omitted: &OmittedSlot) -> String {
    let pattern = PatternLabel(omitted.slot.pattern);
    let reason = match omitted.reason {
        OmissionReason::PatternNotInCatalog => {
            format!("no {pattern} exercise in the exercise library")
        }
        OmissionReason::FallbackContraindicated => format!(
            "no safe {pattern} exercise for injury flags ({})",
            join_tokens(&omitted.slot.excluded_regions)
        ),
        OmissionReason::NoDistinctExercise => {
            format!("no further {pattern} exercise fits the available equipment")
        }
    };
    format!("{}: {reason}; slot omitted.", kind.label())
}

/// Fill every slot of every session type in `template`.
pub fn select_exercises(
    template: &PlanTemplate,
    catalog: &Catalog,
    advice: &[SlotAdvice],
) -> Selection {
    let sessions = template
        .session_types()
        .into_iter()
        .map(|session| {
            let mut used: HashSet<&str> = HashSet::new();
            let mut filled = Vec::new();
            let mut omitted = Vec::new();

            for (index, slot) in session.slots.iter().enumerate() {
                let advised = advice
                    .iter()
                    .find(|a| a.session == session.kind && a.slot == index)
                    .and_then(|a| advised_record(catalog, slot, a, &used));

                let choice = advised
                    .map(|e| (e, ChoiceSource::Advice))
                    .or_else(|| {
                        catalog
                            .candidates(slot.pattern)
                            .find(|e| admissible(e, slot, &used))
                            .map(|e| (e, ChoiceSource::Priority))
                    })
                    .or_else(|| {
                        catalog
                            .fallback(slot.pattern)
                            .filter(|e| admissible(e, slot, &used))
                            .map(|e| (e, ChoiceSource::Fallback))
                    });

                match choice {
                    Some((exercise, source)) => {
                        used.insert(exercise.id.as_str());
                        filled.push(FilledSlot {
                            index,
                            slot: slot.clone(),
                            exercise: exercise.clone(),
                            source,
                        });
                    }
                    None => {
                        let reason = match catalog.fallback(slot.pattern) {
                            None => OmissionReason::PatternNotInCatalog,
                            Some(f) if !f.contraindications.is_disjoint(&slot.excluded_regions) => {
                                OmissionReason::FallbackContraindicated
                            }
                            Some(_) => OmissionReason::NoDistinctExercise,
                        };
                        debug!(
                            session = session.kind.label(),
                            slot = index,
                            pattern = %slot.pattern,
                            ?reason,
                            "slot omitted"
                        );
                        omitted.push(OmittedSlot {
                            index,
                            slot: slot.clone(),
                            reason,
                        });
                    }
                }
            }

            SessionSelection {
                kind: session.kind,
                filled,
                omitted,
            }
        })
        .collect();

    Selection { sessions }
}

fn admissible(exercise: &ExerciseRecord, slot: &Slot, used: &HashSet<&str>) -> bool {
    exercise.pattern == slot.pattern
        && exercise.fits(&slot.allowed_equipment, &slot.excluded_regions)
        && !used.contains(exercise.id.as_str())
}

fn advised_record<'c>(
    catalog: &'c Catalog,
    slot: &Slot,
    advice: &SlotAdvice,
    used: &HashSet<&str>,
) -> Option<&'c ExerciseRecord> {
    let Some(record) = catalog.get(&advice.exercise_id) else {
        debug!(exercise_id = %advice.exercise_id, "advice ignored: unknown exercise");
        return None;
    };
    if !admissible(record, slot, used) {
        debug!(
            exercise_id = %advice.exercise_id,
            pattern = %slot.pattern,
            "advice ignored: exercise does not fit slot"
        );
        return None;
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::profile::{BodyRegion, Equipment, Goal, IntakeProfile};
    use crate::template::{SlotKind, select_template};

    fn profile(
        goal: Goal,
        days: u32,
        equipment: &[Equipment],
        injuries: &[BodyRegion],
    ) -> IntakeProfile {
        IntakeProfile {
            goal,
            days_per_week: days,
            session_length_minutes: 60,
            equipment: equipment.iter().copied().collect(),
            injury_flags: injuries.iter().copied().collect(),
        }
    }

    fn ids(session: &SessionSelection) -> Vec<&str> {
        session.filled.iter().map(|f| f.exercise.id.as_str()).collect()
    }

    #[test]
    fn picks_highest_priority_fitting_exercise() {
        let catalog = Catalog::builtin();
        let p = profile(Goal::Strength, 3, &[Equipment::Dumbbells], &[]);
        let selection = select_exercises(&select_template(&p), &catalog, &[]);

        let full = selection.session(SessionKind::FullBody).unwrap();
        // Squat, horizontal push, hinge, horizontal pull.
        assert_eq!(
            &ids(full)[..4],
            &[
                "goblet_squat",
                "dumbbell_floor_press",
                "dumbbell_romanian_deadlift",
                "one_arm_dumbbell_row"
            ]
        );
        assert!(full.filled.iter().all(|f| f.source == ChoiceSource::Priority));
    }

    #[test]
    fn bodyweight_only_client_gets_fallbacks() {
        let catalog = Catalog::builtin();
        let p = profile(Goal::GeneralFitness, 2, &[Equipment::BodyweightOnly], &[]);
        let selection = select_exercises(&select_template(&p), &catalog, &[]);

        let full = selection.session(SessionKind::FullBody).unwrap();
        assert_eq!(ids(full)[0], "bodyweight_squat");
        assert_eq!(full.filled[0].source, ChoiceSource::Fallback);
        for filled in &full.filled {
            assert!(filled.exercise.equipment.is_empty());
        }
        // single_leg_hip_bridge is a non-fallback bodyweight hinge.
        assert_eq!(ids(full)[2], "single_leg_hip_bridge");
        assert_eq!(full.filled[2].source, ChoiceSource::Priority);
    }

    #[test]
    fn knee_injury_never_selects_knee_exercises_and_notes_omissions() {
        let catalog = Catalog::builtin();
        let p = profile(
            Goal::MuscleGain,
            4,
            &[Equipment::Dumbbells, Equipment::Bench],
            &[BodyRegion::Knee],
        );
        let selection = select_exercises(&select_template(&p), &catalog, &[]);

        for session in &selection.sessions {
            for filled in &session.filled {
                assert!(
                    !filled.exercise.contraindications.contains(&BodyRegion::Knee),
                    "{} loads the knee",
                    filled.exercise.id
                );
            }
        }

        let lower = selection.session(SessionKind::Lower).unwrap();
        let squat_omitted = lower
            .omitted
            .iter()
            .find(|o| o.slot.pattern == MovementPattern::Squat)
            .expect("every squat loads the knee");
        assert_eq!(squat_omitted.reason, OmissionReason::FallbackContraindicated);

        let notes = selection.substitution_notes();
        assert!(notes.contains(
            &"Lower: no safe squat exercise for injury flags (knee); slot omitted.".to_owned()
        ));
    }

    #[test]
    fn repeated_pattern_takes_next_distinct_exercise() {
        let catalog = Catalog::builtin();
        let mut p = profile(
            Goal::MuscleGain,
            4,
            &[Equipment::Dumbbells, Equipment::Bench],
            &[],
        );
        // Long enough for four main slots: squat, hinge, lunge, hinge.
        p.session_length_minutes = 90;
        let selection = select_exercises(&select_template(&p), &catalog, &[]);
        let lower = selection.session(SessionKind::Lower).unwrap();

        let hinges: Vec<&str> = lower
            .filled
            .iter()
            .filter(|f| f.slot.pattern == MovementPattern::Hinge)
            .map(|f| f.exercise.id.as_str())
            .collect();
        assert_eq!(hinges, vec!["dumbbell_romanian_deadlift", "dumbbell_hip_thrust"]);

        let unique: BTreeSet<&str> = ids(lower).into_iter().collect();
        assert_eq!(unique.len(), lower.filled.len());
    }

    #[test]
    fn repeated_pattern_without_alternatives_is_omitted() {
        let catalog = Catalog::builtin();
        let mut p = profile(Goal::MuscleGain, 4, &[Equipment::BodyweightOnly], &[]);
        p.injury_flags.insert(BodyRegion::Wrist);
        let selection = select_exercises(&select_template(&p), &catalog, &[]);
        let lower = selection.session(SessionKind::Lower).unwrap();

        // Core twice: bird dog is out (wrist), dead bug takes the first.
        let cores: Vec<&FilledSlot> = lower
            .filled
            .iter()
            .filter(|f| f.slot.pattern == MovementPattern::Core)
            .collect();
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].exercise.id, "dead_bug");
        assert!(
            lower
                .omitted
                .iter()
                .any(|o| o.slot.pattern == MovementPattern::Core
                    && o.reason == OmissionReason::NoDistinctExercise)
        );
    }

    #[test]
    fn valid_advice_wins_over_priority() {
        let catalog = Catalog::builtin();
        let p = profile(Goal::Strength, 3, &[Equipment::Dumbbells, Equipment::Bench], &[]);
        let template = select_template(&p);
        let advice = vec![SlotAdvice {
            session: SessionKind::FullBody,
            slot: 1,
            exercise_id: "push_up".into(),
        }];

        let selection = select_exercises(&template, &catalog, &advice);
        let full = selection.session(SessionKind::FullBody).unwrap();
        assert_eq!(full.filled[1].exercise.id, "push_up");
        assert_eq!(full.filled[1].source, ChoiceSource::Advice);
        assert_eq!(selection.advised_count(), 1);
    }

    #[test]
    fn advice_cannot_bypass_constraints() {
        let catalog = Catalog::builtin();
        let p = profile(
            Goal::Strength,
            3,
            &[Equipment::Dumbbells],
            &[BodyRegion::LowerBack],
        );
        let template = select_template(&p);
        let advice = vec![
            // Needs a barbell.
            SlotAdvice {
                session: SessionKind::FullBody,
                slot: 0,
                exercise_id: "barbell_back_squat".into(),
            },
            // Wrong pattern for a push slot.
            SlotAdvice {
                session: SessionKind::FullBody,
                slot: 1,
                exercise_id: "goblet_squat".into(),
            },
            // Contraindicated for the lower back.
            SlotAdvice {
                session: SessionKind::FullBody,
                slot: 2,
                exercise_id: "dumbbell_romanian_deadlift".into(),
            },
            SlotAdvice {
                session: SessionKind::FullBody,
                slot: 3,
                exercise_id: "no_such_exercise".into(),
            },
        ];

        let with_advice = select_exercises(&template, &catalog, &advice);
        let without = select_exercises(&template, &catalog, &[]);
        assert_eq!(with_advice, without);
        assert_eq!(with_advice.advised_count(), 0);
    }

    #[test]
    fn missing_pattern_is_noted() {
        let catalog = Catalog::from_toml_str(
            r#"
[[exercises]]
id = "bodyweight_squat"
name = "Bodyweight Squat"
pattern = "squat"
default_reps = 15
default_tempo = "2-1-1"
fallback = true
"#,
        )
        .unwrap();
        let p = profile(Goal::Strength, 1, &[Equipment::BodyweightOnly], &[]);
        let selection = select_exercises(&select_template(&p), &catalog, &[]);
        let full = selection.session(SessionKind::FullBody).unwrap();

        assert_eq!(ids(full), vec!["bodyweight_squat"]);
        assert!(
            full.omitted
                .iter()
                .all(|o| o.reason == OmissionReason::PatternNotInCatalog)
        );
        assert!(
            selection.substitution_notes()[0]
                .starts_with("Full Body: no horizontal push exercise in the exercise library")
        );
    }

    #[test]
    fn accessory_and_main_slots_keep_their_kind() {
        let catalog = Catalog::builtin();
        let p = profile(Goal::MuscleGain, 3, &[Equipment::Dumbbells], &[]);
        let template = select_template(&p);
        let selection = select_exercises(&template, &catalog, &[]);
        let full = selection.session(SessionKind::FullBody).unwrap();
        let kinds: Vec<SlotKind> = full.filled.iter().map(|f| f.slot.kind).collect();
        let expected: Vec<SlotKind> = template.weeks[0].sessions[0]
            .slots
            .iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn selection_is_deterministic() {
        let catalog = Catalog::builtin();
        let p = profile(
            Goal::FatLoss,
            5,
            &[Equipment::Kettlebells, Equipment::ResistanceBands],
            &[BodyRegion::Shoulder],
        );
        let template = select_template(&p);
        assert_eq!(
            select_exercises(&template, &catalog, &[]),
            select_exercises(&template, &catalog, &[])
        );
    }
}
