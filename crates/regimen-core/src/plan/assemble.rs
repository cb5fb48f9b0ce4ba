//! Turn a template plus exercise assignments into the plan document.

use crate::catalog::Catalog;
use crate::plan::{PlanStructure, SetPrescription, Week};
use crate::profile::IntakeProfile;
use crate::schedule::policy::{GoalPolicy, policy_for};
use crate::schedule::{dose, peak_caps};
use crate::select::{FilledSlot, Selection, select_exercises};
use crate::suggest::Advice;
use crate::template::{PlanTemplate, SessionBlueprint, SlotKind};

const EFFORT_GUIDANCE: &str = "1-3 RIR";

const DELOAD_NOTE: &str =
    "Deload week: one set fewer than week 1 on every exercise (fewer reps where only one set remains), same rest.";

/// Select exercises for `template` and schedule them into a plan.
///
/// Advice, when present, only steers slot selection and contributes coaching
/// notes; it cannot change the plan's shape.
pub fn assemble_plan(
    profile: &IntakeProfile,
    template: &PlanTemplate,
    catalog: &Catalog,
    advice: Option<&Advice>,
) -> PlanStructure {
    let slot_advice = advice.map(|a| a.slots.as_slice()).unwrap_or_default();
    let selection = select_exercises(template, catalog, slot_advice);
    let coaching = advice.map(Advice::sanitized_notes).unwrap_or_default();
    build_structure(profile, template, &selection, &coaching)
}

/// Schedule an existing selection across the template's weeks.
pub fn build_structure(
    profile: &IntakeProfile,
    template: &PlanTemplate,
    selection: &Selection,
    coaching_notes: &[String],
) -> PlanStructure {
    let policy = policy_for(template.goal);
    let session_types = template.session_types();

    // Caps depend only on the filled slots of a session type, so they are
    // shared by every week.
    let caps: Vec<Vec<u32>> = selection
        .sessions
        .iter()
        .map(|session| {
            let kinds: Vec<SlotKind> = session.filled.iter().map(|f| f.slot.kind).collect();
            peak_caps(policy, &kinds, template.session_set_budget)
        })
        .collect();

    let substitutions = selection.substitution_notes();

    let weeks = template
        .weeks
        .iter()
        .map(|blueprint| {
            let mut main_sets = Vec::new();
            let mut accessories = Vec::new();

            for (session, session_caps) in selection.sessions.iter().zip(&caps) {
                for (filled, cap) in session.filled.iter().zip(session_caps) {
                    let prescription = prescribe(
                        session.kind.label(),
                        filled,
                        policy,
                        blueprint.number,
                        *cap,
                    );
                    match filled.slot.kind {
                        SlotKind::MainCompound => main_sets.push(prescription),
                        SlotKind::Accessory => accessories.push(prescription),
                    }
                }
            }

            let mut notes = vec![summary_note(profile)];
            if blueprint.deload {
                notes.push(DELOAD_NOTE.to_owned());
            }
            notes.extend(substitutions.iter().cloned());
            notes.extend(coaching_notes.iter().map(|n| format!("Coach tip: {n}")));

            Week {
                number: blueprint.number,
                title: if blueprint.deload {
                    format!("Week {} (deload)", blueprint.number)
                } else {
                    format!("Week {}", blueprint.number)
                },
                deload: blueprint.deload,
                schedule: blueprint
                    .sessions
                    .iter()
                    .map(|s| s.kind.label().to_owned())
                    .collect(),
                warmup: union(&session_types, |s| &s.warmup),
                main_sets,
                accessories,
                cooldown: union(&session_types, |s| &s.cooldown),
                notes: notes.join("\n"),
            }
        })
        .collect();

    PlanStructure {
        split: template.split,
        generated_from: profile.clone(),
        weeks,
    }
}

fn prescribe(
    session: &str,
    filled: &FilledSlot,
    policy: &GoalPolicy,
    week: u32,
    cap: u32,
) -> SetPrescription {
    let exercise = &filled.exercise;
    let d = dose(policy, filled.slot.kind, week, cap, exercise.default_reps);
    SetPrescription {
        session: session.to_owned(),
        exercise_id: exercise.id.clone(),
        exercise: exercise.name.clone(),
        sets: d.sets,
        reps: d.reps,
        tempo: exercise.default_tempo.clone(),
        rest_seconds: d.rest_seconds,
        equipment: exercise.equipment.clone(),
        contraindications: exercise.contraindications.clone(),
    }
}

fn summary_note(profile: &IntakeProfile) -> String {
    format!(
        "Goal: {} | Days/wk: {}, Session: {} min | Effort: {EFFORT_GUIDANCE}",
        profile.goal.label(),
        profile.days_per_week,
        profile.session_length_minutes
    )
}

/// Ordered, de-duplicated union of one list from every session type.
fn union<'a>(
    sessions: &[&'a SessionBlueprint],
    items: impl Fn(&'a SessionBlueprint) -> &'a Vec<String>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for session in sessions.iter().copied() {
        for item in items(session) {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::profile::{BodyRegion, Equipment, Goal};
    use crate::schedule::policy::{duration_limit, estimate_session_minutes};
    use crate::suggest::SlotAdvice;
    use crate::template::{SessionKind, select_template};

    fn profile(goal: Goal, days: u32, minutes: u32, equipment: &[Equipment]) -> IntakeProfile {
        IntakeProfile {
            goal,
            days_per_week: days,
            session_length_minutes: minutes,
            equipment: equipment.iter().copied().collect(),
            injury_flags: BTreeSet::new(),
        }
    }

    fn assemble(p: &IntakeProfile, advice: Option<&Advice>) -> PlanStructure {
        assemble_plan(p, &select_template(p), &Catalog::builtin(), advice)
    }

    #[test]
    fn four_titled_weeks_with_schedule() {
        let p = profile(Goal::FatLoss, 3, 45, &[Equipment::Dumbbells]);
        let plan = assemble(&p, None);

        let titles: Vec<&str> = plan.weeks.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Week 1", "Week 2", "Week 3", "Week 4 (deload)"]);
        assert_eq!(plan.weeks[0].schedule, vec!["Full Body"; 3]);
        assert_eq!(plan.generated_from, p);
    }

    #[test]
    fn notes_summarize_the_profile() {
        let p = profile(Goal::FatLoss, 3, 45, &[Equipment::Dumbbells]);
        let plan = assemble(&p, None);
        let first = plan.weeks[0].notes.lines().next().unwrap();
        assert_eq!(
            first,
            "Goal: fat loss | Days/wk: 3, Session: 45 min | Effort: 1-3 RIR"
        );
        assert!(!plan.weeks[0].notes.contains("Deload"));
        assert!(plan.weeks[3].notes.contains(DELOAD_NOTE));
    }

    #[test]
    fn sessions_stay_inside_the_time_budget() {
        for goal in Goal::ALL {
            for minutes in [15, 30, 45, 60, 90, 120] {
                let p = profile(goal, 4, minutes, &[Equipment::Dumbbells, Equipment::Bench]);
                let plan = assemble(&p, None);
                for week in &plan.weeks {
                    for (label, sets) in week.session_sets() {
                        let estimate = estimate_session_minutes(sets);
                        assert!(
                            estimate <= duration_limit(minutes),
                            "{goal} {minutes}min {label} week {}: {estimate}",
                            week.number
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn per_exercise_volume_progresses_then_deloads() {
        let p = profile(Goal::MuscleGain, 5, 75, &[Equipment::Dumbbells, Equipment::Bench]);
        let plan = assemble(&p, None);
        let volumes: Vec<_> = plan.weeks.iter().map(Week::exercise_volumes).collect();
        for (id, w1) in &volumes[0] {
            assert!(*w1 <= volumes[1][id] && volumes[1][id] <= volumes[2][id], "{id}");
            assert!(volumes[3][id] <= *w1, "{id}");
        }
    }

    #[test]
    fn short_strength_sessions_still_deload_below_the_peak() {
        let p = profile(Goal::Strength, 3, 15, &[Equipment::Barbell]);
        let plan = assemble(&p, None);
        let volumes: Vec<_> = plan.weeks.iter().map(Week::exercise_volumes).collect();
        assert!(!volumes[3].is_empty());
        for (id, deload) in &volumes[3] {
            assert!(*deload < volumes[2][id], "{id}");
        }
    }

    #[test]
    fn warmup_and_cooldown_cover_every_session_type() {
        let p = profile(Goal::Strength, 4, 60, &[Equipment::Barbell]);
        let plan = assemble(&p, None);
        let warmup = &plan.weeks[0].warmup;
        assert!(warmup.contains(&"Scapular wall slides".to_owned()));
        assert!(warmup.contains(&"Dynamic leg swings".to_owned()));
        let unique: BTreeSet<&String> = warmup.iter().collect();
        assert_eq!(unique.len(), warmup.len());
        assert!(!plan.weeks[0].cooldown.is_empty());
    }

    #[test]
    fn prescriptions_carry_exercise_metadata() {
        let mut p = profile(Goal::Strength, 2, 60, &[Equipment::Dumbbells]);
        p.injury_flags.insert(BodyRegion::Shoulder);
        let plan = assemble(&p, None);
        let catalog = Catalog::builtin();
        for p in plan.weeks[0].prescriptions() {
            let record = catalog.get(&p.exercise_id).unwrap();
            assert_eq!(p.exercise, record.name);
            assert_eq!(p.equipment, record.equipment);
            assert_eq!(p.contraindications, record.contraindications);
            assert_eq!(p.tempo, record.default_tempo);
        }
    }

    #[test]
    fn advice_notes_are_appended_and_slots_honored() {
        let p = profile(Goal::Strength, 3, 60, &[Equipment::Dumbbells]);
        let advice = Advice {
            slots: vec![SlotAdvice {
                session: SessionKind::FullBody,
                slot: 1,
                exercise_id: "push_up".into(),
            }],
            notes: vec!["Brace before every rep.".into()],
        };
        let plan = assemble(&p, Some(&advice));
        assert_eq!(plan.weeks[0].main_sets[1].exercise_id, "push_up");
        assert!(
            plan.weeks[0]
                .notes
                .contains("Coach tip: Brace before every rep.")
        );

        let plain = assemble(&p, None);
        assert_eq!(plain.weeks.len(), plan.weeks.len());
        assert_eq!(plain.weeks[0].main_sets.len(), plan.weeks[0].main_sets.len());
    }

    #[test]
    fn assembly_is_deterministic() {
        let p = profile(Goal::GeneralFitness, 6, 50, &[Equipment::Kettlebells]);
        let a = serde_json::to_vec(&assemble(&p, None)).unwrap();
        let b = serde_json::to_vec(&assemble(&p, None)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn document_round_trip_preserves_structure() {
        let p = profile(Goal::FatLoss, 3, 45, &[Equipment::Dumbbells]);
        let plan = assemble(&p, None);
        let doc = plan.to_document().unwrap();
        assert_eq!(doc["weeks"][3]["title"], "Week 4 (deload)");
        assert_eq!(PlanStructure::from_document(&doc).unwrap(), plan);
    }
}
