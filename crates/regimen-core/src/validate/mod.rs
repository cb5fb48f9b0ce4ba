//! Rule-based plan validation.
//!
//! Every rule runs on every plan; violations are collected, never
//! short-circuited. The check is a pure function of the plan document and
//! the client profile. It reads equipment and contraindications from the
//! prescriptions themselves, so it never consults the catalog and re-checks
//! what selection and scheduling already promised.
//!
//! Progression and deload compare weeks by position in the plan. The stored
//! `number` labels are checked separately and never used to look weeks up.
//!
//! | rule | severity |
//! |---|---|
//! | `plan.horizon` | error |
//! | `week.numbering` | error |
//! | `week.warmup_present` | error |
//! | `week.main_sets_present` | error |
//! | `injury.contraindicated` | error |
//! | `equipment.available` | error |
//! | `session.duration` | error |
//! | `session.duration_nominal` | warning |
//! | `progression.monotonic` | error |
//! | `deload.volume` | error |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plan::{PlanStructure, Week};
use crate::profile::{Equipment, IntakeProfile, join_tokens};
use crate::schedule::policy::{DELOAD_WEEK, HORIZON_WEEKS, duration_limit, estimate_session_minutes};

pub const HORIZON: &str = "plan.horizon";
pub const WEEK_NUMBERING: &str = "week.numbering";
pub const WARMUP_PRESENT: &str = "week.warmup_present";
pub const MAIN_SETS_PRESENT: &str = "week.main_sets_present";
pub const INJURY_CONTRAINDICATED: &str = "injury.contraindicated";
pub const EQUIPMENT_AVAILABLE: &str = "equipment.available";
pub const SESSION_DURATION: &str = "session.duration";
pub const SESSION_DURATION_NOMINAL: &str = "session.duration_nominal";
pub const PROGRESSION_MONOTONIC: &str = "progression.monotonic";
pub const DELOAD_VOLUME: &str = "deload.volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warning => "warning",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    fn error(rule_id: &str, message: String) -> Self {
        Self {
            rule_id: rule_id.to_owned(),
            severity: Severity::Error,
            message,
        }
    }

    fn warning(rule_id: &str, message: String) -> Self {
        Self {
            rule_id: rule_id.to_owned(),
            severity: Severity::Warning,
            message,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.rule_id, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `true` iff no violation has error severity.
    pub pass: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    fn from_violations(violations: Vec<Violation>) -> Self {
        let pass = !violations.iter().any(|v| v.severity == Severity::Error);
        Self { pass, violations }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
    }

    /// Whether any violation carries `rule_id`.
    pub fn has_rule(&self, rule_id: &str) -> bool {
        self.violations.iter().any(|v| v.rule_id == rule_id)
    }

    pub fn to_document(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Check `plan` against every rule for `profile`.
pub fn validate_plan(plan: &PlanStructure, profile: &IntakeProfile) -> ValidationResult {
    let mut violations = Vec::new();

    if plan.weeks.len() != HORIZON_WEEKS as usize {
        violations.push(Violation::error(
            HORIZON,
            format!(
                "expected {HORIZON_WEEKS} weeks, found {}",
                plan.weeks.len()
            ),
        ));
    }

    for (position, week) in (1..).zip(&plan.weeks) {
        if week.number != position {
            violations.push(Violation::error(
                WEEK_NUMBERING,
                format!("week at position {position} is numbered {}", week.number),
            ));
        }
        check_week(week, profile, &mut violations);
    }

    check_progression(plan, &mut violations);
    check_deload(plan, &mut violations);

    ValidationResult::from_violations(violations)
}

fn check_week(week: &Week, profile: &IntakeProfile, violations: &mut Vec<Violation>) {
    let n = week.number;

    if week.warmup.iter().all(|w| w.trim().is_empty()) {
        violations.push(Violation::error(
            WARMUP_PRESENT,
            format!("week {n} has no warm-up"),
        ));
    }
    if week.main_sets.is_empty() {
        violations.push(Violation::error(
            MAIN_SETS_PRESENT,
            format!("week {n} has no main sets"),
        ));
    }

    for p in week.prescriptions() {
        let loaded: Vec<_> = p.contraindications.intersection(&profile.injury_flags).collect();
        if !loaded.is_empty() {
            violations.push(Violation::error(
                INJURY_CONTRAINDICATED,
                format!(
                    "week {n}: {} ({}) is contraindicated for {}",
                    p.exercise,
                    p.exercise_id,
                    join_tokens(loaded)
                ),
            ));
        }

        let missing: Vec<&Equipment> = p.equipment.difference(&profile.equipment).collect();
        if !missing.is_empty() {
            violations.push(Violation::error(
                EQUIPMENT_AVAILABLE,
                format!(
                    "week {n}: {} ({}) needs unavailable equipment: {}",
                    p.exercise,
                    p.exercise_id,
                    join_tokens(missing)
                ),
            ));
        }
    }

    let nominal = f64::from(profile.session_length_minutes);
    let limit = duration_limit(profile.session_length_minutes);
    for (session, sets) in week.session_sets() {
        let estimate = estimate_session_minutes(sets);
        if estimate > limit {
            violations.push(Violation::error(
                SESSION_DURATION,
                format!(
                    "week {n} {session}: estimated {estimate:.1} min exceeds {limit:.1} min \
                     ({} min + tolerance)",
                    profile.session_length_minutes
                ),
            ));
        } else if estimate > nominal {
            violations.push(Violation::warning(
                SESSION_DURATION_NOMINAL,
                format!(
                    "week {n} {session}: estimated {estimate:.1} min is over the requested {} min",
                    profile.session_length_minutes
                ),
            ));
        }
    }
}

fn check_progression(plan: &PlanStructure, violations: &mut Vec<Violation>) {
    let loading: Vec<(u32, BTreeMap<&str, u64>)> = (1..DELOAD_WEEK)
        .zip(&plan.weeks)
        .map(|(position, week)| (position, week.exercise_volumes()))
        .collect();

    for pair in loading.windows(2) {
        let (earlier, before) = &pair[0];
        let (later, after) = &pair[1];
        for (id, volume) in before {
            let next = after.get(id).copied().unwrap_or(0);
            if next < *volume {
                violations.push(Violation::error(
                    PROGRESSION_MONOTONIC,
                    format!("{id}: volume drops from {volume} in week {earlier} to {next} in week {later}"),
                ));
            }
        }
    }
}

fn check_deload(plan: &PlanStructure, violations: &mut Vec<Violation>) {
    let (Some(first), Some(deload)) = (
        plan.weeks.first(),
        plan.weeks.get(DELOAD_WEEK as usize - 1),
    ) else {
        return;
    };
    let first = first.exercise_volumes();
    for (id, volume) in &deload.exercise_volumes() {
        let baseline = first.get(id).copied().unwrap_or(0);
        if *volume > baseline {
            violations.push(Violation::error(
                DELOAD_VOLUME,
                format!(
                    "{id}: week {DELOAD_WEEK} volume {volume} exceeds week 1 volume {baseline}"
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::catalog::Catalog;
    use crate::plan::assemble_plan;
    use crate::profile::{BodyRegion, Goal};
    use crate::template::select_template;

    fn profile() -> IntakeProfile {
        IntakeProfile {
            goal: Goal::FatLoss,
            days_per_week: 3,
            session_length_minutes: 45,
            equipment: [Equipment::Dumbbells].into(),
            injury_flags: BTreeSet::new(),
        }
    }

    fn plan_for(p: &IntakeProfile) -> PlanStructure {
        assemble_plan(p, &select_template(p), &Catalog::builtin(), None)
    }

    fn rules(result: &ValidationResult) -> Vec<&str> {
        result.violations.iter().map(|v| v.rule_id.as_str()).collect()
    }

    #[test]
    fn generated_plan_passes() {
        let p = profile();
        let result = validate_plan(&plan_for(&p), &p);
        assert!(result.pass, "{:?}", result.violations);
        assert_eq!(result.errors().count(), 0);
    }

    #[test]
    fn missing_week_fails_horizon() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks.pop();
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(result.has_rule(HORIZON));
    }

    #[test]
    fn empty_warmup_and_main_sets_are_reported_per_week() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[1].warmup.clear();
        plan.weeks[2].main_sets.clear();
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(
            result
                .violations
                .iter()
                .any(|v| v.rule_id == WARMUP_PRESENT && v.message == "week 2 has no warm-up")
        );
        assert!(result.has_rule(MAIN_SETS_PRESENT));
    }

    #[test]
    fn contraindicated_exercise_is_caught_without_the_catalog() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[0].main_sets[0]
            .contraindications
            .insert(BodyRegion::Knee);
        let mut injured = p.clone();
        injured.injury_flags.insert(BodyRegion::Knee);

        let result = validate_plan(&plan, &injured);
        assert!(!result.pass);
        let v = result
            .violations
            .iter()
            .find(|v| v.rule_id == INJURY_CONTRAINDICATED)
            .unwrap();
        assert!(v.message.starts_with("week 1: "));
        assert!(v.message.ends_with("contraindicated for knee"));
    }

    #[test]
    fn unavailable_equipment_is_caught() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[3].accessories[0]
            .equipment
            .insert(Equipment::Barbell);
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(result.has_rule(EQUIPMENT_AVAILABLE));
    }

    #[test]
    fn long_sessions_fail_and_near_misses_warn() {
        let p = profile();
        let mut plan = plan_for(&p);
        // 45 min with 8 min overhead: 19 sets is 46 min (warning), 21 sets
        // is 50 min (over 49.5).
        let sets_in = |w: &Week| w.session_sets()[0].1;

        let extra = 19 - sets_in(&plan.weeks[0]);
        plan.weeks[0].main_sets[0].sets += extra;
        let extra = 21 - sets_in(&plan.weeks[1]);
        plan.weeks[1].main_sets[0].sets += extra;

        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        let warning = result
            .violations
            .iter()
            .find(|v| v.rule_id == SESSION_DURATION_NOMINAL)
            .unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert!(warning.message.starts_with("week 1 Full Body"));
        let error = result
            .violations
            .iter()
            .find(|v| v.rule_id == SESSION_DURATION)
            .unwrap();
        assert!(error.message.starts_with("week 2 Full Body: estimated 50.0 min"));
    }

    #[test]
    fn warnings_alone_still_pass() {
        let p = profile();
        let mut plan = plan_for(&p);
        // Week 3 peaks at 18 sets (44 min); one more set is 46 min.
        plan.weeks[2].main_sets[0].sets += 1;
        let result = validate_plan(&plan, &p);
        assert!(result.pass, "{:?}", result.violations);
        assert!(result.has_rule(SESSION_DURATION_NOMINAL));
    }

    #[test]
    fn heavier_deload_fails() {
        let p = profile();
        let mut plan = plan_for(&p);
        let id = plan.weeks[0].main_sets[0].exercise_id.clone();
        let w1_sets = plan.weeks[0].main_sets[0].sets;
        plan.weeks[3].main_sets[0].sets = w1_sets + 1;
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        let v = result
            .violations
            .iter()
            .find(|v| v.rule_id == DELOAD_VOLUME)
            .unwrap();
        assert!(v.message.starts_with(&id));
    }

    #[test]
    fn relabelled_heavier_deload_still_fails() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[3].number = 5;
        let week_one: Vec<u32> = plan.weeks[0].main_sets.iter().map(|s| s.sets).collect();
        for (set, sets) in plan.weeks[3].main_sets.iter_mut().zip(week_one) {
            set.sets = sets + 1;
        }
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(result.has_rule(DELOAD_VOLUME));
        let v = result
            .violations
            .iter()
            .find(|v| v.rule_id == WEEK_NUMBERING)
            .unwrap();
        assert_eq!(v.message, "week at position 4 is numbered 5");
    }

    #[test]
    fn duplicate_week_numbers_do_not_hide_a_regression() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[1].number = 1;
        plan.weeks[2].number = 2;
        plan.weeks[2].main_sets[0].sets = 1;
        plan.weeks[1].main_sets[0].sets = 2;
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(result.has_rule(PROGRESSION_MONOTONIC));
        assert_eq!(
            result
                .violations
                .iter()
                .filter(|v| v.rule_id == WEEK_NUMBERING)
                .count(),
            2
        );
    }

    #[test]
    fn huge_imported_counts_are_reported_not_overflowed() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[3].main_sets[0].sets = 3;
        plan.weeks[3].main_sets[0].reps = u32::MAX / 2;
        plan.weeks[0].accessories[0].sets = u32::MAX;
        plan.weeks[0].accessories[0].reps = u32::MAX;
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(result.has_rule(DELOAD_VOLUME));
        assert!(result.has_rule(PROGRESSION_MONOTONIC));
    }

    #[test]
    fn regressing_loading_week_fails() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[2].main_sets[0].sets = 1;
        plan.weeks[1].main_sets[0].sets = 2;
        let result = validate_plan(&plan, &p);
        assert!(!result.pass);
        assert!(result.has_rule(PROGRESSION_MONOTONIC));
    }

    #[test]
    fn all_rules_are_collected() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[0].warmup.clear();
        plan.weeks[3].accessories[0].equipment.insert(Equipment::CableMachine);
        plan.weeks[3].main_sets[0].sets = 10;
        let result = validate_plan(&plan, &p);
        let found = rules(&result);
        assert!(found.contains(&WARMUP_PRESENT));
        assert!(found.contains(&EQUIPMENT_AVAILABLE));
        assert!(found.contains(&DELOAD_VOLUME));
    }

    #[test]
    fn validation_is_repeatable() {
        let p = profile();
        let mut plan = plan_for(&p);
        plan.weeks[0].main_sets.clear();
        assert_eq!(validate_plan(&plan, &p), validate_plan(&plan, &p));
    }

    #[test]
    fn result_document_shape() {
        let result = ValidationResult::from_violations(vec![Violation::warning(
            SESSION_DURATION_NOMINAL,
            "over".into(),
        )]);
        let doc = result.to_document().unwrap();
        assert_eq!(doc["pass"], true);
        assert_eq!(doc["violations"][0]["severity"], "warning");
        assert_eq!(doc["violations"][0]["rule_id"], "session.duration_nominal");
    }
}
