//! Boundary validation from loosely-typed form answers to [`IntakeProfile`].
//!
//! Every field is checked independently and every problem is collected, so a
//! rejected intake lists all offending fields at once. Nothing is clamped or
//! silently dropped: out-of-range numbers and unknown tokens are errors.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{
    BodyRegion, Equipment, Goal, IntakeProfile, MAX_DAYS_PER_WEEK, MAX_SESSION_MINUTES,
    MIN_DAYS_PER_WEEK, MIN_SESSION_MINUTES, TokenParseError, canonical_token,
};

/// What is wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldProblem {
    #[error("is required")]
    Missing,

    #[error("must be {expected}")]
    WrongType { expected: &'static str },

    #[error("must be between {min} and {max}, got {actual}")]
    OutOfRange { min: u32, max: u32, actual: i64 },

    #[error("has unknown value {token:?}")]
    UnknownToken { token: String },
}

/// A problem attached to the field (or list element) it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    #[serde(flatten)]
    pub problem: FieldProblem,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.problem)
    }
}

/// Rejected intake. `fields` is never empty and follows field order
/// `goal`, `days_per_week`, `session_length_minutes`, `equipment`,
/// `injury_flags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("invalid intake: {}", summarize(.fields))]
pub struct IntakeError {
    pub fields: Vec<FieldError>,
}

fn summarize(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate and canonicalize raw intake answers.
///
/// Accepted keys (extra keys such as `name` or `email` are ignored):
///
/// | key | alias | shape |
/// |---|---|---|
/// | `goal` | `goals` | goal token |
/// | `days_per_week` | | integer 1-6 (number or numeric string) |
/// | `session_length_minutes` | | integer 15-120 (number or numeric string) |
/// | `equipment` | | list of equipment tokens; absent or empty means `bodyweight_only` |
/// | `injury_flags` | `constraints` | list of body-region tokens |
///
/// Tokens are compared in [`canonical_token`] form, and `bodyweight` is
/// accepted for `bodyweight_only`.
pub fn normalize(answers: &Value) -> Result<IntakeProfile, IntakeError> {
    let Some(answers) = answers.as_object() else {
        return Err(IntakeError {
            fields: vec![FieldError {
                field: "answers".to_owned(),
                problem: FieldProblem::WrongType {
                    expected: "an object",
                },
            }],
        });
    };

    let mut errors = Vec::new();

    let goal = goal_field(answers, &mut errors);
    let days_per_week = integer_field(
        answers,
        "days_per_week",
        MIN_DAYS_PER_WEEK,
        MAX_DAYS_PER_WEEK,
        &mut errors,
    );
    let session_length_minutes = integer_field(
        answers,
        "session_length_minutes",
        MIN_SESSION_MINUTES,
        MAX_SESSION_MINUTES,
        &mut errors,
    );
    let mut equipment: BTreeSet<Equipment> = token_set(
        lookup(answers, &["equipment"]),
        "equipment",
        equipment_alias,
        &mut errors,
    );
    let injury_flags: BTreeSet<BodyRegion> = token_set(
        lookup(answers, &["injury_flags", "constraints"]),
        "injury_flags",
        no_alias,
        &mut errors,
    );

    if !errors.is_empty() {
        return Err(IntakeError { fields: errors });
    }

    if equipment.is_empty() {
        equipment.insert(Equipment::BodyweightOnly);
    }

    match (goal, days_per_week, session_length_minutes) {
        (Some(goal), Some(days_per_week), Some(session_length_minutes)) => Ok(IntakeProfile {
            goal,
            days_per_week,
            session_length_minutes,
            equipment,
            injury_flags,
        }),
        // Each missing value pushed an error above.
        _ => Err(IntakeError { fields: errors }),
    }
}

/// First non-null value among `keys`.
fn lookup<'a>(answers: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| answers.get(*k))
        .find(|v| !v.is_null())
}

fn equipment_alias(token: &str) -> &str {
    match token {
        "bodyweight" | "body_weight" => "bodyweight_only",
        other => other,
    }
}

fn no_alias(token: &str) -> &str {
    token
}

fn goal_field(answers: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<Goal> {
    let field = "goal";
    match lookup(answers, &["goal", "goals"]) {
        None => {
            errors.push(FieldError {
                field: field.to_owned(),
                problem: FieldProblem::Missing,
            });
            None
        }
        Some(Value::String(raw)) => match canonical_token(raw).parse::<Goal>() {
            Ok(goal) => Some(goal),
            Err(TokenParseError { token, .. }) => {
                errors.push(FieldError {
                    field: field.to_owned(),
                    problem: FieldProblem::UnknownToken { token },
                });
                None
            }
        },
        Some(_) => {
            errors.push(FieldError {
                field: field.to_owned(),
                problem: FieldProblem::WrongType {
                    expected: "a string",
                },
            });
            None
        }
    }
}

fn integer_field(
    answers: &Map<String, Value>,
    key: &str,
    min: u32,
    max: u32,
    errors: &mut Vec<FieldError>,
) -> Option<u32> {
    let wrong_type = FieldProblem::WrongType {
        expected: "an integer",
    };

    let parsed = match lookup(answers, &[key]) {
        None => Err(FieldProblem::Missing),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or(wrong_type),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| wrong_type),
        Some(_) => Err(wrong_type),
    };

    let result = parsed.and_then(|actual| {
        u32::try_from(actual)
            .ok()
            .filter(|v| (min..=max).contains(v))
            .ok_or(FieldProblem::OutOfRange { min, max, actual })
    });

    match result {
        Ok(v) => Some(v),
        Err(problem) => {
            errors.push(FieldError {
                field: key.to_owned(),
                problem,
            });
            None
        }
    }
}

/// Parse a list of tokens. A bare string is treated as a comma-separated
/// list. Each bad element is reported as `field[index]`.
fn token_set<T>(
    value: Option<&Value>,
    field: &str,
    alias: fn(&str) -> &str,
    errors: &mut Vec<FieldError>,
) -> BTreeSet<T>
where
    T: FromStr<Err = TokenParseError> + Ord,
{
    let items: Vec<Value> = match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| Value::String(part.to_owned()))
            .collect(),
        Some(_) => {
            errors.push(FieldError {
                field: field.to_owned(),
                problem: FieldProblem::WrongType {
                    expected: "a list of strings",
                },
            });
            return BTreeSet::new();
        }
    };

    let mut out = BTreeSet::new();
    for (index, item) in items.iter().enumerate() {
        let element = format!("{field}[{index}]");
        let Value::String(raw) = item else {
            errors.push(FieldError {
                field: element,
                problem: FieldProblem::WrongType {
                    expected: "a string",
                },
            });
            continue;
        };
        let token = canonical_token(raw);
        if token.is_empty() {
            continue;
        }
        match alias(&token).parse::<T>() {
            Ok(parsed) => {
                out.insert(parsed);
            }
            Err(_) => errors.push(FieldError {
                field: element,
                problem: FieldProblem::UnknownToken {
                    token: raw.trim().to_owned(),
                },
            }),
        }
    }
    out
}
