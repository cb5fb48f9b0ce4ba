//! Program generation and validation engine.
//!
//! ```text
//! raw answers --normalize--> IntakeProfile --select_template--> PlanTemplate
//!                                                  |
//!            Catalog + advisory ContentSuggester --+--> select_exercises
//!                                                  |
//!                                              schedule --> PlanStructure
//!                                                              |
//!                                                          validate --> ValidationResult
//!                                                              |
//!                                          approval: draft -> approved -> sent
//! ```

pub mod approval;
pub mod catalog;
pub mod error;
pub mod generate;
pub mod intake;
pub mod plan;
pub mod profile;
pub mod schedule;
pub mod select;
pub mod suggest;
pub mod template;
pub mod validate;

pub use error::PlanError;
