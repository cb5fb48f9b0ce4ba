pub mod intakes;
pub mod plans;
