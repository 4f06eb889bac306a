//! Row types and insert/update inputs.

pub mod questionnaire;
pub mod user;
