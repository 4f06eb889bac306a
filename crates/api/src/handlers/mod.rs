pub mod auth;
pub mod questionnaire;
pub mod user;
