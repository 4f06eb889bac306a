//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Questionnaire access is always
//! scoped by owner.

pub mod questionnaire_repo;
pub mod user_repo;

pub use questionnaire_repo::QuestionnaireRepo;
pub use user_repo::UserRepo;
