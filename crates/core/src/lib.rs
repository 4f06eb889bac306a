//! Formcraft domain core.
//!
//! The questionnaire model, its validation schema, and the editing engine
//! (draft store, step gate, reorder tracking, editor session). Persistence
//! is reached only through the traits in [`storage`], so nothing here does
//! I/O of its own.

pub mod draft;
pub mod editor;
pub mod error;
pub mod questionnaire;
pub mod reorder;
pub mod schema;
pub mod stage;
pub mod storage;
pub mod types;
