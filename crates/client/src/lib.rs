//! Client-side persistence for the formcraft editor.
//!
//! [`ApiClient`] talks to the formcraft REST API and implements
//! [`QuestionnaireStorage`](formcraft_core::storage::QuestionnaireStorage);
//! [`FileRecoveryStore`] keeps unsaved drafts on disk.

pub mod client;
pub mod recovery;

pub use client::{ApiClient, Registration, UserProfile};
pub use recovery::FileRecoveryStore;
