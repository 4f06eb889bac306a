//! Collaborator interfaces the editor session persists through.
//!
//! [`QuestionnaireStorage`] is the remote store, scoped to whichever user
//! the implementation is authenticated as. [`RecoveryStore`] is the local
//! scratch area the in-progress draft is mirrored to.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::error::CoreError;
use crate::questionnaire::{Questionnaire, QuestionnairePatch, StoredQuestionnaire};
use crate::types::DbId;

/// Recovery key of the draft being created.
pub const RECOVERY_KEY: &str = "questionnaire-form";

/// Recovery key of a draft editing the stored questionnaire `id`.
pub fn edit_recovery_key(id: DbId) -> String {
    format!("{RECOVERY_KEY}:{id}")
}

/// Owner-scoped questionnaire persistence.
///
/// Implementations translate their own failures into [`CoreError`] kinds;
/// a record owned by someone else is reported as `NotFound`.
pub trait QuestionnaireStorage: Send + Sync {
    fn create(
        &self,
        document: &Questionnaire,
    ) -> impl Future<Output = Result<StoredQuestionnaire, CoreError>> + Send;

    fn get(&self, id: DbId) -> impl Future<Output = Result<StoredQuestionnaire, CoreError>> + Send;

    /// Newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<StoredQuestionnaire>, CoreError>> + Send;

    fn update(
        &self,
        id: DbId,
        patch: &QuestionnairePatch,
    ) -> impl Future<Output = Result<StoredQuestionnaire, CoreError>> + Send;

    fn delete(&self, id: DbId) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Local key/value scratch store for unsaved drafts.
pub trait RecoveryStore: Send + Sync {
    fn save(&self, key: &str, snapshot: &str) -> Result<(), CoreError>;

    fn load(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Removing a missing key is not an error.
    fn clear(&self, key: &str) -> Result<(), CoreError>;
}

impl<T: QuestionnaireStorage + ?Sized> QuestionnaireStorage for Arc<T> {
    fn create(
        &self,
        document: &Questionnaire,
    ) -> impl Future<Output = Result<StoredQuestionnaire, CoreError>> + Send {
        (**self).create(document)
    }

    fn get(&self, id: DbId) -> impl Future<Output = Result<StoredQuestionnaire, CoreError>> + Send {
        (**self).get(id)
    }

    fn list(&self) -> impl Future<Output = Result<Vec<StoredQuestionnaire>, CoreError>> + Send {
        (**self).list()
    }

    fn update(
        &self,
        id: DbId,
        patch: &QuestionnairePatch,
    ) -> impl Future<Output = Result<StoredQuestionnaire, CoreError>> + Send {
        (**self).update(id, patch)
    }

    fn delete(&self, id: DbId) -> impl Future<Output = Result<(), CoreError>> + Send {
        (**self).delete(id)
    }
}

impl<T: RecoveryStore + ?Sized> RecoveryStore for Arc<T> {
    fn save(&self, key: &str, snapshot: &str) -> Result<(), CoreError> {
        (**self).save(key, snapshot)
    }

    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        (**self).load(key)
    }

    fn clear(&self, key: &str) -> Result<(), CoreError> {
        (**self).clear(key)
    }
}

/// Process-local recovery store.
#[derive(Debug, Default)]
pub struct MemoryRecoveryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, CoreError> {
        self.entries
            .lock()
            .map_err(|_| CoreError::Internal("recovery store lock poisoned".into()))
    }
}

impl RecoveryStore for MemoryRecoveryStore {
    fn save(&self, key: &str, snapshot: &str) -> Result<(), CoreError> {
        self.entries()?.insert(key.to_string(), snapshot.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn clear(&self, key: &str) -> Result<(), CoreError> {
        self.entries()?.remove(key);
        Ok(())
    }
}
