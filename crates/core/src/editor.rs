//! Editor session: the single owner of one questionnaire draft.
//!
//! An [`EditorSession`] is created when the editor opens and dropped when it
//! closes or after a successful submission. It bundles the draft, the step
//! gate, the drag trackers and the submission state, and mirrors the draft
//! to a [`RecoveryStore`] after every change so a reload can pick it up.

use std::collections::HashMap;

use crate::draft::{AlternativeId, DraftStore, FieldRef, FieldValue, QuestionId};
use crate::error::CoreError;
use crate::questionnaire::{Alternative, Question, QuestionType, Questionnaire, StoredQuestionnaire};
use crate::reorder::{DragTracker, Move};
use crate::schema::{FieldErrors, PathSegment};
use crate::stage::{GateError, Stage, StepGate};
use crate::storage::{edit_recovery_key, QuestionnaireStorage, RecoveryStore, RECOVERY_KEY};
use crate::types::DbId;

/// Whether the session creates a new record or edits a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(DbId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Submitted,
}

impl From<GateError> for CoreError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Invalid { errors, .. } => CoreError::Validation(errors),
            other => CoreError::invalid("", other.to_string()),
        }
    }
}

/// Marks a submission in flight; resets to `Idle` if dropped unfinished.
struct InFlight<'a> {
    state: &'a mut SubmissionState,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a mut SubmissionState) -> Self {
        *state = SubmissionState::Submitting;
        Self { state }
    }

    fn finish(self, outcome: SubmissionState) {
        *self.state = outcome;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if *self.state == SubmissionState::Submitting {
            *self.state = SubmissionState::Idle;
        }
    }
}

pub struct EditorSession<S, R> {
    storage: S,
    recovery: R,
    mode: EditorMode,
    draft: DraftStore,
    gate: StepGate,
    question_drag: DragTracker<QuestionId>,
    alternative_drags: HashMap<QuestionId, DragTracker<AlternativeId>>,
    submission: SubmissionState,
    mirrored_revision: Option<u64>,
}

impl<S, R> EditorSession<S, R>
where
    S: QuestionnaireStorage,
    R: RecoveryStore,
{
    /// Open the editor for a new questionnaire, resuming an unsaved draft
    /// from `recovery` when one is there.
    pub fn open_new(storage: S, recovery: R) -> Self {
        let mut session = Self::with_draft(storage, recovery, EditorMode::Create, DraftStore::new());
        if let Some(document) = session.recovered_document() {
            tracing::debug!(questions = document.questions.len(), "Resuming recovered draft");
            session.draft.restore(document);
            session.mirrored_revision = Some(session.draft.revision());
        }
        session
    }

    /// Open the editor on stored questionnaire `id`.
    ///
    /// Unsaved edits of the same record found in `recovery` take precedence
    /// over the stored copy.
    pub async fn open_existing(storage: S, recovery: R, id: DbId) -> Result<Self, CoreError> {
        let stored = storage.get(id).await?;
        let draft = DraftStore::from_document(stored.document);
        let mut session = Self::with_draft(storage, recovery, EditorMode::Edit(id), draft);
        if let Some(document) = session.recovered_document() {
            tracing::debug!(questionnaire_id = id, "Resuming recovered edits");
            session.draft.restore(document);
        }
        session.mirrored_revision = Some(session.draft.revision());
        Ok(session)
    }

    fn with_draft(storage: S, recovery: R, mode: EditorMode, draft: DraftStore) -> Self {
        Self {
            storage,
            recovery,
            mode,
            draft,
            gate: StepGate::new(),
            question_drag: DragTracker::new(),
            alternative_drags: HashMap::new(),
            submission: SubmissionState::Idle,
            mirrored_revision: None,
        }
    }

    // -- Accessors --

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn draft(&self) -> &DraftStore {
        &self.draft
    }

    pub fn stage(&self) -> Stage {
        self.gate.current()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn recovery(&self) -> &R {
        &self.recovery
    }

    pub fn recovery_key(&self) -> String {
        match self.mode {
            EditorMode::Create => RECOVERY_KEY.to_string(),
            EditorMode::Edit(id) => edit_recovery_key(id),
        }
    }

    /// Errors attached to the draft, at current positions.
    pub fn errors(&self) -> FieldErrors {
        self.draft.errors()
    }

    /// Attached errors as one readable line each, in document order.
    pub fn error_summary(&self) -> Vec<String> {
        self.draft
            .errors()
            .iter()
            .flat_map(|(path, messages)| {
                let label = describe_path(path.segments());
                messages.iter().map(move |message| match &label {
                    Some(label) => format!("{label}: {message}"),
                    None => message.clone(),
                })
            })
            .collect()
    }

    // -- Draft mutations --

    pub fn set_field(&mut self, field: FieldRef, value: FieldValue) -> Result<(), CoreError> {
        self.draft.set_field(field, value)?;
        self.mirror();
        Ok(())
    }

    pub fn add_question(&mut self, initial: Question) -> QuestionId {
        let id = self.draft.add_question(initial);
        self.mirror();
        id
    }

    /// Append the editor's default question.
    pub fn add_default_question(&mut self) -> QuestionId {
        self.add_question(Question::editor_default())
    }

    pub fn remove_question(&mut self, id: QuestionId) -> Result<(), CoreError> {
        self.draft.remove_question(id)?;
        self.alternative_drags.remove(&id);
        if self.question_drag.dragging_id() == Some(id) {
            self.question_drag.end();
        }
        self.mirror();
        Ok(())
    }

    pub fn change_question_type(&mut self, id: QuestionId, kind: QuestionType) -> Result<(), CoreError> {
        self.draft.change_question_type(id, kind)?;
        if !kind.uses_alternatives() {
            self.alternative_drags.remove(&id);
        }
        self.mirror();
        Ok(())
    }

    pub fn add_alternative(
        &mut self,
        question_id: QuestionId,
        initial: Alternative,
    ) -> Result<AlternativeId, CoreError> {
        let id = self.draft.add_alternative(question_id, initial)?;
        self.mirror();
        Ok(id)
    }

    pub fn remove_alternative(&mut self, question_id: QuestionId, id: AlternativeId) -> Result<(), CoreError> {
        self.draft.remove_alternative(question_id, id)?;
        if let Some(tracker) = self.alternative_drags.get_mut(&question_id) {
            if tracker.dragging_id() == Some(id) {
                tracker.end();
            }
        }
        self.mirror();
        Ok(())
    }

    // -- Dragging --

    pub fn begin_question_drag(&mut self, id: QuestionId) -> Result<(), CoreError> {
        let index = self
            .draft
            .question_index(id)
            .ok_or_else(|| CoreError::not_found("Question", id))?;
        self.question_drag.begin(id, index);
        Ok(())
    }

    pub fn end_question_drag(&mut self) {
        self.question_drag.end();
    }

    /// Apply a reorder event carrying the questions' new visual order.
    pub fn reorder_questions(&mut self, new_order: &[QuestionId]) -> Result<Option<Move>, CoreError> {
        if let Some(id) = self.question_drag.dragging_id() {
            match self.draft.question_index(id) {
                Some(index) => self.question_drag.rebase(index),
                None => self.question_drag.end(),
            }
        }
        let draft = &mut self.draft;
        let applied = self
            .question_drag
            .on_reorder(new_order, |mv| draft.move_question(mv.from, mv.to))?;
        if applied.is_some() {
            self.mirror();
        }
        Ok(applied)
    }

    pub fn begin_alternative_drag(
        &mut self,
        question_id: QuestionId,
        id: AlternativeId,
    ) -> Result<(), CoreError> {
        let index = self
            .draft
            .alternative_ids(question_id)?
            .iter()
            .position(|candidate| *candidate == id)
            .ok_or_else(|| CoreError::not_found("Alternative", id))?;
        self.alternative_drags
            .entry(question_id)
            .or_default()
            .begin(id, index);
        Ok(())
    }

    pub fn end_alternative_drag(&mut self, question_id: QuestionId) {
        if let Some(tracker) = self.alternative_drags.get_mut(&question_id) {
            tracker.end();
        }
    }

    /// Apply a reorder event for one question's alternatives.
    pub fn reorder_alternatives(
        &mut self,
        question_id: QuestionId,
        new_order: &[AlternativeId],
    ) -> Result<Option<Move>, CoreError> {
        let Some(tracker) = self.alternative_drags.get_mut(&question_id) else {
            return Ok(None);
        };
        if let Some(id) = tracker.dragging_id() {
            let current = self
                .draft
                .alternative_ids(question_id)
                .ok()
                .and_then(|ids| ids.iter().position(|candidate| *candidate == id));
            match current {
                Some(index) => tracker.rebase(index),
                None => tracker.end(),
            }
        }
        let draft = &mut self.draft;
        let applied =
            tracker.on_reorder(new_order, |mv| draft.move_alternative(question_id, mv.from, mv.to))?;
        if applied.is_some() {
            self.mirror();
        }
        Ok(applied)
    }

    // -- Stages --

    /// Advance past the current stage. On failure the errors are attached
    /// to the draft as well as returned.
    pub fn advance(&mut self) -> Result<Stage, GateError> {
        let snapshot = self.draft.snapshot();
        match self.gate.advance(&snapshot) {
            Ok(stage) => {
                self.draft.clear_errors();
                Ok(stage)
            }
            Err(err) => {
                if let Some(errors) = err.field_errors() {
                    self.draft.apply_errors(errors);
                }
                Err(err)
            }
        }
    }

    pub fn retreat(&mut self) -> Stage {
        self.gate.retreat()
    }

    pub fn jump_to(&mut self, stage: Stage) -> Result<Stage, GateError> {
        self.gate.jump_to(stage)
    }

    // -- Submission --

    /// Validate the whole draft and hand it to storage.
    ///
    /// On success the recovery entry is cleared; a created draft is
    /// discarded and an edited one is replaced by the stored record. On
    /// failure the draft is kept, server-side field errors are attached to
    /// it, and the session may submit again.
    pub async fn submit(&mut self) -> Result<StoredQuestionnaire, CoreError> {
        match self.submission {
            SubmissionState::Idle => {}
            SubmissionState::Submitting => {
                return Err(CoreError::Conflict("A submission is already in progress".into()));
            }
            SubmissionState::Submitted => {
                return Err(CoreError::Conflict("This questionnaire was already submitted".into()));
            }
        }

        let document = self.draft.snapshot();
        if let Err(err) = self.gate.check_submit(&document) {
            if let Some(errors) = err.field_errors() {
                self.draft.apply_errors(errors);
            }
            return Err(err.into());
        }

        let in_flight = InFlight::start(&mut self.submission);
        let result = match self.mode {
            EditorMode::Create => self.storage.create(&document).await,
            EditorMode::Edit(id) => self.storage.update(id, &document.clone().into()).await,
        };

        match result {
            Ok(stored) => {
                in_flight.finish(SubmissionState::Submitted);
                tracing::info!(questionnaire_id = stored.id, mode = ?self.mode, "Questionnaire submitted");
                let key = self.recovery_key();
                if let Err(err) = self.recovery.clear(&key) {
                    tracing::warn!(error = %err, key = %key, "Failed to clear recovered draft");
                }
                match self.mode {
                    EditorMode::Create => {
                        self.draft = DraftStore::new();
                        self.gate = StepGate::new();
                        self.question_drag.end();
                        self.alternative_drags.clear();
                    }
                    EditorMode::Edit(_) => self.draft.restore(stored.document.clone()),
                }
                self.mirrored_revision = Some(self.draft.revision());
                Ok(stored)
            }
            Err(err) => {
                in_flight.finish(SubmissionState::Idle);
                tracing::warn!(error = %err, "Questionnaire submission failed");
                if let Some(errors) = err.field_errors() {
                    self.draft.apply_errors(errors);
                }
                Err(err)
            }
        }
    }

    // -- Recovery --

    fn recovered_document(&self) -> Option<Questionnaire> {
        let key = self.recovery_key();
        let raw = match self.recovery.load(&key) {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(error = %err, key = %key, "Failed to read recovered draft");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(document) => Some(document),
            Err(err) => {
                tracing::warn!(error = %err, key = %key, "Ignoring unreadable recovered draft");
                None
            }
        }
    }

    /// Write the draft to the recovery store if it changed since the last
    /// write. Failures are logged and otherwise ignored.
    fn mirror(&mut self) {
        let revision = self.draft.revision();
        if self.mirrored_revision == Some(revision) {
            return;
        }
        let key = self.recovery_key();
        let written = serde_json::to_string(&self.draft.snapshot())
            .map_err(|e| CoreError::Internal(e.to_string()))
            .and_then(|json| self.recovery.save(&key, &json));
        match written {
            Ok(()) => self.mirrored_revision = Some(revision),
            Err(err) => tracing::warn!(error = %err, key = %key, "Failed to write draft recovery snapshot"),
        }
    }
}

fn describe_path(segments: &[PathSegment]) -> Option<String> {
    use PathSegment::{Index, Key};

    let label = match segments {
        [] => return None,
        [Key(key), Index(q), Key(alts), Index(a), ..] if key == "questions" && alts == "alternatives" => {
            format!("Question {}, Alternative {}", q + 1, a + 1)
        }
        [Key(key), Index(q), ..] if key == "questions" => format!("Question {}", q + 1),
        [Key(key)] => {
            let mut chars = key.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => return None,
            }
        }
        _ => segments
            .iter()
            .map(|segment| match segment {
                Key(key) => key.clone(),
                Index(i) => i.to_string(),
            })
            .collect::<Vec<_>>()
            .join("."),
    };
    Some(label)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::QuestionField;
    use crate::questionnaire::QuestionnairePatch;
    use crate::storage::MemoryRecoveryStore;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeStorage {
        records: Mutex<Vec<StoredQuestionnaire>>,
        received: Mutex<Vec<Questionnaire>>,
        fail_next: Mutex<Option<CoreError>>,
        hang: AtomicBool,
    }

    impl FakeStorage {
        fn with_record(document: Questionnaire) -> Self {
            let storage = Self::default();
            storage.records.lock().unwrap().push(stored(1, document));
            storage
        }

        fn fail_next(&self, err: CoreError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn received(&self) -> Vec<Questionnaire> {
            self.received.lock().unwrap().clone()
        }

        fn take_failure(&self) -> Result<(), CoreError> {
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    fn stored(id: DbId, document: Questionnaire) -> StoredQuestionnaire {
        let now = chrono::Utc::now();
        StoredQuestionnaire {
            id,
            user_id: 1,
            document,
            created_at: now,
            updated_at: now,
        }
    }

    impl QuestionnaireStorage for FakeStorage {
        async fn create(&self, document: &Questionnaire) -> Result<StoredQuestionnaire, CoreError> {
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.take_failure()?;
            self.received.lock().unwrap().push(document.clone());
            let mut records = self.records.lock().unwrap();
            let record = stored(records.len() as DbId + 1, document.clone());
            records.push(record.clone());
            Ok(record)
        }

        async fn get(&self, id: DbId) -> Result<StoredQuestionnaire, CoreError> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or_else(|| CoreError::not_found("Questionnaire", id))
        }

        async fn list(&self) -> Result<Vec<StoredQuestionnaire>, CoreError> {
            Ok(self.records.lock().unwrap().clone())
        }

        async fn update(
            &self,
            id: DbId,
            patch: &QuestionnairePatch,
        ) -> Result<StoredQuestionnaire, CoreError> {
            self.take_failure()?;
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| CoreError::not_found("Questionnaire", id))?;
            if let Some(title) = &patch.title {
                record.document.title = title.clone();
            }
            if let Some(questions) = &patch.questions {
                record.document.questions = questions.clone();
            }
            if let Some(description) = &patch.description {
                record.document.description =
                    Some(description.clone()).filter(|text| !text.is_empty());
            }
            Ok(record.clone())
        }

        async fn delete(&self, id: DbId) -> Result<(), CoreError> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return Err(CoreError::not_found("Questionnaire", id));
            }
            Ok(())
        }
    }

    type Session = EditorSession<FakeStorage, MemoryRecoveryStore>;

    fn new_session() -> Session {
        EditorSession::open_new(FakeStorage::default(), MemoryRecoveryStore::new())
    }

    fn recovered(session: &Session) -> Option<Questionnaire> {
        session
            .recovery()
            .load(&session.recovery_key())
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    fn set_title(session: &mut Session, title: &str) {
        session
            .set_field(FieldRef::Title, FieldValue::Text(title.into()))
            .unwrap();
    }

    #[test]
    fn open_new_starts_empty_without_recovery() {
        let session = new_session();
        assert_eq!(session.draft().snapshot(), Questionnaire::default());
        assert_eq!(session.mode(), EditorMode::Create);
        assert_eq!(session.stage(), Stage::BasicInfo);
    }

    #[test]
    fn open_new_resumes_recovered_draft() {
        let recovery = MemoryRecoveryStore::new();
        let saved = Questionnaire::new("Saved").with_question(Question::new("Agree?", QuestionType::Boolean));
        recovery
            .save(RECOVERY_KEY, &serde_json::to_string(&saved).unwrap())
            .unwrap();

        let session = EditorSession::open_new(FakeStorage::default(), recovery);
        assert_eq!(session.draft().snapshot(), saved);
    }

    #[test]
    fn open_new_ignores_corrupt_recovery() {
        let recovery = MemoryRecoveryStore::new();
        recovery.save(RECOVERY_KEY, "{not json").unwrap();
        let session = EditorSession::open_new(FakeStorage::default(), recovery);
        assert_eq!(session.draft().snapshot(), Questionnaire::default());
    }

    #[test]
    fn every_change_is_mirrored() {
        let mut session = new_session();
        set_title(&mut session, "Survey");
        assert_eq!(recovered(&session).unwrap().title, "Survey");

        let q = session.add_default_question();
        assert_eq!(recovered(&session).unwrap().questions.len(), 1);

        session.remove_question(q).unwrap();
        assert!(recovered(&session).unwrap().questions.is_empty());
    }

    #[test]
    fn advance_attaches_errors_to_draft() {
        let mut session = new_session();
        let err = session.advance().unwrap_err();
        assert!(err.field_errors().unwrap().contains("title"));
        assert!(session.errors().contains("title"));
        assert_eq!(
            session.error_summary(),
            ["Title: Title must be at least 3 characters"]
        );

        set_title(&mut session, "Survey");
        assert!(!session.errors().contains("title"));
        assert_eq!(session.advance().unwrap(), Stage::Questions);
        assert_eq!(session.retreat(), Stage::BasicInfo);
    }

    #[test]
    fn error_summary_names_questions_and_alternatives() {
        let mut session = new_session();
        set_title(&mut session, "Survey");
        session.advance().unwrap();
        session.add_question(Question::new("Fine question", QuestionType::Boolean));
        session.add_question(
            Question::new("x", QuestionType::MultipleChoice)
                .with_alternatives(vec![Alternative::new("ok"), Alternative::blank()]),
        );
        session.advance().unwrap_err();

        let summary = session.error_summary();
        assert!(summary.contains(&"Question 2: Question must be at least 3 characters".to_string()));
        assert!(summary.contains(&"Question 2, Alternative 2: Alternative text is required".to_string()));
    }

    #[test]
    fn question_drag_moves_once_per_position() {
        let mut session = new_session();
        let ids: Vec<_> = (0..4)
            .map(|i| session.add_question(Question::new(format!("Question {i}"), QuestionType::OpenEnded)))
            .collect();

        session.begin_question_drag(ids[2]).unwrap();
        let order = [ids[2], ids[0], ids[1], ids[3]];
        assert_eq!(
            session.reorder_questions(&order).unwrap(),
            Some(Move { from: 2, to: 0 })
        );
        assert_eq!(session.reorder_questions(&order).unwrap(), None);
        session.end_question_drag();

        assert_eq!(session.draft().question_ids(), order);
        let titles: Vec<_> = recovered(&session)
            .unwrap()
            .questions
            .into_iter()
            .map(|q| q.title)
            .collect();
        assert_eq!(titles, ["Question 2", "Question 0", "Question 1", "Question 3"]);
    }

    #[test]
    fn question_drag_follows_item_after_remove_mid_drag() {
        let mut session = new_session();
        let ids: Vec<_> = (0..3)
            .map(|i| session.add_question(Question::new(format!("Question {i}"), QuestionType::OpenEnded)))
            .collect();

        session.begin_question_drag(ids[2]).unwrap();
        session.remove_question(ids[0]).unwrap();
        let order = [ids[2], ids[1]];
        assert_eq!(
            session.reorder_questions(&order).unwrap(),
            Some(Move { from: 1, to: 0 })
        );
        assert_eq!(session.draft().question_ids(), order);
    }

    #[test]
    fn alternative_drag_follows_item_after_remove_mid_drag() {
        let mut session = new_session();
        let q = session.add_question(
            Question::new("Pick", QuestionType::MultipleChoice).with_alternatives(vec![
                Alternative::new("A"),
                Alternative::new("B"),
                Alternative::new("C"),
            ]),
        );
        let alts = session.draft().alternative_ids(q).unwrap();

        session.begin_alternative_drag(q, alts[2]).unwrap();
        session.remove_alternative(q, alts[0]).unwrap();
        session.reorder_alternatives(q, &[alts[2], alts[1]]).unwrap();
        assert_eq!(session.draft().alternative_ids(q).unwrap(), [alts[2], alts[1]]);
    }

    #[test]
    fn alternative_drag_is_scoped_to_question() {
        let mut session = new_session();
        let q = session.add_question(
            Question::new("Pick", QuestionType::MultipleChoice)
                .with_alternatives(vec![Alternative::new("A"), Alternative::new("B")]),
        );
        let other = session.add_default_question();
        let alts = session.draft().alternative_ids(q).unwrap();

        assert_matches!(
            session.begin_alternative_drag(other, alts[0]),
            Err(CoreError::NotFound { entity: "Alternative", .. })
        );
        session.begin_alternative_drag(q, alts[1]).unwrap();
        session.reorder_alternatives(q, &[alts[1], alts[0]]).unwrap();
        assert_eq!(session.draft().alternative_ids(q).unwrap(), [alts[1], alts[0]]);
        assert_eq!(session.reorder_alternatives(other, &[]).unwrap(), None);
    }

    #[tokio::test]
    async fn satisfaction_scale_is_submitted_as_drafted() {
        let mut session = new_session();
        set_title(&mut session, "Satisfaction");
        session.advance().unwrap();
        session.add_question(Question::new("How satisfied?", QuestionType::Scale).with_bounds(0.0, 10.0));
        session.advance().unwrap();
        assert_eq!(session.stage(), Stage::Preview);
        assert!(recovered(&session).is_some());

        let stored = session.submit().await.unwrap();

        let expected = Questionnaire::new("Satisfaction")
            .with_question(Question::new("How satisfied?", QuestionType::Scale).with_bounds(0.0, 10.0));
        assert_eq!(session.storage().received(), [expected.clone()]);
        assert_eq!(stored.document, expected);
        assert!(stored.document.questions[0].alternatives.is_none());
        assert_eq!(recovered(&session), None);
        assert_eq!(session.submission_state(), SubmissionState::Submitted);
        assert_eq!(session.draft().snapshot(), Questionnaire::default());
    }

    #[tokio::test]
    async fn submit_before_last_stage_is_rejected() {
        let mut session = new_session();
        set_title(&mut session, "Survey");
        session.add_question(Question::new("Agree?", QuestionType::Boolean));
        assert_matches!(session.submit().await, Err(CoreError::Validation(_)));
        assert!(session.storage().received().is_empty());
    }

    #[tokio::test]
    async fn submit_without_questions_is_rejected() {
        let mut session = new_session();
        set_title(&mut session, "Survey");
        session.advance().unwrap();
        session.advance().unwrap();

        let err = session.submit().await.unwrap_err();
        assert!(err.field_errors().unwrap().contains("questions"));
        assert_eq!(session.submission_state(), SubmissionState::Idle);
    }

    async fn ready_session() -> Session {
        let mut session = new_session();
        set_title(&mut session, "Survey");
        session.advance().unwrap();
        session.add_question(Question::new("Agree?", QuestionType::Boolean));
        session.advance().unwrap();
        session
    }

    #[tokio::test]
    async fn failed_submit_keeps_draft_and_allows_retry() {
        let mut session = ready_session().await;
        let mut errors = FieldErrors::new();
        errors.add("questions.0.title".parse().unwrap(), "Rejected by server");
        session.storage().fail_next(CoreError::Validation(errors));

        assert_matches!(session.submit().await, Err(CoreError::Validation(_)));
        assert_eq!(session.submission_state(), SubmissionState::Idle);
        assert_eq!(session.draft().snapshot().title, "Survey");
        assert!(session.errors().contains("questions.0.title"));
        assert!(recovered(&session).is_some());

        session.submit().await.unwrap();
        assert_eq!(session.storage().received().len(), 1);
    }

    #[tokio::test]
    async fn second_submit_after_success_is_refused() {
        let mut session = ready_session().await;
        session.submit().await.unwrap();
        assert_matches!(session.submit().await, Err(CoreError::Conflict(_)));
        assert_eq!(session.storage().received().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_submit_returns_to_idle() {
        let mut session = ready_session().await;
        session.storage().hang.store(true, Ordering::SeqCst);

        let outcome = tokio::time::timeout(Duration::from_millis(20), session.submit()).await;
        assert!(outcome.is_err());
        assert_eq!(session.submission_state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn open_existing_hydrates_and_updates() {
        let document = Questionnaire::new("Stored")
            .with_question(Question::new("Agree?", QuestionType::Boolean));
        let storage = FakeStorage::with_record(document.clone());
        let mut session = EditorSession::open_existing(storage, MemoryRecoveryStore::new(), 1)
            .await
            .unwrap();
        assert_eq!(session.mode(), EditorMode::Edit(1));
        assert_eq!(session.draft().snapshot(), document);
        assert_eq!(session.recovery_key(), "questionnaire-form:1");

        let q = session.draft().question_ids()[0];
        session
            .set_field(FieldRef::Question(q, QuestionField::Title), FieldValue::Text("Do you agree?".into()))
            .unwrap();
        session.advance().unwrap();
        session.advance().unwrap();
        let stored = session.submit().await.unwrap();

        assert_eq!(stored.document.questions[0].title, "Do you agree?");
        assert_eq!(session.draft().snapshot(), stored.document);
        assert_eq!(recovered(&session), None);
    }

    #[tokio::test]
    async fn clearing_description_in_edit_mode_reaches_storage() {
        let document = Questionnaire::new("Stored")
            .with_description("Old description")
            .with_question(Question::new("Agree?", QuestionType::Boolean));
        let storage = FakeStorage::with_record(document);
        let mut session = EditorSession::open_existing(storage, MemoryRecoveryStore::new(), 1)
            .await
            .unwrap();

        session
            .set_field(FieldRef::Description, FieldValue::OptionalText(None))
            .unwrap();
        session.advance().unwrap();
        session.advance().unwrap();
        let stored = session.submit().await.unwrap();

        assert_eq!(stored.document.description, None);
        assert_eq!(session.draft().description(), None);
        assert_eq!(session.storage().get(1).await.unwrap().document.description, None);
    }

    #[test]
    fn patch_from_document_always_carries_description() {
        let patch = QuestionnairePatch::from(Questionnaire::new("Plain"));
        assert_eq!(patch.description.as_deref(), Some(""));

        let patch = QuestionnairePatch::from(Questionnaire::new("Kept").with_description("About"));
        assert_eq!(patch.description.as_deref(), Some("About"));
    }

    #[tokio::test]
    async fn open_existing_prefers_recovered_edits() {
        let storage = FakeStorage::with_record(Questionnaire::new("Stored"));
        let recovery = MemoryRecoveryStore::new();
        let unsaved = Questionnaire::new("Unsaved edit");
        recovery
            .save(&edit_recovery_key(1), &serde_json::to_string(&unsaved).unwrap())
            .unwrap();

        let session = EditorSession::open_existing(storage, recovery, 1).await.unwrap();
        assert_eq!(session.draft().snapshot(), unsaved);
    }

    #[tokio::test]
    async fn open_existing_missing_record_is_not_found() {
        let result = EditorSession::open_existing(FakeStorage::default(), MemoryRecoveryStore::new(), 9).await;
        assert_matches!(
            result.map(|_| ()),
            Err(CoreError::NotFound { entity: "Questionnaire", .. })
        );
    }

    #[test]
    fn describe_path_labels() {
        use PathSegment::{Index, Key};
        assert_eq!(describe_path(&[]), None);
        assert_eq!(describe_path(&[Key("description".into())]).as_deref(), Some("Description"));
        assert_eq!(
            describe_path(&[Key("questions".into()), Index(0), Key("type".into())]).as_deref(),
            Some("Question 1")
        );
    }
}
