//! In-memory draft of the questionnaire being edited.
//!
//! Every question and alternative carries a generated identity that is
//! independent of its position, so moves never change which entity holds
//! which data. Validation errors attached to the draft are keyed by those
//! identities too and follow their entity through reorders.
//!
//! The store never validates on its own. Callers run the schema, hand the
//! result to [`DraftStore::apply_errors`], and each mutation clears the
//! errors of the fields it touched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::questionnaire::{Alternative, Question, QuestionType, Questionnaire};
use crate::reorder::move_item;
use crate::schema::{FieldErrors, FieldPath, PathSegment};

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Stable identity of a draft question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

/// Stable identity of a draft alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlternativeId(u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl fmt::Display for AlternativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Field addressing
// ---------------------------------------------------------------------------

/// Scalar fields of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionField {
    Title,
    Type,
    Required,
    MinValue,
    MaxValue,
}

impl QuestionField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Type => "type",
            Self::Required => "required",
            Self::MinValue => "minValue",
            Self::MaxValue => "maxValue",
        }
    }
}

/// Scalar fields of an alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlternativeField {
    Text,
    IsCorrect,
}

impl AlternativeField {
    pub fn key(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::IsCorrect => "isCorrect",
        }
    }
}

/// A scalar field of the draft, naming entities by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Title,
    Description,
    Question(QuestionId, QuestionField),
    Alternative(QuestionId, AlternativeId, AlternativeField),
}

/// A value for [`DraftStore::set_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    OptionalText(Option<String>),
    Bool(bool),
    Number(Option<f64>),
    Type(QuestionType),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::OptionalText(_) => "optional text",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Type(_) => "question type",
        }
    }
}

/// Where an attached error message lives, by identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ErrorTarget {
    /// Top-level or unresolvable path, kept verbatim.
    Document(FieldPath),
    Question(QuestionId, FieldPath),
    Alternative(QuestionId, AlternativeId, FieldPath),
}

// ---------------------------------------------------------------------------
// Draft entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DraftAlternative {
    id: AlternativeId,
    pub text: String,
    pub is_correct: bool,
}

impl DraftAlternative {
    pub fn id(&self) -> AlternativeId {
        self.id
    }

    fn to_alternative(&self) -> Alternative {
        Alternative {
            text: self.text.clone(),
            is_correct: self.is_correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftQuestion {
    id: QuestionId,
    pub title: String,
    pub kind: QuestionType,
    pub required: bool,
    alternatives: Option<Vec<DraftAlternative>>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl DraftQuestion {
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// Alternatives in order; empty when the field is absent.
    pub fn alternatives(&self) -> &[DraftAlternative] {
        self.alternatives.as_deref().unwrap_or(&[])
    }

    pub fn has_alternatives_field(&self) -> bool {
        self.alternatives.is_some()
    }

    pub fn alternative_ids(&self) -> Vec<AlternativeId> {
        self.alternatives().iter().map(DraftAlternative::id).collect()
    }

    fn alternative_index(&self, id: AlternativeId) -> Option<usize> {
        self.alternatives().iter().position(|a| a.id == id)
    }

    fn to_question(&self) -> Question {
        Question {
            title: self.title.clone(),
            kind: self.kind,
            required: self.required,
            alternatives: self
                .alternatives
                .as_ref()
                .map(|alts| alts.iter().map(DraftAlternative::to_alternative).collect()),
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The single in-progress questionnaire of an editing session.
#[derive(Debug, Clone, Default)]
pub struct DraftStore {
    title: String,
    description: Option<String>,
    questions: Vec<DraftQuestion>,
    next_id: u64,
    revision: u64,
    errors: BTreeMap<ErrorTarget, Vec<String>>,
}

impl DraftStore {
    /// An empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// A draft hydrated from `document`.
    pub fn from_document(document: Questionnaire) -> Self {
        let mut store = Self::new();
        store.restore(document);
        store
    }

    // -- Reads --

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn questions(&self) -> &[DraftQuestion] {
        &self.questions
    }

    pub fn question(&self, id: QuestionId) -> Option<&DraftQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn question_index(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }

    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(DraftQuestion::id).collect()
    }

    pub fn alternative_ids(&self, question_id: QuestionId) -> Result<Vec<AlternativeId>, CoreError> {
        Ok(self.find_question(question_id)?.alternative_ids())
    }

    /// Bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The current document in order.
    pub fn snapshot(&self) -> Questionnaire {
        Questionnaire {
            title: self.title.clone(),
            description: self.description.clone(),
            questions: self.questions.iter().map(DraftQuestion::to_question).collect(),
        }
    }

    // -- Whole-document operations --

    /// Replace the whole draft. Every entity gets a fresh identity in
    /// document order and all attached errors are dropped.
    pub fn restore(&mut self, document: Questionnaire) {
        self.title = document.title;
        self.description = document.description;
        self.questions = Vec::with_capacity(document.questions.len());
        for question in document.questions {
            let drafted = self.draft_question(question);
            self.questions.push(drafted);
        }
        self.errors.clear();
        self.touch();
    }

    // -- Questions --

    /// Append a question built from `initial` and return its identity.
    ///
    /// A multiple-choice question without an alternatives field gets an
    /// empty one.
    pub fn add_question(&mut self, initial: Question) -> QuestionId {
        let mut drafted = self.draft_question(initial);
        if drafted.kind.uses_alternatives() && drafted.alternatives.is_none() {
            drafted.alternatives = Some(Vec::new());
        }
        let id = drafted.id;
        self.questions.push(drafted);
        self.clear_document_errors(&FieldPath::root().key("questions"));
        self.touch();
        id
    }

    pub fn remove_question(&mut self, id: QuestionId) -> Result<(), CoreError> {
        let index = self.require_question_index(id)?;
        self.questions.remove(index);
        self.errors.retain(|target, _| match target {
            ErrorTarget::Question(q, _) | ErrorTarget::Alternative(q, _, _) => *q != id,
            ErrorTarget::Document(_) => true,
        });
        self.clear_document_errors(&FieldPath::root().key("questions"));
        self.touch();
        Ok(())
    }

    /// Move the question at `from` so that it ends up at `to`.
    pub fn move_question(&mut self, from: usize, to: usize) -> Result<(), CoreError> {
        move_item(&mut self.questions, from, to)?;
        self.touch();
        Ok(())
    }

    /// Change a question's type the way the editor does: entering
    /// `multiple_choice` seeds two blank alternatives, leaving it drops the
    /// alternatives field, and the question's errors are cleared.
    pub fn change_question_type(
        &mut self,
        id: QuestionId,
        kind: QuestionType,
    ) -> Result<(), CoreError> {
        let index = self.require_question_index(id)?;
        if kind.uses_alternatives() {
            let seeded = vec![self.draft_alternative(Alternative::blank()), self.draft_alternative(Alternative::blank())];
            let question = &mut self.questions[index];
            question.alternatives.get_or_insert_with(Vec::new).extend(seeded);
        } else {
            self.questions[index].alternatives = None;
        }
        self.questions[index].kind = kind;
        self.errors.retain(|target, _| match target {
            ErrorTarget::Question(q, _) | ErrorTarget::Alternative(q, _, _) => *q != id,
            ErrorTarget::Document(_) => true,
        });
        self.touch();
        Ok(())
    }

    // -- Alternatives --

    pub fn add_alternative(
        &mut self,
        question_id: QuestionId,
        initial: Alternative,
    ) -> Result<AlternativeId, CoreError> {
        let index = self.require_question_index(question_id)?;
        let drafted = self.draft_alternative(initial);
        let id = drafted.id;
        self.questions[index]
            .alternatives
            .get_or_insert_with(Vec::new)
            .push(drafted);
        self.clear_question_errors(question_id, &FieldPath::root().key("alternatives"));
        self.touch();
        Ok(id)
    }

    pub fn remove_alternative(
        &mut self,
        question_id: QuestionId,
        id: AlternativeId,
    ) -> Result<(), CoreError> {
        let q_index = self.require_question_index(question_id)?;
        let a_index = self.questions[q_index]
            .alternative_index(id)
            .ok_or_else(|| CoreError::not_found("Alternative", id))?;
        if let Some(alternatives) = self.questions[q_index].alternatives.as_mut() {
            alternatives.remove(a_index);
        }
        self.errors.retain(|target, _| {
            !matches!(target, ErrorTarget::Alternative(q, a, _) if *q == question_id && *a == id)
        });
        self.clear_question_errors(question_id, &FieldPath::root().key("alternatives"));
        self.touch();
        Ok(())
    }

    /// Move an alternative within one question.
    pub fn move_alternative(
        &mut self,
        question_id: QuestionId,
        from: usize,
        to: usize,
    ) -> Result<(), CoreError> {
        let index = self.require_question_index(question_id)?;
        let Some(alternatives) = self.questions[index].alternatives.as_mut() else {
            return Err(CoreError::invalid(
                "",
                format!("Cannot move item {from} to {to} in a list of 0"),
            ));
        };
        move_item(alternatives, from, to)?;
        self.touch();
        Ok(())
    }

    // -- Scalar fields --

    /// Set one scalar field. The value kind must match the field.
    pub fn set_field(&mut self, field: FieldRef, value: FieldValue) -> Result<(), CoreError> {
        match (field, value) {
            (FieldRef::Title, FieldValue::Text(text)) => {
                self.title = text;
            }
            (FieldRef::Description, FieldValue::Text(text)) => {
                self.description = Some(text);
            }
            (FieldRef::Description, FieldValue::OptionalText(text)) => {
                self.description = text;
            }
            (FieldRef::Question(id, question_field), value) => {
                let index = self.require_question_index(id)?;
                let question = &mut self.questions[index];
                match (question_field, value) {
                    (QuestionField::Title, FieldValue::Text(text)) => question.title = text,
                    (QuestionField::Type, FieldValue::Type(kind)) => question.kind = kind,
                    (QuestionField::Required, FieldValue::Bool(b)) => question.required = b,
                    (QuestionField::MinValue, FieldValue::Number(n)) => question.min_value = n,
                    (QuestionField::MaxValue, FieldValue::Number(n)) => question.max_value = n,
                    (_, value) => return Err(self.mismatch(field, &value)),
                }
            }
            (FieldRef::Alternative(question_id, id, alternative_field), value) => {
                let q_index = self.require_question_index(question_id)?;
                let a_index = self.questions[q_index]
                    .alternative_index(id)
                    .ok_or_else(|| CoreError::not_found("Alternative", id))?;
                let Some(alternatives) = self.questions[q_index].alternatives.as_mut() else {
                    return Err(CoreError::not_found("Alternative", id));
                };
                let alternative = &mut alternatives[a_index];
                match (alternative_field, value) {
                    (AlternativeField::Text, FieldValue::Text(text)) => alternative.text = text,
                    (AlternativeField::IsCorrect, FieldValue::Bool(b)) => alternative.is_correct = b,
                    (_, value) => return Err(self.mismatch(field, &value)),
                }
            }
            (_, value) => return Err(self.mismatch(field, &value)),
        }

        self.clear_field_errors(field);
        self.touch();
        Ok(())
    }

    // -- Errors --

    /// Attach positional errors (as produced by the schema against
    /// [`snapshot`](Self::snapshot)), replacing any previously attached.
    pub fn apply_errors(&mut self, errors: &FieldErrors) {
        self.errors.clear();
        for (path, messages) in errors.iter() {
            let target = self.resolve(path);
            self.errors
                .entry(target)
                .or_default()
                .extend(messages.iter().cloned());
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Attached errors projected onto the current positions.
    pub fn errors(&self) -> FieldErrors {
        let mut out = FieldErrors::new();
        for (target, messages) in &self.errors {
            if let Some(path) = self.project(target) {
                for message in messages {
                    out.add(path.clone(), message.clone());
                }
            }
        }
        out
    }

    /// Messages attached to one scalar field.
    pub fn field_errors(&self, field: FieldRef) -> &[String] {
        self.errors
            .get(&target_of(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // -- Internals --

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn fresh_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn draft_alternative(&mut self, alternative: Alternative) -> DraftAlternative {
        DraftAlternative {
            id: AlternativeId(self.fresh_id()),
            text: alternative.text,
            is_correct: alternative.is_correct,
        }
    }

    fn draft_question(&mut self, question: Question) -> DraftQuestion {
        let id = QuestionId(self.fresh_id());
        let alternatives = question.alternatives.map(|alts| {
            alts.into_iter()
                .map(|alt| self.draft_alternative(alt))
                .collect()
        });
        DraftQuestion {
            id,
            title: question.title,
            kind: question.kind,
            required: question.required,
            alternatives,
            min_value: question.min_value,
            max_value: question.max_value,
        }
    }

    fn find_question(&self, id: QuestionId) -> Result<&DraftQuestion, CoreError> {
        self.question(id)
            .ok_or_else(|| CoreError::not_found("Question", id))
    }

    fn require_question_index(&self, id: QuestionId) -> Result<usize, CoreError> {
        self.question_index(id)
            .ok_or_else(|| CoreError::not_found("Question", id))
    }

    fn mismatch(&self, field: FieldRef, value: &FieldValue) -> CoreError {
        let path = self
            .project(&target_of(field))
            .unwrap_or_default();
        CoreError::invalid(
            &path.to_string(),
            format!("Cannot assign a {} value to this field", value.kind()),
        )
    }

    fn clear_document_errors(&mut self, path: &FieldPath) {
        self.errors
            .retain(|target, _| !matches!(target, ErrorTarget::Document(p) if p == path));
    }

    fn clear_question_errors(&mut self, id: QuestionId, path: &FieldPath) {
        self.errors
            .retain(|target, _| !matches!(target, ErrorTarget::Question(q, p) if *q == id && p == path));
    }

    fn clear_field_errors(&mut self, field: FieldRef) {
        let target = target_of(field);
        self.errors.remove(&target);
    }

    /// Map a positional path to an identity-keyed target.
    fn resolve(&self, path: &FieldPath) -> ErrorTarget {
        let segments = path.segments();
        let question = match segments {
            [PathSegment::Key(key), PathSegment::Index(i), ..] if key == "questions" => {
                self.questions.get(*i)
            }
            _ => None,
        };
        let Some(question) = question else {
            return ErrorTarget::Document(path.clone());
        };

        let rest = &segments[2..];
        if let [PathSegment::Key(key), PathSegment::Index(j), tail @ ..] = rest {
            if key == "alternatives" {
                if let Some(alternative) = question.alternatives().get(*j) {
                    return ErrorTarget::Alternative(
                        question.id,
                        alternative.id,
                        FieldPath::from_segments(tail.to_vec()),
                    );
                }
            }
        }
        ErrorTarget::Question(question.id, FieldPath::from_segments(rest.to_vec()))
    }

    /// Map an identity-keyed target back to the current positional path.
    fn project(&self, target: &ErrorTarget) -> Option<FieldPath> {
        match target {
            ErrorTarget::Document(path) => Some(path.clone()),
            ErrorTarget::Question(id, rest) => {
                let index = self.question_index(*id)?;
                Some(FieldPath::root().key("questions").index(index).join(rest))
            }
            ErrorTarget::Alternative(question_id, id, rest) => {
                let q_index = self.question_index(*question_id)?;
                let a_index = self.questions[q_index].alternative_index(*id)?;
                Some(
                    FieldPath::root()
                        .key("questions")
                        .index(q_index)
                        .key("alternatives")
                        .index(a_index)
                        .join(rest),
                )
            }
        }
    }
}

fn target_of(field: FieldRef) -> ErrorTarget {
    match field {
        FieldRef::Title => ErrorTarget::Document(FieldPath::root().key("title")),
        FieldRef::Description => ErrorTarget::Document(FieldPath::root().key("description")),
        FieldRef::Question(id, f) => ErrorTarget::Question(id, FieldPath::root().key(f.key())),
        FieldRef::Alternative(q, a, f) => {
            ErrorTarget::Alternative(q, a, FieldPath::root().key(f.key()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
