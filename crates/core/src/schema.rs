//! Questionnaire schema and validation.
//!
//! Validation runs over raw JSON so that every problem, including wrong
//! value kinds, is reported against the exact field that produced it.
//! Errors are collected into [`FieldErrors`], keyed by a [`FieldPath`] such
//! as `questions.2.alternatives.0.text`.
//!
//! Two modes exist:
//!
//! - [`ValidationMode::Full`] enforces presence of every required field
//!   (create bodies, draft stages, submission).
//! - [`ValidationMode::Partial`] skips presence checks on top-level fields
//!   but still applies every other rule to fields that are present (update
//!   bodies). Questions inside a partial body are validated in full.
//!
//! There are no cross-field rules: a `scale` question may keep a stale
//! `alternatives` array, `minValue` may exceed `maxValue`, and no
//! alternative count or "correct answer" constraint exists.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::questionnaire::{
    Alternative, Question, QuestionType, Questionnaire, QuestionnairePatch,
};

/// Minimum trimmed length of a questionnaire title.
pub const TITLE_MIN_CHARS: usize = 3;

/// Minimum trimmed length of a question title.
pub const QUESTION_TITLE_MIN_CHARS: usize = 3;

/// Minimum trimmed length of an alternative's text.
pub const ALTERNATIVE_TEXT_MIN_CHARS: usize = 1;

pub const MSG_REQUIRED: &str = "Required";
pub const MSG_TITLE_TOO_SHORT: &str = "Title must be at least 3 characters";
pub const MSG_QUESTION_TITLE_TOO_SHORT: &str = "Question must be at least 3 characters";
pub const MSG_ALTERNATIVE_TEXT_REQUIRED: &str = "Alternative text is required";
pub const MSG_INVALID_TYPE: &str = "Invalid question type";
pub const MSG_NO_QUESTIONS: &str = "A questionnaire must have at least one question";

// ---------------------------------------------------------------------------
// Field paths
// ---------------------------------------------------------------------------

/// One step of a [`FieldPath`]: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Dotted, index-aware address of a field inside a document.
///
/// The empty path addresses the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// A new path with `key` appended.
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self(segments)
    }

    /// A new path with `index` appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    /// A new path with every segment of `rest` appended.
    pub fn join(&self, rest: &FieldPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(rest.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Infallible;

    /// Parse `questions.2.title`. All-digit segments become indices.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<usize>() {
                Ok(index) => PathSegment::Index(index),
                Err(_) => PathSegment::Key(part.to_string()),
            })
            .collect();
        Ok(Self(segments))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Field errors
// ---------------------------------------------------------------------------

/// One `{ field, message }` pair, the wire shape of a field error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: FieldPath,
    pub message: String,
}

/// Validation messages grouped by the field that produced them.
///
/// Serializes as a flat list of [`FieldError`]s ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<FieldPath, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: FieldPath, message: impl Into<String>) {
        self.0.entry(path).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct fields with at least one message.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    /// Messages for a dotted path; empty when the field has none.
    pub fn messages(&self, path: &str) -> &[String] {
        let path: FieldPath = path.parse().unwrap_or_default();
        self.get(&path).unwrap_or(&[])
    }

    pub fn contains(&self, path: &str) -> bool {
        !self.messages(path).is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &[String])> {
        self.0.iter().map(|(path, messages)| (path, messages.as_slice()))
    }

    pub fn extend(&mut self, other: FieldErrors) {
        for (path, messages) in other.0 {
            self.0.entry(path).or_default().extend(messages);
        }
    }

    /// Flatten into `{ field, message }` entries.
    pub fn entries(&self) -> Vec<FieldError> {
        self.0
            .iter()
            .flat_map(|(path, messages)| {
                messages.iter().map(move |message| FieldError {
                    field: path.clone(),
                    message: message.clone(),
                })
            })
            .collect()
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries().iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if entry.field.is_root() {
                f.write_str(&entry.message)?;
            } else {
                write!(f, "{}: {}", entry.field, entry.message)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<FieldError>::deserialize(deserializer)?;
        let mut errors = FieldErrors::new();
        for entry in entries {
            errors.add(entry.field, entry.message);
        }
        Ok(errors)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    /// Re-address `validator` derive errors with the same dotted paths.
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        collect_validator_errors(&FieldPath::root(), &errors, &mut out);
        out
    }
}

fn collect_validator_errors(
    path: &FieldPath,
    errors: &validator::ValidationErrors,
    out: &mut FieldErrors,
) {
    for (field, kind) in errors.errors() {
        let field_path = path.key(&field.to_string());
        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.add(field_path.clone(), message);
                }
            }
            validator::ValidationErrorsKind::Struct(inner) => {
                collect_validator_errors(&field_path, inner, out);
            }
            validator::ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validator_errors(&field_path.index(*index), inner, out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Whether absent required fields are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Full,
    Partial,
}

/// How a document should be validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    pub mode: ValidationMode,
    /// Reject a present but empty `questions` array.
    pub require_questions: bool,
}

impl ValidateOptions {
    /// A finished questionnaire: create bodies and editor submission.
    pub const COMPLETE: Self = Self {
        mode: ValidationMode::Full,
        require_questions: true,
    };

    /// A draft mid-edit: full presence checks, empty question list allowed.
    pub const DRAFT: Self = Self {
        mode: ValidationMode::Full,
        require_questions: false,
    };

    /// An update body: only present fields are checked.
    pub const PARTIAL: Self = Self {
        mode: ValidationMode::Partial,
        require_questions: true,
    };

    pub fn is_partial(&self) -> bool {
        self.mode == ValidationMode::Partial
    }
}

/// Top-level questionnaire fields, used to restrict validation to a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopLevelField {
    Title,
    Description,
    Questions,
}

impl TopLevelField {
    pub const ALL: [TopLevelField; 3] = [Self::Title, Self::Description, Self::Questions];

    pub fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Questions => "questions",
        }
    }

    pub fn path(self) -> FieldPath {
        FieldPath::root().key(self.key())
    }
}

/// A document that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidDocument {
    Complete(Questionnaire),
    Partial(QuestionnairePatch),
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Validate a whole document.
///
/// Full mode yields [`ValidDocument::Complete`], partial mode yields
/// [`ValidDocument::Partial`]. String fields come back trimmed.
pub fn validate(document: &Value, options: ValidateOptions) -> Result<ValidDocument, FieldErrors> {
    let checked = check_document(document, &TopLevelField::ALL, options)?;
    Ok(match options.mode {
        ValidationMode::Full => ValidDocument::Complete(Questionnaire {
            title: checked.title.unwrap_or_default(),
            description: checked.description,
            questions: checked.questions.unwrap_or_default(),
        }),
        ValidationMode::Partial => ValidDocument::Partial(QuestionnairePatch {
            title: checked.title,
            description: checked.description,
            questions: checked.questions,
        }),
    })
}

/// Validate a create body (full mode, at least one question).
pub fn validate_complete(document: &Value) -> Result<Questionnaire, FieldErrors> {
    match validate(document, ValidateOptions::COMPLETE)? {
        ValidDocument::Complete(doc) => Ok(doc),
        ValidDocument::Partial(patch) => Ok(Questionnaire {
            title: patch.title.unwrap_or_default(),
            description: patch.description,
            questions: patch.questions.unwrap_or_default(),
        }),
    }
}

/// Validate an update body (partial mode).
pub fn validate_patch(document: &Value) -> Result<QuestionnairePatch, FieldErrors> {
    match validate(document, ValidateOptions::PARTIAL)? {
        ValidDocument::Partial(patch) => Ok(patch),
        ValidDocument::Complete(doc) => Ok(doc.into()),
    }
}

/// Validate only the listed top-level fields of a raw document.
pub fn validate_fields(
    document: &Value,
    fields: &[TopLevelField],
    options: ValidateOptions,
) -> Result<(), FieldErrors> {
    check_document(document, fields, options).map(|_| ())
}

/// Validate the listed fields of an in-memory questionnaire.
///
/// The typed document is checked through its JSON form so that values the
/// wire format cannot carry (a non-finite bound, for instance) are reported
/// the same way a client would see them.
pub fn validate_questionnaire(
    document: &Questionnaire,
    fields: &[TopLevelField],
    options: ValidateOptions,
) -> Result<(), FieldErrors> {
    let value = serde_json::to_value(document).unwrap_or(Value::Null);
    validate_fields(&value, fields, options)
}

// ---------------------------------------------------------------------------
// Checker
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CheckedFields {
    title: Option<String>,
    description: Option<String>,
    questions: Option<Vec<Question>>,
}

fn check_document(
    document: &Value,
    fields: &[TopLevelField],
    options: ValidateOptions,
) -> Result<CheckedFields, FieldErrors> {
    let mut checker = Checker::default();
    let root = FieldPath::root();

    let Some(obj) = document.as_object() else {
        checker.expected(root, "object", document);
        return Err(checker.errors);
    };

    let required = !options.is_partial();
    let mut checked = CheckedFields::default();

    for field in fields {
        let path = field.path();
        match field {
            TopLevelField::Title => {
                checked.title = checker.text(
                    obj,
                    field.key(),
                    &path,
                    Presence::from_required(required),
                    TITLE_MIN_CHARS,
                    MSG_TITLE_TOO_SHORT,
                );
            }
            TopLevelField::Description => {
                checked.description =
                    checker.text(obj, field.key(), &path, Presence::Optional, 0, "");
            }
            TopLevelField::Questions => {
                checked.questions = checker.questions(obj, &path, required, options);
            }
        }
    }

    checker.errors.into_result(checked)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

impl Presence {
    fn from_required(required: bool) -> Self {
        if required {
            Self::Required
        } else {
            Self::Optional
        }
    }
}

#[derive(Debug, Default)]
struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn expected(&mut self, path: FieldPath, kind: &str, found: &Value) {
        self.errors.add(
            path,
            format!("Expected {kind}, received {}", json_kind(found)),
        );
    }

    /// A trimmed string field. Returns `None` when absent or invalid.
    fn text(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &FieldPath,
        presence: Presence,
        min_chars: usize,
        too_short: &str,
    ) -> Option<String> {
        match obj.get(key) {
            None => {
                if presence == Presence::Required {
                    self.errors.add(path.clone(), MSG_REQUIRED);
                }
                None
            }
            Some(Value::String(raw)) => {
                let trimmed = raw.trim();
                if trimmed.chars().count() < min_chars {
                    self.errors.add(path.clone(), too_short);
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Some(other) => {
                self.expected(path.clone(), "string", other);
                None
            }
        }
    }

    /// An optional boolean with a default.
    fn flag(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &FieldPath,
        default: bool,
    ) -> Option<bool> {
        match obj.get(key) {
            None => Some(default),
            Some(Value::Bool(b)) => Some(*b),
            Some(other) => {
                self.expected(path.clone(), "boolean", other);
                None
            }
        }
    }

    /// An optional number. `Err(())` marks an invalid value.
    fn number(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &FieldPath,
    ) -> Result<Option<f64>, ()> {
        match obj.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => {
                self.expected(path.clone(), "number", other);
                Err(())
            }
        }
    }

    fn question_type(&mut self, obj: &Map<String, Value>, path: &FieldPath) -> Option<QuestionType> {
        match obj.get("type") {
            None => {
                self.errors.add(path.clone(), MSG_REQUIRED);
                None
            }
            Some(Value::String(tag)) => {
                let parsed = QuestionType::parse(tag);
                if parsed.is_none() {
                    self.errors.add(path.clone(), MSG_INVALID_TYPE);
                }
                parsed
            }
            Some(other) => {
                self.expected(path.clone(), "string", other);
                None
            }
        }
    }

    fn questions(
        &mut self,
        obj: &Map<String, Value>,
        path: &FieldPath,
        required: bool,
        options: ValidateOptions,
    ) -> Option<Vec<Question>> {
        let items = match obj.get("questions") {
            None => {
                if required {
                    self.errors.add(path.clone(), MSG_REQUIRED);
                }
                return None;
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.expected(path.clone(), "array", other);
                return None;
            }
        };

        if options.require_questions && items.is_empty() {
            self.errors.add(path.clone(), MSG_NO_QUESTIONS);
            return None;
        }

        let mut questions = Vec::with_capacity(items.len());
        let mut all_valid = true;
        for (index, item) in items.iter().enumerate() {
            match self.question(item, &path.index(index)) {
                Some(question) => questions.push(question),
                None => all_valid = false,
            }
        }
        all_valid.then_some(questions)
    }

    fn question(&mut self, value: &Value, path: &FieldPath) -> Option<Question> {
        let Some(obj) = value.as_object() else {
            self.expected(path.clone(), "object", value);
            return None;
        };

        let title = self.text(
            obj,
            "title",
            &path.key("title"),
            Presence::Required,
            QUESTION_TITLE_MIN_CHARS,
            MSG_QUESTION_TITLE_TOO_SHORT,
        );
        let kind = self.question_type(obj, &path.key("type"));
        let required = self.flag(obj, "required", &path.key("required"), true);
        let alternatives = self.alternatives(obj, &path.key("alternatives"));
        let min_value = self.number(obj, "minValue", &path.key("minValue"));
        let max_value = self.number(obj, "maxValue", &path.key("maxValue"));

        match (title, kind, required, alternatives, min_value, max_value) {
            (Some(title), Some(kind), Some(required), Ok(alternatives), Ok(min_value), Ok(max_value)) => {
                Some(Question {
                    title,
                    kind,
                    required,
                    alternatives,
                    min_value,
                    max_value,
                })
            }
            _ => None,
        }
    }

    /// `Ok(None)` when absent, `Err(())` when present but invalid.
    fn alternatives(
        &mut self,
        obj: &Map<String, Value>,
        path: &FieldPath,
    ) -> Result<Option<Vec<Alternative>>, ()> {
        let items = match obj.get("alternatives") {
            None => return Ok(None),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.expected(path.clone(), "array", other);
                return Err(());
            }
        };

        let mut alternatives = Vec::with_capacity(items.len());
        let mut all_valid = true;
        for (index, item) in items.iter().enumerate() {
            let item_path = path.index(index);
            let Some(alt) = item.as_object() else {
                self.expected(item_path, "object", item);
                all_valid = false;
                continue;
            };
            let text = self.text(
                alt,
                "text",
                &item_path.key("text"),
                Presence::Required,
                ALTERNATIVE_TEXT_MIN_CHARS,
                MSG_ALTERNATIVE_TEXT_REQUIRED,
            );
            let is_correct = self.flag(alt, "isCorrect", &item_path.key("isCorrect"), false);
            match (text, is_correct) {
                (Some(text), Some(is_correct)) => alternatives.push(Alternative { text, is_correct }),
                _ => all_valid = false,
            }
        }

        if all_valid {
            Ok(Some(alternatives))
        } else {
            Err(())
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
