//! Questionnaire document model.
//!
//! These are the shapes exchanged between the editor, the REST API and the
//! database. JSON field names are camelCase to match the browser client.
//! A [`Question`] carries every optional field regardless of its
//! [`QuestionType`]; which ones are meaningful depends on the type (see the
//! field docs), but validation treats all present fields uniformly.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Question type
// ---------------------------------------------------------------------------

/// The closed set of question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    OpenEnded,
    Scale,
    Boolean,
}

impl QuestionType {
    /// Every question type, in display order.
    pub const ALL: [QuestionType; 4] = [
        Self::MultipleChoice,
        Self::OpenEnded,
        Self::Scale,
        Self::Boolean,
    ];

    /// Parse the wire tag (`"multiple_choice"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple_choice" => Some(Self::MultipleChoice),
            "open_ended" => Some(Self::OpenEnded),
            "scale" => Some(Self::Scale),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// The wire tag for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::OpenEnded => "open_ended",
            Self::Scale => "scale",
            Self::Boolean => "boolean",
        }
    }

    pub fn uses_alternatives(self) -> bool {
        self == Self::MultipleChoice
    }
}

// ---------------------------------------------------------------------------
// Document shapes
// ---------------------------------------------------------------------------

fn default_required() -> bool {
    true
}

/// One selectable answer of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl Alternative {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_correct: false,
        }
    }

    /// An empty, not-correct alternative (what the editor appends).
    pub fn blank() -> Self {
        Self::default()
    }
}

/// A single question of a questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Meaningful only for `multiple_choice`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative>>,
    /// Meaningful only for `scale`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Meaningful only for `scale`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl Question {
    /// A required question of the given type with no optional fields set.
    ///
    /// Multiple-choice questions start with an empty alternatives array so
    /// the field is always an array for that type.
    pub fn new(title: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            title: title.into(),
            kind,
            required: true,
            alternatives: kind.uses_alternatives().then(Vec::new),
            min_value: None,
            max_value: None,
        }
    }

    /// The question the editor's "add question" action appends: untitled,
    /// multiple choice, required, with two blank alternatives.
    pub fn editor_default() -> Self {
        Self {
            alternatives: Some(vec![Alternative::blank(), Alternative::blank()]),
            ..Self::new("", QuestionType::MultipleChoice)
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Alternative>) -> Self {
        self.alternatives = Some(alternatives);
        self
    }

    pub fn with_bounds(mut self, min_value: f64, max_value: f64) -> Self {
        self.min_value = Some(min_value);
        self.max_value = Some(max_value);
        self
    }
}

/// A complete questionnaire document (draft or create body).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Questionnaire {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_question(mut self, question: Question) -> Self {
        self.questions.push(question);
        self
    }
}

/// Partial update body. Absent fields are left untouched; an empty
/// description clears the stored one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnairePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
}

impl QuestionnairePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.questions.is_none()
    }
}

impl From<Questionnaire> for QuestionnairePatch {
    fn from(doc: Questionnaire) -> Self {
        Self {
            title: Some(doc.title),
            description: Some(doc.description.unwrap_or_default()),
            questions: Some(doc.questions),
        }
    }
}

/// A questionnaire as returned by storage: the document plus the identity,
/// owner and timestamps storage assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredQuestionnaire {
    pub id: DbId,
    pub user_id: DbId,
    #[serde(flatten)]
    pub document: Questionnaire,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
