//! Multi-step editing sequence and its validation gate.

use std::fmt;

use crate::questionnaire::Questionnaire;
use crate::schema::{validate_questionnaire, FieldErrors, TopLevelField, ValidateOptions};

/// One step of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    BasicInfo,
    Questions,
    Preview,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Self::BasicInfo, Self::Questions, Self::Preview];

    pub const FIRST: Stage = Self::BasicInfo;
    pub const LAST: Stage = Self::Preview;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic information",
            Self::Questions => "Questions",
            Self::Preview => "Preview",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::BasicInfo => "Name your questionnaire and describe what it is for.",
            Self::Questions => "Add, edit and reorder the questions.",
            Self::Preview => "Review the questionnaire before saving it.",
        }
    }

    /// The document fields this stage is responsible for.
    pub fn fields(self) -> &'static [TopLevelField] {
        match self {
            Self::BasicInfo => &[TopLevelField::Title, TopLevelField::Description],
            Self::Questions => &[TopLevelField::Questions],
            Self::Preview => &[],
        }
    }

    fn next(self) -> Self {
        Self::from_index(self.index() + 1).unwrap_or(Self::LAST)
    }

    fn previous(self) -> Self {
        self.index()
            .checked_sub(1)
            .and_then(Self::from_index)
            .unwrap_or(Self::FIRST)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Why a stage transition was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("{stage} has invalid fields: {errors}")]
    Invalid { stage: Stage, errors: FieldErrors },

    #[error("Cannot jump forward from {current} to {requested}")]
    ForwardJump { current: Stage, requested: Stage },

    #[error("Submission is only available from {}", Stage::LAST)]
    NotAtLastStage { current: Stage },
}

impl GateError {
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

/// Current stage plus the rules for leaving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGate {
    current: Stage,
}

impl Default for StepGate {
    fn default() -> Self {
        Self {
            current: Stage::FIRST,
        }
    }
}

impl StepGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn is_last(&self) -> bool {
        self.current == Stage::LAST
    }

    /// Validate the current stage's fields and move forward on success.
    ///
    /// The question list may still be empty here; that rule belongs to
    /// submission.
    pub fn advance(&mut self, draft: &Questionnaire) -> Result<Stage, GateError> {
        let stage = self.current;
        validate_questionnaire(draft, stage.fields(), ValidateOptions::DRAFT)
            .map_err(|errors| GateError::Invalid { stage, errors })?;
        self.current = stage.next();
        Ok(self.current)
    }

    pub fn retreat(&mut self) -> Stage {
        self.current = self.current.previous();
        self.current
    }

    /// Revisit the current or an earlier stage.
    pub fn jump_to(&mut self, stage: Stage) -> Result<Stage, GateError> {
        if stage > self.current {
            return Err(GateError::ForwardJump {
                current: self.current,
                requested: stage,
            });
        }
        self.current = stage;
        Ok(stage)
    }

    /// Check that `draft` may be submitted from here.
    pub fn check_submit(&self, draft: &Questionnaire) -> Result<(), GateError> {
        if !self.is_last() {
            return Err(GateError::NotAtLastStage {
                current: self.current,
            });
        }
        validate_questionnaire(draft, &TopLevelField::ALL, ValidateOptions::COMPLETE).map_err(
            |errors| GateError::Invalid {
                stage: self.current,
                errors,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::{Question, QuestionType};
    use assert_matches::assert_matches;

    fn titled(title: &str) -> Questionnaire {
        Questionnaire::new(title)
    }

    #[test]
    fn stage_indices_are_dense() {
        for (i, stage) in Stage::ALL.into_iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(Stage::from_index(i), Some(stage));
        }
        assert_eq!(Stage::from_index(3), None);
    }

    #[test]
    fn empty_title_blocks_first_stage() {
        let mut gate = StepGate::new();
        let err = gate.advance(&titled("")).unwrap_err();
        assert!(err.field_errors().unwrap().contains("title"));
        assert_eq!(gate.current(), Stage::BasicInfo);
    }

    #[test]
    fn valid_title_advances_then_retreat_returns() {
        let mut gate = StepGate::new();
        assert_eq!(gate.advance(&titled("Survey")).unwrap(), Stage::Questions);
        assert_eq!(gate.retreat(), Stage::BasicInfo);
        assert_eq!(gate.retreat(), Stage::BasicInfo);
    }

    #[test]
    fn first_stage_ignores_question_errors() {
        let mut gate = StepGate::new();
        let draft = titled("Survey").with_question(Question::new("x", QuestionType::Boolean));
        assert_eq!(gate.advance(&draft).unwrap(), Stage::Questions);
    }

    #[test]
    fn questions_stage_checks_each_question() {
        let mut gate = StepGate::new();
        let draft = titled("Survey").with_question(Question::new("x", QuestionType::Boolean));
        gate.advance(&draft).unwrap();

        let err = gate.advance(&draft).unwrap_err();
        assert_matches!(&err, GateError::Invalid { stage: Stage::Questions, .. });
        assert!(err.field_errors().unwrap().contains("questions.0.title"));
        assert_eq!(gate.current(), Stage::Questions);
    }

    #[test]
    fn questions_stage_allows_empty_list() {
        let mut gate = StepGate::new();
        let draft = titled("Survey");
        gate.advance(&draft).unwrap();
        assert_eq!(gate.advance(&draft).unwrap(), Stage::Preview);
        assert_eq!(gate.advance(&draft).unwrap(), Stage::Preview);
    }

    #[test]
    fn jump_backward_only() {
        let mut gate = StepGate::new();
        assert_matches!(
            gate.jump_to(Stage::Questions),
            Err(GateError::ForwardJump { requested: Stage::Questions, .. })
        );

        let draft = titled("Survey");
        gate.advance(&draft).unwrap();
        gate.advance(&draft).unwrap();
        assert_eq!(gate.jump_to(Stage::BasicInfo).unwrap(), Stage::BasicInfo);
        assert_eq!(gate.jump_to(Stage::BasicInfo).unwrap(), Stage::BasicInfo);
    }

    #[test]
    fn submit_requires_last_stage_and_questions() {
        let mut gate = StepGate::new();
        let empty = titled("Survey");
        assert_matches!(
            gate.check_submit(&empty),
            Err(GateError::NotAtLastStage { current: Stage::BasicInfo })
        );

        gate.advance(&empty).unwrap();
        gate.advance(&empty).unwrap();
        let err = gate.check_submit(&empty).unwrap_err();
        assert!(err.field_errors().unwrap().contains("questions"));

        let ready = empty.with_question(Question::new("Agree?", QuestionType::Boolean));
        gate.check_submit(&ready).unwrap();
    }
}
