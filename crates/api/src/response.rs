//! Success envelope for API handlers.
//!
//! Every successful response is `{ "success": true, "message"?, ...payload }`:
//! the payload's fields sit next to `success` rather than under a key.

use formcraft_core::questionnaire::StoredQuestionnaire;
use formcraft_db::models::user::UserResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload,
        }
    }

    pub fn with_message(message: &'static str, payload: T) -> Self {
        Self {
            success: true,
            message: Some(message),
            payload,
        }
    }
}

/// Payload with no fields of its own.
#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct QuestionnairePayload {
    pub questionnaire: StoredQuestionnaire,
}

#[derive(Debug, Serialize)]
pub struct QuestionnaireListPayload {
    pub questionnaires: Vec<StoredQuestionnaire>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Count {
        count: u32,
    }

    #[test]
    fn payload_fields_are_flattened() {
        let value = serde_json::to_value(Envelope::with_message("Done", Count { count: 2 })).unwrap();
        assert_eq!(value, json!({ "success": true, "message": "Done", "count": 2 }));
    }

    #[test]
    fn empty_payload_without_message() {
        let value = serde_json::to_value(Envelope::new(Empty {})).unwrap();
        assert_eq!(value, json!({ "success": true }));
    }
}
