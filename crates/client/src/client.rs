//! REST API client for the formcraft server.
//!
//! Wraps the `/api` endpoints using [`reqwest`] and translates every failure
//! into a [`CoreError`] kind, so an editor session cannot tell it apart from
//! any other storage backend.

use std::sync::{Mutex, MutexGuard};

use formcraft_core::error::CoreError;
use formcraft_core::questionnaire::{Questionnaire, QuestionnairePatch, StoredQuestionnaire};
use formcraft_core::schema::{FieldError, FieldErrors};
use formcraft_core::storage::QuestionnaireStorage;
use formcraft_core::types::{DbId, Timestamp};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const NO_TOKEN: &str = "Access denied. No token provided";

/// The signed-in user as the server reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub profession: String,
    pub created_at: Timestamp,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub profession: String,
}

#[derive(Deserialize)]
struct AuthBody {
    token: String,
    user: UserProfile,
}

#[derive(Deserialize)]
struct UserBody {
    user: UserProfile,
}

#[derive(Deserialize)]
struct QuestionnaireBody {
    questionnaire: StoredQuestionnaire,
}

#[derive(Deserialize)]
struct QuestionnaireListBody {
    questionnaires: Vec<StoredQuestionnaire>,
}

#[derive(Deserialize)]
struct Ignored {}

/// The failure envelope; every field is optional so a foreign error page
/// still maps to some error kind.
#[derive(Debug, Default, Deserialize)]
struct FailureBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// HTTP client for one formcraft server.
///
/// Holds the bearer token issued by [`login`](Self::login) or
/// [`register`](Self::register). Calls to protected routes without a token
/// fail locally with `Unauthorized` and never reach the network.
#[derive(Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl ApiClient {
    /// * `base_url` - Server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            token: Mutex::new(None),
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.into());
        }
        self
    }

    pub fn token(&self) -> Result<Option<String>, CoreError> {
        Ok(self.token_slot()?.clone())
    }

    /// Forget the stored token.
    pub fn logout(&self) -> Result<(), CoreError> {
        *self.token_slot()? = None;
        Ok(())
    }

    /// `POST /api/auth/login`; stores the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, CoreError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let request = self.request(Method::POST, "/auth/login").json(&body);
        let auth: AuthBody = self.send(request, None).await?;
        self.store_token(auth.token)?;
        tracing::info!(user_id = auth.user.id, "Logged in");
        Ok(auth.user)
    }

    /// `POST /api/auth/register`; stores the returned token.
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, CoreError> {
        let request = self
            .request(Method::POST, "/auth/register")
            .json(registration);
        let auth: AuthBody = self.send(request, None).await?;
        self.store_token(auth.token)?;
        tracing::info!(user_id = auth.user.id, "Registered");
        Ok(auth.user)
    }

    /// `GET /api/users/me`
    pub async fn me(&self) -> Result<UserProfile, CoreError> {
        let request = self.authorized(Method::GET, "/users/me")?;
        let body: UserBody = self.send(request, None).await?;
        Ok(body.user)
    }

    // ---- private helpers ----

    fn token_slot(&self) -> Result<MutexGuard<'_, Option<String>>, CoreError> {
        self.token
            .lock()
            .map_err(|_| CoreError::Internal("token lock poisoned".into()))
    }

    fn store_token(&self, token: String) -> Result<(), CoreError> {
        *self.token_slot()? = Some(token);
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/api{}", self.base_url, path))
    }

    fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, CoreError> {
        let token = self
            .token()?
            .ok_or_else(|| CoreError::Unauthorized(NO_TOKEN.into()))?;
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Send `request` and decode a success body, or translate the failure.
    ///
    /// `id` names the questionnaire a 404 refers to.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        id: Option<DbId>,
    ) -> Result<T, CoreError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request to formcraft server failed");
            CoreError::Internal(format!("Request failed: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| CoreError::Internal(format!("Undecodable response body: {e}")));
        }

        let failure = response.json::<FailureBody>().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            message = failure.message.as_deref().unwrap_or(""),
            "Request rejected"
        );
        Err(translate_failure(status, failure, id))
    }
}

fn translate_failure(status: StatusCode, failure: FailureBody, id: Option<DbId>) -> CoreError {
    let message = failure
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

    match status {
        StatusCode::BAD_REQUEST if !failure.errors.is_empty() => {
            let mut errors = FieldErrors::new();
            for entry in failure.errors {
                errors.add(entry.field, entry.message);
            }
            CoreError::Validation(errors)
        }
        StatusCode::BAD_REQUEST => CoreError::invalid("", message),
        StatusCode::UNAUTHORIZED => CoreError::Unauthorized(message),
        StatusCode::NOT_FOUND => match id {
            Some(id) => CoreError::not_found("Questionnaire", id),
            None => CoreError::not_found("Resource", message),
        },
        StatusCode::CONFLICT => CoreError::Conflict(message),
        other => {
            tracing::warn!(status = other.as_u16(), %message, "Unexpected server response");
            CoreError::Internal(format!("Server returned {other}: {message}"))
        }
    }
}

impl QuestionnaireStorage for ApiClient {
    async fn create(&self, document: &Questionnaire) -> Result<StoredQuestionnaire, CoreError> {
        let request = self.authorized(Method::POST, "/forms")?.json(document);
        let body: QuestionnaireBody = self.send(request, None).await?;
        tracing::debug!(questionnaire_id = body.questionnaire.id, "Questionnaire saved");
        Ok(body.questionnaire)
    }

    async fn get(&self, id: DbId) -> Result<StoredQuestionnaire, CoreError> {
        let request = self.authorized(Method::GET, &format!("/forms/{id}"))?;
        let body: QuestionnaireBody = self.send(request, Some(id)).await?;
        Ok(body.questionnaire)
    }

    async fn list(&self) -> Result<Vec<StoredQuestionnaire>, CoreError> {
        let request = self.authorized(Method::GET, "/forms")?;
        let body: QuestionnaireListBody = self.send(request, None).await?;
        Ok(body.questionnaires)
    }

    async fn update(
        &self,
        id: DbId,
        patch: &QuestionnairePatch,
    ) -> Result<StoredQuestionnaire, CoreError> {
        let request = self
            .authorized(Method::PUT, &format!("/forms/{id}"))?
            .json(patch);
        let body: QuestionnaireBody = self.send(request, Some(id)).await?;
        Ok(body.questionnaire)
    }

    async fn delete(&self, id: DbId) -> Result<(), CoreError> {
        let request = self.authorized(Method::DELETE, &format!("/forms/{id}"))?;
        let _: Ignored = self.send(request, Some(id)).await?;
        Ok(())
    }
}
