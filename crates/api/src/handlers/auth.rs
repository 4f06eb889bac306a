//! Handlers for the `/auth` resource (register, login).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use formcraft_core::error::CoreError;
use formcraft_core::schema::FieldErrors;
use formcraft_db::models::user::{CreateUser, User};
use formcraft_db::repositories::UserRepo;
use serde::Deserialize;
use validator::Validate;

use crate::auth::jwt::generate_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::{AuthPayload, Envelope};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 100, message = "Name must be between 3 and 100 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Profession is required"))]
    pub profession: String,
}

impl RegisterRequest {
    /// Trim text fields and lower-case the email. The password is left as is.
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
            phone: self.phone.trim().to_string(),
            profession: self.profession.trim().to_string(),
        }
    }
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check<T: Validate>(input: &T) -> AppResult<()> {
    input
        .validate()
        .map_err(|e| AppError::from(FieldErrors::from(e)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(input): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Envelope<AuthPayload>>)> {
    let input = input.normalized();
    check(&input)?;

    if UserRepo::find_by_email(&state.pool, &input.email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Email is already in use".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            name: input.name,
            email: input.email,
            password_hash,
            phone: input.phone,
            profession: input.profession,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    let payload = auth_payload(&state, user)?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("User registered successfully", payload)),
    ))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    AppJson(input): AppJson<LoginRequest>,
) -> AppResult<Json<Envelope<AuthPayload>>> {
    let email = normalize_email(&input.email);
    let input = LoginRequest { email, ..input };
    check(&input)?;

    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())))?;

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        tracing::debug!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::Core(CoreError::Unauthorized(INVALID_CREDENTIALS.into())));
    }

    let payload = auth_payload(&state, user)?;
    Ok(Json(Envelope::with_message("Login successful", payload)))
}

fn auth_payload(state: &AppState, user: User) -> AppResult<AuthPayload> {
    let token = generate_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    Ok(AuthPayload {
        token,
        user: user.into(),
    })
}
