use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use recipe_core::{
    store::MSG_EMAIL_TAKEN,
    validation::{
        check_email, check_max_length, check_min_length, require, require_untrimmed,
        MAX_FIELD_LENGTH, NON_FIELD_ERRORS,
    },
    NewUser, RecipeError, User, UserProfile, UserUpdate, ValidationErrors,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{auth::AuthUser, ApiError, ApiResult, AppState};

pub const MSG_BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Which fields of a [`UserPayload`] must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Partial,
}

/// Applies the user serializer rules and returns the cleaned values.
///
/// `current` is the user being edited, if any, so keeping one's own email is
/// not reported as a duplicate.
async fn validate_user_payload(
    state: &AppState,
    payload: &UserPayload,
    presence: Presence,
    current: Option<&User>,
) -> ApiResult<UserUpdate> {
    let mut errors = ValidationErrors::new();
    let required = presence == Presence::Required;

    let email = if required || payload.email.is_some() {
        require(&mut errors, "email", payload.email.as_deref())
    } else {
        None
    };
    let password = if required || payload.password.is_some() {
        require_untrimmed(&mut errors, "password", payload.password.as_deref())
    } else {
        None
    };
    let name = if required || payload.name.is_some() {
        require(&mut errors, "name", payload.name.as_deref())
    } else {
        None
    };

    if let Some(email) = email {
        check_email(&mut errors, "email", email);
    }
    if let Some(password) = password {
        check_min_length(&mut errors, "password", password, state.min_password_length());
    }
    if let Some(name) = name {
        check_max_length(&mut errors, "name", name, MAX_FIELD_LENGTH);
    }

    if let Some(email) = email.filter(|_| !errors.contains("email")) {
        let unchanged = current.is_some_and(|u| u.email == recipe_core::security::normalize_email(email));
        if !unchanged && state.db.email_exists(email).await? {
            errors.add("email", MSG_EMAIL_TAKEN);
        }
    }

    errors.into_result()?;

    Ok(UserUpdate {
        email: email.map(str::to_string),
        name: name.map(str::to_string),
        password: password.map(str::to_string),
    })
}

/// A unique-constraint race surfaces as the same error as the pre-check.
fn email_taken(err: RecipeError) -> ApiError {
    match err {
        RecipeError::Conflict(_) => ValidationErrors::single("email", MSG_EMAIL_TAKEN).into(),
        other => other.into(),
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let Json(payload) = payload?;
    let clean = validate_user_payload(&state, &payload, Presence::Required, None).await?;

    let user = state
        .db
        .create_user(NewUser {
            email: clean.email.unwrap_or_default(),
            password: clean.password,
            name: clean.name.unwrap_or_default(),
            ..Default::default()
        })
        .await
        .map_err(email_taken)?;

    info!(user_id = user.id, "Registered user");
    Ok((StatusCode::CREATED, Json(user.profile())))
}

pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(payload) = payload?;

    let mut errors = ValidationErrors::new();
    let email = require(&mut errors, "email", payload.email.as_deref());
    let password = require_untrimmed(&mut errors, "password", payload.password.as_deref());
    let (email, password) = match (email, password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(errors.into()),
    };

    let user = state
        .db
        .authenticate(email, password)
        .await?
        .ok_or_else(|| ValidationErrors::single(NON_FIELD_ERRORS, MSG_BAD_CREDENTIALS))?;

    let token = state.db.get_or_create_token(user.id).await?;
    Ok(Json(TokenResponse { token: token.key }))
}

pub async fn get_me(auth: AuthUser) -> Json<UserProfile> {
    Json(auth.0.profile())
}

/// The profile cannot be created through `me`. The token is still checked
/// first, so anonymous callers get 401 rather than 405.
pub async fn post_me(_auth: AuthUser) -> ApiResult<Json<UserProfile>> {
    Err(ApiError::MethodNotAllowed(
        "Method \"POST\" not allowed.".to_string(),
    ))
}

async fn update_me(
    state: AppState,
    auth: AuthUser,
    payload: UserPayload,
    presence: Presence,
) -> ApiResult<Json<UserProfile>> {
    let update = validate_user_payload(&state, &payload, presence, Some(&auth.0)).await?;
    let user = state
        .db
        .update_user(auth.id(), update)
        .await
        .map_err(email_taken)?;
    Ok(Json(user.profile()))
}

pub async fn patch_me(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Json(payload) = payload?;
    update_me(state, auth, payload, Presence::Partial).await
}

pub async fn put_me(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    let Json(payload) = payload?;
    update_me(state, auth, payload, Presence::Required).await
}
