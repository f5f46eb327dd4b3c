use axum::{
    extract::rejection::JsonRejection,
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use recipe_core::{RecipeError, ValidationErrors};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Scheme advertised in `WWW-Authenticate` on 401 responses.
pub const AUTH_SCHEME: &str = "Token";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Recipe(#[from] RecipeError),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    MethodNotAllowed(String),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Recipe(err) => match err {
                RecipeError::Validation(_) | RecipeError::Conflict(_) => StatusCode::BAD_REQUEST,
                RecipeError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn fields(&self) -> Option<&ValidationErrors> {
        match self {
            ApiError::Validation(errors) | ApiError::Recipe(RecipeError::Validation(errors)) => {
                Some(errors)
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16()
        });
        if let Some(fields) = self.fields() {
            body["fields"] = json!(fields);
        }

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_SCHEME));
        }
        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
