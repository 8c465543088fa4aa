//! Error responses for the HTTP API.
//!
//! Every failure is answered with `{"error": "<message>"}` and a status code
//! derived from the application error.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::error;

use crate::application::AppError;

pub const JSON_REQUIRED: &str = "Request must be JSON";

/// JSON body for every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    /// Body was not declared as JSON.
    UnsupportedMediaType,
    /// Body was declared as JSON but could not be read.
    MalformedBody(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::App(err) => app_status(err),
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::MalformedBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::App(err) => app_message(err),
            ApiError::UnsupportedMediaType => JSON_REQUIRED.to_string(),
            ApiError::MalformedBody(detail) => detail.clone(),
        }
    }
}

fn app_status(err: &AppError) -> StatusCode {
    match err {
        AppError::CustomerNotFound(_) | AppError::GroupNotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation(_)
        | AppError::InvalidAmount(_)
        | AppError::InsufficientBalance { .. }
        | AppError::GroupAlreadyExists(_) => StatusCode::BAD_REQUEST,
        AppError::EmailAlreadyRegistered(_) | AppError::CustomerIdConflict { .. } => {
            StatusCode::CONFLICT
        }
        AppError::Allocation(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing wording. Store details never leave the process.
fn app_message(err: &AppError) -> String {
    match err {
        AppError::CustomerNotFound(_) => "Customer not found".to_string(),
        AppError::GroupNotFound(_) => "Group not found".to_string(),
        AppError::InsufficientBalance { .. } => "Insufficient balance".to_string(),
        AppError::GroupAlreadyExists(_) => "A group with this acronym already exists".to_string(),
        AppError::Allocation(_) | AppError::Database(_) => "Internal server error".to_string(),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        let body = ErrorBody {
            error: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

/// `Json` extractor whose rejections use the API error format.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => Err(ApiError::UnsupportedMediaType),
            Err(rejection) => Err(ApiError::MalformedBody(rejection.body_text())),
        }
    }
}
