//! JSON extractor whose rejections use the API error envelope

use axum::{
    extract::{rejection::JsonRejection as AxumJsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::{ApiError, ApiErrorType};

/// Drop-in for `axum::Json`; malformed bodies yield an `ApiError` body
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(req, state).await {
            Ok(AxumJson(value)) => Ok(Json(value)),
            Err(rejection) => Err(rejection_error(&rejection)),
        }
    }
}

fn rejection_error(rejection: &AxumJsonRejection) -> ApiError {
    let (code, message) = match rejection {
        AxumJsonRejection::JsonDataError(err) => {
            ("invalid_json_data", format!("Invalid JSON data: {}", err.body_text()))
        }
        AxumJsonRejection::JsonSyntaxError(err) => {
            ("invalid_json_syntax", format!("Invalid JSON syntax: {}", err.body_text()))
        }
        AxumJsonRejection::MissingJsonContentType(_) => (
            "missing_content_type",
            "Missing Content-Type header. Expected 'application/json'.".to_string(),
        ),
        AxumJsonRejection::BytesRejection(err) => (
            "unreadable_body",
            format!("Failed to read request body: {}", err.body_text()),
        ),
        _ => ("invalid_json", "Invalid JSON request".to_string()),
    };

    let status = match rejection.status() {
        StatusCode::UNSUPPORTED_MEDIA_TYPE => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        StatusCode::UNPROCESSABLE_ENTITY => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    };

    ApiError::new(status, ApiErrorType::InvalidRequestError, message).with_code(code)
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
