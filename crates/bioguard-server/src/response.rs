//! JSON response envelope and error mapping
//!
//! Every response is `{success, message?, code?, ...data}`.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bioguard_core::GuardError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

/// Guard error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub GuardError);

impl From<GuardError> for ApiError {
    fn from(e: GuardError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GuardError::Validation(_)
            | GuardError::NotLocked
            | GuardError::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
            GuardError::NotAuthenticated
            | GuardError::IncorrectPin { .. }
            | GuardError::ExpiredToken
            | GuardError::InvalidToken => StatusCode::UNAUTHORIZED,
            GuardError::UserNotFound | GuardError::NotConfigured => StatusCode::NOT_FOUND,
            GuardError::Locked { .. } => StatusCode::LOCKED,
            GuardError::DeliveryFailed | GuardError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self.0 {
            GuardError::Internal(cause) => {
                error!(%cause, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "success": false,
            "message": message,
            "code": self.0.code(),
        });

        match &self.0 {
            GuardError::Locked { until } => {
                body["lockedUntil"] = json!(until);
                body["attemptsRemaining"] = json!(0);
            }
            GuardError::IncorrectPin { attempts_remaining } => {
                body["attemptsRemaining"] = json!(attempts_remaining);
            }
            _ => {}
        }

        (self.status(), Json(body)).into_response()
    }
}

/// Successful envelope with the fields of `data` merged in
pub fn success(message: &str, data: impl Serialize) -> Result<Json<Value>, ApiError> {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("message".into(), Value::String(message.to_string()));

    match serde_json::to_value(data) {
        Ok(Value::Object(fields)) => body.extend(fields),
        Ok(Value::Null) => {}
        Ok(other) => {
            body.insert("data".into(), other);
        }
        Err(e) => return Err(GuardError::Internal(e.to_string()).into()),
    }

    Ok(Json(Value::Object(body)))
}

/// `Json` extractor whose rejections use the error envelope
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    ApiError(GuardError::Validation(rejection.body_text()))
}
