use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sso_identity_oidc::OidcError;
use tracing::{error, warn};

/// Handler error mapped onto an HTTP response.
#[derive(Debug)]
pub struct AppError(pub OidcError);

impl From<OidcError> for AppError {
    fn from(err: OidcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0 {
            OidcError::ProviderDenied {
                error,
                description,
                state,
            } => {
                warn!("OAuth error: {}: {:?}", error, description);
                let body = serde_json::json!({
                    "error": error,
                    "error_description": description,
                    "state": state,
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            err => {
                let status = match &err {
                    OidcError::StateMismatch | OidcError::MissingAuthorizationCode => {
                        StatusCode::BAD_REQUEST
                    }
                    OidcError::TokenNotRetained => StatusCode::UNAUTHORIZED,
                    e if e.is_upstream() => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error!("Request failed: {}", err);

                let body = serde_json::json!({
                    "error": err.to_string(),
                    "code": status.as_u16(),
                });
                (status, Json(body)).into_response()
            }
        }
    }
}
