use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Errors raised while inspecting a sidecar proxy.
///
/// Every variant carries enough context (pod, resource kind, format token)
/// to be logged without the caller re-attaching it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InspectError {
    /// Admin endpoint unreachable, timed out, or answered with a non-success status.
    #[error("transport error for {target}: {message}")]
    Transport { target: String, message: String },

    /// Pod, namespace or controlling resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The admin payload does not match the schema expected for the kind.
    #[error("malformed {kind} dump: {message}")]
    MalformedDump { kind: String, message: String },

    /// A supported renderer could not produce its output.
    #[error("cannot render {kind} as {format}: {message}")]
    Render {
        kind: String,
        format: String,
        message: String,
    },

    #[error("output format {format:?} is not supported for {kind}")]
    UnsupportedFormat { kind: String, format: String },

    /// The controlling resource could not be read (access denied, API failure).
    #[error("cannot read controlling resource: {0}")]
    ConfigAccess(String),

    #[error("invalid filter criteria: {0}")]
    InvalidCriteria(String),
}

impl InspectError {
    pub fn transport(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            target: target.into(),
            message: message.into(),
        }
    }

    pub fn malformed(kind: impl ToString, message: impl Into<String>) -> Self {
        Self::MalformedDump {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn unsupported_format(kind: impl ToString, format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            kind: kind.to_string(),
            format: format.into(),
        }
    }

    pub fn render(kind: impl ToString, format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            kind: kind.to_string(),
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_criteria(message: impl Into<String>) -> Self {
        Self::InvalidCriteria(message.into())
    }

    /// Only transport failures are worth another attempt within a pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("K8s API error: {0}")]
    K8sApiError(String),

    #[error("Proxy admin error: {0}")]
    ProxyAdminError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Helper for mapping any unknown error into internal error
pub fn internal_error<E: ToString>(err: E) -> AppError {
    AppError::InternalServerError(err.to_string())
}

impl From<InspectError> for AppError {
    fn from(err: InspectError) -> Self {
        match err {
            InspectError::NotFound(_) => AppError::NotFound(err.to_string()),
            InspectError::UnsupportedFormat { .. } | InspectError::InvalidCriteria(_) => {
                AppError::BadRequest(err.to_string())
            }
            InspectError::Transport { .. } | InspectError::MalformedDump { .. } => {
                AppError::ProxyAdminError(err.to_string())
            }
            InspectError::ConfigAccess(_) => AppError::K8sApiError(err.to_string()),
            InspectError::Render { .. } => internal_error(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::K8sApiError(_) => StatusCode::BAD_GATEWAY,
            AppError::ProxyAdminError(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(json!({
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
