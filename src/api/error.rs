//! Error taxonomy of the custom API and its HTTP mapping.
//!
//! Error bodies follow the Open Service Broker `ErrorResponse` shape:
//! `{"error": "<ErrorKey>", "description": "<message>"}`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoints::EndpointError;
use crate::lifecycle::LifecycleError;
use crate::topology::TopologyError;

/// Errors surfaced to API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("instance '{instance_id}' does not exist")]
    InstanceNotFound { instance_id: String },

    /// Transient; the client should poll again later.
    #[error("instance '{instance_id}' is not yet ready")]
    NotReady { instance_id: String },

    #[error("instance '{instance_id}' has an invalid topology: {reason}")]
    InvalidTopology { instance_id: String, reason: String },

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    #[error("{0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("request not completed within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("request headers are {size} bytes, limit is {limit}")]
    HeadersTooLarge { size: usize, limit: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map error variant to its HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InstanceNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidTopology { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ApiError::HeadersTooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable key placed in the `error` field.
    pub fn error_key(&self) -> &'static str {
        match self {
            ApiError::InstanceNotFound { .. } => "InstanceNotFound",
            ApiError::NotReady { .. } => "NotReady",
            ApiError::InvalidTopology { .. } => "InvalidTopology",
            ApiError::PreconditionFailed(_) => "PreconditionFailed",
            ApiError::NotImplemented { .. } => "NotImplemented",
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Timeout { .. } => "RequestTimeout",
            ApiError::HeadersTooLarge { .. } => "RequestHeaderFieldsTooLarge",
            ApiError::Internal(_) => "InternalError",
        }
    }
}

impl From<TopologyError> for ApiError {
    fn from(err: TopologyError) -> Self {
        match err {
            TopologyError::InstanceNotFound { instance_id } => {
                ApiError::InstanceNotFound { instance_id }
            }
            TopologyError::InvalidTopology {
                instance_id,
                reason,
            } => ApiError::InvalidTopology {
                instance_id,
                reason,
            },
            err @ TopologyError::Graph { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<EndpointError> for ApiError {
    fn from(err: EndpointError) -> Self {
        match err {
            EndpointError::NotReady { instance_id } => ApiError::NotReady { instance_id },
            EndpointError::Topology(err) => err.into(),
            err @ EndpointError::Graph { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotImplemented { operation } => ApiError::NotImplemented { operation },
            err @ (LifecycleError::BackupNotFound { .. }
            | LifecycleError::RestoreNotFound { .. }) => ApiError::NotFound(err.to_string()),
            err @ (LifecycleError::InvalidTransition { .. }
            | LifecycleError::ActiveRestores { .. }
            | LifecycleError::PreconditionFailed { .. }) => {
                ApiError::PreconditionFailed(err.to_string())
            }
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub description: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            error: err.error_key().to_string(),
            description: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error_key = self.error_key(), status = status.as_u16(), "{}", self);
        } else {
            tracing::warn!(error_key = self.error_key(), status = status.as_u16(), "{}", self);
        }

        let mut response = (status, Json(ErrorResponse::from(&self))).into_response();
        if matches!(self, ApiError::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"osb-custom-api\""),
            );
        }
        response
    }
}
