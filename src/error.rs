//! Sync error types with taxonomy and HTTP status code mapping.
//!
//! [`SyncError`] is the central error type. Pipelines use
//! [`SyncError::category`] to file errors into run summaries and
//! [`SyncError::is_account_fatal`] to decide whether an account stops;
//! the trigger API turns it into a structured JSON response.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "job already running: profile-views",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Stable bucket used to group errors in run summaries and alerts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Vendor answered 429 and retries were exhausted.
    RateLimited,
    /// Session or credential rejected (401/403).
    AuthExpired,
    /// Body could not be decoded or had an unexpected shape.
    MalformedResponse,
    /// A row write was rejected by storage.
    StorageWriteFailed,
    /// Enrichment call failed; the original identifier was kept.
    EnrichmentFailed,
    /// A vendor element had no usable natural key.
    MissingIdentifier,
    /// Vendor answered another non-success status.
    Http,
    /// Transport failure (DNS, TLS, connection reset, timeout).
    Network,
    /// Storage unreachable or a read failed.
    Storage,
    /// Missing or invalid configuration.
    Config,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::AuthExpired => "auth_expired",
            Self::MalformedResponse => "malformed_response",
            Self::StorageWriteFailed => "storage_write_failed",
            Self::EnrichmentFailed => "enrichment_failed",
            Self::MissingIdentifier => "missing_identifier",
            Self::Http => "http",
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                  |
/// |-----------|-------------------|------------------------------|
/// | 1000–1999 | Configuration     | 500 Internal Server Error    |
/// | 2000–2999 | Job state         | 404 Not Found / 409 Conflict / 504 |
/// | 3000–3999 | Storage / server  | 500 Internal Server Error    |
/// | 4000–4999 | Upstream vendor   | 502 Bad Gateway              |
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Vendor kept answering 429 after every retry.
    #[error("rate limited on {operation} after {attempts} attempts")]
    RateLimited {
        /// Operation label (e.g. `viewers page 2`).
        operation: String,
        /// Total attempts made, including the first.
        attempts: u32,
    },

    /// Vendor rejected the session or credential.
    #[error("authentication expired on {operation} (HTTP {status})")]
    AuthExpired {
        /// Operation label.
        operation: String,
        /// 401 or 403.
        status: u16,
    },

    /// Body could not be decoded or lacked the documented structure.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Vendor answered a non-success status that has no dedicated variant.
    #[error("upstream HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason, truncated.
        message: String,
    },

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Storage unreachable or a read failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A write was rejected by storage.
    #[error("storage write failed ({code}): {message}")]
    StorageWriteFailed {
        /// Whether the failure is conflict-class (unique violation and kin).
        conflict: bool,
        /// SQLSTATE or equivalent short code.
        code: String,
        /// Database message.
        message: String,
    },

    /// Enrichment lookup failed.
    #[error("enrichment failed: {0}")]
    EnrichmentFailed(String),

    /// A vendor element had no usable natural key.
    #[error("missing identifier: {0}")]
    MissingIdentifier(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No job registered under this name.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// The job is already running.
    #[error("job already running: {0}")]
    JobAlreadyRunning(String),

    /// The job exceeded its wall-clock budget.
    #[error("job {job} exceeded its {secs}s budget")]
    JobTimedOut {
        /// Job name.
        job: String,
        /// Budget in seconds.
        secs: u64,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Taxonomy bucket for this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimited { .. } => ErrorCategory::RateLimited,
            Self::AuthExpired { .. } => ErrorCategory::AuthExpired,
            Self::MalformedResponse(_) => ErrorCategory::MalformedResponse,
            Self::Http { .. } => ErrorCategory::Http,
            Self::Network(_) => ErrorCategory::Network,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::StorageWriteFailed { .. } => ErrorCategory::StorageWriteFailed,
            Self::EnrichmentFailed(_) => ErrorCategory::EnrichmentFailed,
            Self::MissingIdentifier(_) => ErrorCategory::MissingIdentifier,
            Self::Config(_) => ErrorCategory::Config,
            Self::JobNotFound(_)
            | Self::JobAlreadyRunning(_)
            | Self::JobTimedOut { .. }
            | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Short code shown next to the category in alerts.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::RateLimited { .. } => "429".to_string(),
            Self::AuthExpired { status, .. } | Self::Http { status, .. } => status.to_string(),
            Self::StorageWriteFailed { code, .. } => code.clone(),
            Self::MissingIdentifier(_) => "missing".to_string(),
            other => other.category().as_str().to_string(),
        }
    }

    /// Whether this error ends processing for the current account.
    ///
    /// Expired sessions, unreachable storage and non-conflict batch write
    /// failures stop the account; everything else is recorded and skipped.
    #[must_use]
    pub const fn is_account_fatal(&self) -> bool {
        match self {
            Self::AuthExpired { .. } | Self::Storage(_) | Self::Config(_) => true,
            Self::StorageWriteFailed { conflict, .. } => !*conflict,
            _ => false,
        }
    }

    /// Whether a batch write failed on a conflict-class error.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::StorageWriteFailed { conflict: true, .. })
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Config(_) => 1001,
            Self::JobNotFound(_) => 2001,
            Self::JobAlreadyRunning(_) => 2002,
            Self::JobTimedOut { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::Storage(_) => 3001,
            Self::StorageWriteFailed { .. } => 3002,
            Self::RateLimited { .. } => 4001,
            Self::AuthExpired { .. } => 4002,
            Self::MalformedResponse(_) => 4003,
            Self::Http { .. } => 4004,
            Self::Network(_) => 4005,
            Self::EnrichmentFailed(_) => 4006,
            Self::MissingIdentifier(_) => 4007,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::JobNotFound(_) => StatusCode::NOT_FOUND,
            Self::JobAlreadyRunning(_) => StatusCode::CONFLICT,
            Self::JobTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Config(_)
            | Self::Storage(_)
            | Self::StorageWriteFailed { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited { .. }
            | Self::AuthExpired { .. }
            | Self::MalformedResponse(_)
            | Self::Http { .. }
            | Self::Network(_)
            | Self::EnrichmentFailed(_)
            | Self::MissingIdentifier(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: Some(self.category().to_string()),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
