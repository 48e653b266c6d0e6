//! Request/response bodies

use bindgate_auth::DirectoryEntry;
use serde::{Deserialize, Serialize};

/// Result of an authentication request.
///
/// `user` and `detail` are always present, `null` when unused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub ok: bool,
    pub user: Option<DirectoryEntry>,
    pub detail: Option<String>,
}

impl AuthResponse {
    pub fn success(user: DirectoryEntry) -> Self {
        Self {
            ok: true,
            user: Some(user),
            detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            user: None,
            detail: Some(detail.into()),
        }
    }
}

/// Error body for requests that never reached the authenticator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
