//! Optional shared-secret gate for the download endpoint.
//!
//! With no key configured every request passes and startup logs a warning.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use crate::envelope::ResponseEnvelope;
use crate::state::AppState;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or missing API Key";

/// Process-wide API key check, fixed at startup.
#[derive(Clone, Default)]
pub struct AuthGate {
    api_key: Option<Arc<str>>,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl AuthGate {
    /// An empty key is treated as no key.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Whether a request carrying `credential` may proceed.
    pub fn allows(&self, credential: Option<&str>) -> bool {
        match &self.api_key {
            None => true,
            Some(key) => credential == Some(key.as_ref()),
        }
    }
}

/// Rejects requests whose `Authorization` header does not match the key.
pub async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let credential = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !state.auth.allows(credential) {
        warn!(
            uri = %request.uri().path(),
            credential_present = credential.is_some(),
            "rejected unauthorized request"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(ResponseEnvelope::failure(None, UNAUTHORIZED_MESSAGE)),
        )
            .into_response();
    }

    next.run(request).await
}
