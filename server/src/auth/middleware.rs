//! Authentication middleware.
//!
//! Pushes carry a shared secret in the `x-blob-token` header. When the server
//! has no secret configured every push is accepted.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::AppState;

/// Header carrying the push secret.
pub const PUSH_TOKEN_HEADER: &str = "x-blob-token";

/// Proof that a push request passed the shared-secret check.
#[derive(Debug, Clone)]
pub struct PushAuth {
    /// Whether a secret was actually checked
    pub verified: bool,
}

impl FromRequestParts<AppState> for PushAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.push_token.as_deref() else {
            return Ok(PushAuth { verified: false });
        };

        let provided = parts
            .headers
            .get(PUSH_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if provided == expected {
            Ok(PushAuth { verified: true })
        } else {
            tracing::warn!(
                header_present = !provided.is_empty(),
                "sync_push rejected: token mismatch"
            );
            Err(AppError::Forbidden)
        }
    }
}
