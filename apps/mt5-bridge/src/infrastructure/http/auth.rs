//! Bridge Token Auth Gate
//!
//! Every core-triggering endpoint requires the shared bridge token, sent
//! either as `Authorization: Bearer <token>` or as `X-Bridge-Token:
//! <token>`. An empty configured token disables the gate (local
//! development). Gate failures are rejected before any session work
//! happens.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiError;
use super::state::AppState;

/// Extractor that rejects requests lacking a valid bridge token.
#[derive(Debug, Clone, Copy)]
pub struct BridgeAuth;

impl BridgeAuth {
    /// Check the two accepted header forms against the configured token.
    #[must_use]
    pub fn check(parts: &Parts, token: &str) -> bool {
        if token.is_empty() {
            return true;
        }

        if let Some(auth) = parts.headers.get("authorization")
            && let Ok(auth) = auth.to_str()
            && let Some(bearer) = auth.trim().strip_prefix("Bearer ")
            && bearer.trim() == token
        {
            return true;
        }

        if let Some(header) = parts.headers.get("x-bridge-token")
            && let Ok(header) = header.to_str()
            && header.trim() == token
        {
            return true;
        }

        false
    }
}

impl FromRequestParts<AppState> for BridgeAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if Self::check(parts, &state.config.auth_token) {
            Ok(Self)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/history");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn empty_token_disables_the_gate() {
        assert!(BridgeAuth::check(&parts(&[]), ""));
    }

    #[test]
    fn bearer_header_matches() {
        let parts = parts(&[("authorization", "Bearer secret123")]);
        assert!(BridgeAuth::check(&parts, "secret123"));
        assert!(!BridgeAuth::check(&parts, "other"));
    }

    #[test]
    fn bridge_token_header_matches() {
        let parts = parts(&[("x-bridge-token", "secret123")]);
        assert!(BridgeAuth::check(&parts, "secret123"));
    }

    #[test]
    fn missing_headers_are_rejected() {
        assert!(!BridgeAuth::check(&parts(&[]), "secret123"));
    }
}
