//! HTTP Basic authentication for administrative routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::authorization::Basic;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor guarding admin routes.
///
/// When no admin credentials are configured every request passes.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    /// Authenticated user, `None` when auth is disabled
    pub username: Option<String>,
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(admin) = &state.config.admin else {
            debug!("Admin credentials not configured, allowing request");
            return Ok(Self { username: None });
        };

        let TypedHeader(Authorization(credentials)) = parts
            .extract::<TypedHeader<Authorization<Basic>>>()
            .await
            .map_err(|_| ApiError::unauthorized("Authentication required"))?;

        let user_ok = constant_time_eq(credentials.username().as_bytes(), admin.username.as_bytes());
        let password_ok = constant_time_eq(credentials.password().as_bytes(), admin.password.as_bytes());

        if user_ok && password_ok {
            Ok(Self {
                username: Some(admin.username.clone()),
            })
        } else {
            warn!(username = %credentials.username(), "Rejected admin credentials");
            Err(ApiError::unauthorized("Invalid credentials"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret!"));
        assert!(constant_time_eq(b"", b""));
    }
}
