//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use servwatch_core::error::CoreError;
use servwatch_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Cookie carrying the access token for browser sessions.
pub const AUTH_COOKIE: &str = "auth_token";

/// Authenticated user extracted from the request.
///
/// The `Authorization: Bearer <token>` header wins; otherwise the
/// [`AUTH_COOKIE`] cookie is used.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    pub role: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts.headers.get(AUTHORIZATION) {
            Some(value) => {
                let value = value.to_str().unwrap_or_default();
                value
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| {
                        AppError::Core(CoreError::Unauthorized(
                            "Invalid Authorization format. Expected: Bearer <token>".into(),
                        ))
                    })?
                    .to_string()
            }
            None => cookie_value(parts, AUTH_COOKIE).ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?,
        };

        let claims = validate_token(&token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}

/// Value of the first cookie named `name` across all `Cookie` headers.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_cookie(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn cookie_is_found_among_others() {
        let parts = parts_with_cookie("theme=dark; auth_token=abc.def.ghi; lang=en");
        assert_eq!(cookie_value(&parts, AUTH_COOKIE).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        assert_eq!(cookie_value(&parts_with_cookie("theme=dark"), AUTH_COOKIE), None);
        assert_eq!(cookie_value(&parts_with_cookie("auth_token="), AUTH_COOKIE), None);
    }
}
