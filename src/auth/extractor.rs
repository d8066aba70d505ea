// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential extraction and the request-scoped identity context.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is the verified Principal
//! }
//! ```

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{middleware::require_role, AuthError, CredentialCodec, Principal, Role};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// Typed per-request identity context.
///
/// Inserted into request extensions by the auth middleware; handlers and
/// guards read it instead of inspecting ad hoc request fields.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    principal: Option<Principal>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is case-sensitive and separated by exactly one space. Anything
/// else counts as no credential at all.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::NoCredential)?
        .to_str()
        .map_err(|_| AuthError::NoCredential)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::NoCredential)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthError::NoCredential);
    }

    Ok(token)
}

/// Run the auth gate over a set of request headers.
pub fn authenticate(codec: &CredentialCodec, headers: &HeaderMap) -> Result<Principal, AuthError> {
    let token = bearer_token(headers)?;

    match codec.verify_access(token) {
        Ok(claims) => Ok(Principal::from(claims)),
        Err(reason) => {
            tracing::debug!(%reason, "Access token rejected");
            Err(AuthError::Unauthenticated)
        }
    }
}

/// Extractor for authenticated principals.
///
/// Reuses the principal placed by the auth middleware when present,
/// otherwise verifies the bearer token itself.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_mine(
///     Auth(principal): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<Expense>>, ApiError> {
///     // principal.id is the caller's user id
/// }
/// ```
pub struct Auth(pub Principal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the principal
        if let Some(principal) = parts
            .extensions
            .get::<RequestContext>()
            .and_then(|ctx| ctx.principal().cloned())
        {
            return Ok(Auth(principal));
        }

        let principal = authenticate(&state.codec, &parts.headers)?;
        Ok(Auth(principal))
    }
}

/// Extractor that requires the `Admin` role.
pub struct AdminOnly(pub Principal);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state).await?;
        require_role(Role::Admin).authorize(Some(&principal))?;
        Ok(AdminOnly(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_requires_exact_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::NoCredential));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Ok("abc.def.ghi"));

        for bad in ["bearer abc", "BEARER abc", "Bearer  abc", "Bearer", "Bearer ", "Basic abc", "abc", "Bearer a b"] {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(bad).unwrap());
            assert_eq!(bearer_token(&headers), Err(AuthError::NoCredential), "header {bad:?}");
        }
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let state = AppState::for_tests();
        let mut parts = parts_with_header(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::NoCredential)));
    }

    #[tokio::test]
    async fn auth_extractor_verifies_token() {
        let state = AppState::for_tests();
        let issued = state.codec.issue_access("user_123", "a@x.com", Role::User).unwrap();
        let mut parts = parts_with_header(Some(&format!("Bearer {}", issued.token)));

        let Auth(principal) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(principal, Principal::new("user_123", "a@x.com", Role::User));
    }

    #[tokio::test]
    async fn auth_extractor_collapses_verification_failures() {
        let state = AppState::for_tests();
        let mut parts = parts_with_header(Some("Bearer not-a-jwt"));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_context() {
        let state = AppState::for_tests();
        let mut parts = parts_with_header(None);
        let principal = Principal::new("from_middleware", "m@x.com", Role::Admin);
        parts
            .extensions
            .insert(RequestContext::authenticated(principal.clone()));

        let Auth(found) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found, principal);
    }

    #[tokio::test]
    async fn admin_only_rejects_non_admin() {
        let state = AppState::for_tests();
        let mut parts = parts_with_header(None);
        parts.extensions.insert(RequestContext::authenticated(Principal::new(
            "user_123",
            "a@x.com",
            Role::User,
        )));

        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::Forbidden)));
    }

    #[tokio::test]
    async fn request_context_defaults_to_anonymous() {
        let mut parts = parts_with_header(None);
        let ctx = RequestContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(ctx.principal().is_none());
    }
}
