// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and role middleware for Axum.
//!
//! `require_auth` is the auth gate for a whole router subtree: it verifies
//! the bearer token and inserts a [`RequestContext`] carrying the principal.
//! `enforce_role` is the role gate and must be layered inside it.
//!
//! ```rust,ignore
//! let admin = Router::new()
//!     .route("/expenses", get(list_all))
//!     .route_layer(from_fn_with_state(require_role(Role::Admin), enforce_role))
//!     .route_layer(from_fn_with_state(state.clone(), require_auth));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::extractor::{authenticate, RequestContext};
use super::{AuthError, Principal, Role};
use crate::state::AppState;

/// Auth gate middleware.
pub async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match authenticate(&state.codec, request.headers()) {
        Ok(principal) => {
            request
                .extensions_mut()
                .insert(RequestContext::authenticated(principal));
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Guard admitting exactly one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGuard {
    required: Role,
}

/// Build a guard for `expected`.
pub fn require_role(expected: Role) -> RoleGuard {
    RoleGuard { required: expected }
}

impl RoleGuard {
    /// Accept or reject a principal.
    ///
    /// A missing principal means the auth gate did not run; that is rejected
    /// as unauthenticated rather than trusted.
    pub fn authorize<'a>(&self, principal: Option<&'a Principal>) -> Result<&'a Principal, AuthError> {
        let principal = principal.ok_or(AuthError::Unauthenticated)?;
        if !principal.role.satisfies(self.required) {
            tracing::debug!(
                user_id = %principal.id,
                role = %principal.role,
                required = %self.required,
                "Role gate rejected principal"
            );
            return Err(AuthError::Forbidden);
        }
        Ok(principal)
    }

    pub fn check<'a>(&self, ctx: &'a RequestContext) -> Result<&'a Principal, AuthError> {
        self.authorize(ctx.principal())
    }
}

/// Role gate middleware; state is the guard built by [`require_role`].
pub async fn enforce_role(State(guard): State<RoleGuard>, request: Request, next: Next) -> Response {
    let verdict = match request.extensions().get::<RequestContext>() {
        Some(ctx) => guard.check(ctx).map(|_| ()),
        None => Err(AuthError::Unauthenticated),
    };

    match verdict {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn user() -> Principal {
        Principal::new("u1", "u@x.com", Role::User)
    }

    fn admin() -> Principal {
        Principal::new("a1", "a@x.com", Role::Admin)
    }

    #[test]
    fn admin_guard_rejects_user_and_accepts_admin() {
        let guard = require_role(Role::Admin);
        let u = user();
        let a = admin();
        assert_eq!(guard.authorize(Some(&u)), Err(AuthError::Forbidden));
        assert_eq!(guard.authorize(Some(&a)), Ok(&a));
    }

    #[test]
    fn user_guard_does_not_admit_admin() {
        let guard = require_role(Role::User);
        let a = admin();
        assert_eq!(guard.authorize(Some(&a)), Err(AuthError::Forbidden));
    }

    #[test]
    fn missing_principal_is_unauthenticated() {
        let guard = require_role(Role::Admin);
        assert_eq!(guard.authorize(None), Err(AuthError::Unauthenticated));
        assert_eq!(guard.check(&RequestContext::anonymous()), Err(AuthError::Unauthenticated));
    }

    fn gated_router(state: AppState) -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(require_role(Role::Admin), enforce_role))
            .route_layer(from_fn_with_state(state, require_auth))
    }

    async fn status_for(state: &AppState, header: Option<String>) -> StatusCode {
        let mut request = axum::http::Request::builder().uri("/admin");
        if let Some(h) = header {
            request = request.header(AUTHORIZATION, h);
        }
        gated_router(state.clone())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn layered_gates_map_to_status_codes() {
        let state = AppState::for_tests();
        let user_token = state.codec.issue_access("u1", "u@x.com", Role::User).unwrap().token;
        let admin_token = state.codec.issue_access("a1", "a@x.com", Role::Admin).unwrap().token;

        assert_eq!(status_for(&state, None).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(&state, Some("Bearer garbage".into())).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&state, Some(format!("Bearer {user_token}"))).await, StatusCode::FORBIDDEN);
        assert_eq!(status_for(&state, Some(format!("Bearer {admin_token}"))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn role_gate_without_auth_gate_is_unauthenticated() {
        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(require_role(Role::Admin), enforce_role));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
