// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: registration, login, token refresh, logout, profile,
//! budget ceiling and (admin) session inspection.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};

use crate::{
    auth::{password, AdminOnly, Auth, AuthError},
    error::{ApiError, ApiJson},
    models::{
        BudgetResponse, LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
        RefreshRecord, RefreshRequest, RefreshResponse, RegisterRequest, SessionView,
        UpdateBudgetRequest, User,
    },
    state::AppState,
    storage::StorageError,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Refresh and logout read the token leniently: a missing or unreadable body
/// is treated the same as an absent token.
fn refresh_body(body: &Bytes) -> RefreshRequest {
    serde_json::from_slice(body).unwrap_or_default()
}

/// Register a new account with the `User` role and a zero budget.
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = MessageResponse),
        (status = 400, description = "Email already registered", body = MessageResponse),
        (status = 500, description = "Validation or server failure", body = MessageResponse),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let request = request.trimmed();
    if let Err(reason) = request.validate() {
        tracing::warn!(reason, "Registration rejected");
        return Err(ApiError::server_error());
    }

    if state.store.find_user_by_email(&request.email)?.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let hash = password::hash_password(&request.password)?;
    let user = User::new(request.name, request.email, hash);

    // A concurrent registration can still win between lookup and save.
    match state.store.save_user(&user) {
        Ok(()) => {}
        Err(StorageError::AlreadyExists(_)) => return Err(ApiError::bad_request("User already exists")),
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, "User registered");
    Ok(Json(MessageResponse::new("User added successfully")))
}

/// Exchange credentials for an access token and a refresh token.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 400, description = "Invalid email or password", body = MessageResponse),
        (status = 500, description = "Validation or server failure", body = MessageResponse),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if let Err(reason) = request.validate() {
        tracing::warn!(reason, "Login rejected");
        return Err(ApiError::server_error());
    }

    let Some(user) = state.store.find_user_by_email(&request.email)? else {
        tracing::info!("Login failed: unknown email");
        return Err(ApiError::bad_request(INVALID_CREDENTIALS));
    };

    if !password::verify_password(&request.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::bad_request(INVALID_CREDENTIALS));
    }

    let access = state.codec.issue_access(&user.id, &user.email, user.role)?;
    let refresh = state.codec.issue_refresh(&user.id, &user.email)?;

    state.store.record(&RefreshRecord {
        subject_id: user.id.clone(),
        token_value: refresh.token.clone(),
        expires_at: refresh.expires_at,
        created_at: refresh.issued_at,
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "Login successful");
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        access_token: access.token,
        refresh_token: refresh.token,
    }))
}

/// Mint a new access token from a refresh token.
///
/// The role comes from the stored account, so a role change takes effect on
/// the next refresh.
#[utoipa::path(
    post,
    path = "/api/users/refresh",
    tag = "Users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "No refresh token provided", body = MessageResponse),
        (status = 403, description = "Invalid refresh token", body = MessageResponse),
        (status = 404, description = "User no longer exists", body = MessageResponse),
    )
)]
pub async fn refresh(State(state): State<AppState>, body: Bytes) -> Result<Json<RefreshResponse>, ApiError> {
    let request = refresh_body(&body);
    let Some(token) = request.token() else {
        return Err(ApiError::unauthorized("No refresh token provided"));
    };

    let claims = state.codec.verify_refresh(token).map_err(|e| {
        tracing::debug!(error = %e, "Refresh token rejected");
        ApiError::forbidden("Invalid refresh token")
    })?;

    let user = state
        .store
        .find_user_by_id(&claims.id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    // Recorded for continuity only; refresh tokens are not revocable.
    let recorded = state
        .store
        .find_by_subject(&user.id)?
        .iter()
        .any(|record| record.token_value == token);
    tracing::debug!(user_id = %user.id, recorded, "Refresh token ledger lookup");

    let access = state.codec.issue_access(&user.id, &user.email, user.role)?;

    tracing::info!(user_id = %user.id, "Access token refreshed");
    Ok(Json(RefreshResponse {
        message: "Token refreshed successfully".to_string(),
        access_token: access.token,
    }))
}

/// Acknowledge a logout. Issued tokens stay valid until they expire.
#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "Users",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 400, description = "No refresh token provided", body = MessageResponse),
    )
)]
pub async fn logout(body: Bytes) -> Result<Json<MessageResponse>, ApiError> {
    if refresh_body(&body).token().is_none() {
        return Err(ApiError::bad_request("No refresh token provided."));
    }
    tracing::info!("User logged out");
    Ok(Json(MessageResponse::new("User logged out successfully.")))
}

#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated identity", body = ProfileResponse),
        (status = 401, description = "Invalid or expired token"),
        (status = 403, description = "No token provided"),
    )
)]
pub async fn profile(Auth(principal): Auth) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        message: "This is a protected route.".to_string(),
        user: principal,
    })
}

/// Set a user's budget ceiling. Owner or admin.
#[utoipa::path(
    put,
    path = "/api/users/{id}/budget",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateBudgetRequest,
    responses(
        (status = 200, description = "Budget updated", body = BudgetResponse),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "User not found", body = MessageResponse),
    )
)]
pub async fn update_budget(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<UpdateBudgetRequest>,
) -> Result<Json<BudgetResponse>, ApiError> {
    if !principal.may_act_for(&user_id) {
        return Err(AuthError::Forbidden.into());
    }

    let _guard = state.budget_locks.lock(&user_id).await;

    let mut user = state
        .store
        .find_user_by_id(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    user.budget = request.budget;
    user.updated_at = state.codec.now();
    state.store.save_user(&user)?;

    tracing::info!(user_id = %user.id, budget = user.budget, actor = %principal.id, "Budget updated");
    Ok(Json(BudgetResponse {
        message: "Budget updated successfully".to_string(),
        budget: user.budget,
    }))
}

/// List the refresh tokens recorded for a user. Admin only.
#[utoipa::path(
    get,
    path = "/api/users/{id}/sessions",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Recorded sessions", body = Vec<SessionView>),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found", body = MessageResponse),
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    AdminOnly(_admin): AdminOnly,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    if state.store.find_user_by_id(&user_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let now = state.codec.now();
    let sessions = state
        .store
        .find_by_subject(&user_id)?
        .iter()
        .map(|record| SessionView::from_record(record, now))
        .collect();

    Ok(Json(sessions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_body_is_lenient() {
        assert_eq!(refresh_body(&Bytes::new()).token(), None);
        assert_eq!(refresh_body(&Bytes::from_static(b"not json")).token(), None);
        assert_eq!(refresh_body(&Bytes::from_static(br#"{"refreshToken":""}"#)).token(), None);
        assert_eq!(
            refresh_body(&Bytes::from_static(br#"{"refreshToken":"abc"}"#)).token(),
            Some("abc")
        );
    }
}
