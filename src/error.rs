// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::codec::IssueError;
use crate::auth::password::PasswordError;
use crate::auth::AuthError;
use crate::budget::BudgetExceeded;
use crate::storage::StorageError;

/// Generic message for failures whose detail stays in the logs.
pub const SERVER_ERROR: &str = "Server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Present only on budget rejections.
    pub overrun: Option<BudgetOverrun>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetOverrun {
    pub new_total: f64,
    pub budget: f64,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(flatten)]
    overrun: Option<BudgetOverrun>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            overrun: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            message: self.message,
            overrun: self.overrun,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.message())
    }
}

impl From<BudgetExceeded> for ApiError {
    fn from(err: BudgetExceeded) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: err.to_string(),
            overrun: Some(BudgetOverrun {
                new_total: err.new_total,
                budget: err.budget,
            }),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StorageError::AlreadyExists(what) => Self::bad_request(format!("{what} already exists")),
            other => {
                tracing::error!(error = %other, "Storage failure");
                Self::server_error()
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!(error = %err, "Password hashing failure");
        Self::server_error()
    }
}

impl From<IssueError> for ApiError {
    fn from(err: IssueError) -> Self {
        tracing::error!(error = %err, "Token signing failure");
        Self::server_error()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the `{message}` error body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query` extractor whose rejections use the `{message}` error body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let server = ApiError::server_error();
        assert_eq!(server.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(server.message, "Server error");
    }

    #[tokio::test]
    async fn into_response_returns_message_body() {
        let (status, body) = body_of(ApiError::bad_request("bad data")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "message": "bad data" }));
    }

    #[tokio::test]
    async fn budget_rejection_carries_totals() {
        let error = ApiError::from(BudgetExceeded {
            new_total: 105.0,
            budget: 100.0,
        });
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({ "message": "Budget exceeded", "newTotal": 105.0, "budget": 100.0 })
        );
    }

    #[test]
    fn auth_errors_keep_their_status() {
        assert_eq!(ApiError::from(AuthError::NoCredential).status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::from(AuthError::Unauthenticated).status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from(AuthError::Forbidden).status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn storage_errors_map_to_http() {
        let nf = ApiError::from(StorageError::NotFound("Expense".into()));
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "Expense not found");

        let dup = ApiError::from(StorageError::AlreadyExists("User".into()));
        assert_eq!(dup.status, StatusCode::BAD_REQUEST);

        let broken = serde_json::from_str::<u32>("x").unwrap_err();
        let internal = ApiError::from(StorageError::from(broken));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "Server error");
    }
}
