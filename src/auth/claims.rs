// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated principal.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by an access token.
///
/// Timestamps are Unix seconds. `exp` is always `iat` plus the configured
/// access lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub id: String,
    pub email: String,
    pub role: Role,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Claims carried by a refresh token.
///
/// There is no role: a refresh token can only mint a new access token, and
/// the role for that token is read from the user record at refresh time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated identity for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    /// Canonical user ID
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }

    /// Check if this principal is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this principal may act on resources owned by `user_id`.
    ///
    /// Granted to the owner and, explicitly, to administrators.
    pub fn may_act_for(&self, user_id: &str) -> bool {
        self.id == user_id || self.is_admin()
    }
}

impl From<AccessClaims> for Principal {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.id,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> AccessClaims {
        AccessClaims {
            id: "user_123".to_string(),
            email: "a@x.com".to_string(),
            role: Role::Admin,
            iat: 1700000000,
            exp: 1700000900,
        }
    }

    #[test]
    fn principal_from_claims_keeps_identity() {
        let principal = Principal::from(sample_claims());
        assert_eq!(principal, Principal::new("user_123", "a@x.com", Role::Admin));
    }

    #[test]
    fn access_claims_wire_shape() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["id"], "user_123");
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["role"], "Admin");
        assert_eq!(json["exp"], 1700000900);
    }

    #[test]
    fn refresh_claims_have_no_role() {
        let claims = RefreshClaims {
            id: "user_123".to_string(),
            email: "a@x.com".to_string(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(claims).unwrap();
        assert!(json.get("role").is_none());
    }

    #[test]
    fn may_act_for_owner_or_admin() {
        let user = Principal::new("u1", "a@x.com", Role::User);
        assert!(user.may_act_for("u1"));
        assert!(!user.may_act_for("u2"));

        let admin = Principal::new("admin", "root@x.com", Role::Admin);
        assert!(admin.may_act_for("u2"));
    }
}
