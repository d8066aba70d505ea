// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// The set is closed and flat: `Admin` does not imply `User`. Routes that
/// should admit both must say so explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    /// Ordinary account holder; new accounts start here
    #[default]
    User,
    /// Administrator
    Admin,
}

impl Role {
    /// Exact-match role comparison.
    pub fn satisfies(&self, required: Role) -> bool {
        *self == required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_does_not_satisfy_user() {
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(!Role::Admin.satisfies(Role::User));
        assert!(Role::User.satisfies(Role::User));
        assert!(!Role::User.satisfies(Role::Admin));
    }

    #[test]
    fn serializes_with_capitalised_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), r#""Admin""#);
        let role: Role = serde_json::from_str(r#""User""#).unwrap();
        assert_eq!(role, Role::User);
        assert!(serde_json::from_str::<Role>(r#""user""#).is_err());
        assert!(serde_json::from_str::<Role>(r#""ADMIN""#).is_err());
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }
}
