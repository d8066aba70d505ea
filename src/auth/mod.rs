// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Credential issuance, verification and role gating for the SecureExpense API.
//!
//! ## Auth Flow
//!
//! 1. Client logs in with email and password
//! 2. Server returns a short-lived access token and a long-lived refresh token,
//!    each signed with its own secret; the refresh token is recorded in the
//!    token ledger
//! 3. Client sends `Authorization: Bearer <access token>` on protected calls
//! 4. Auth gate verifies signature and expiry and attaches a [`Principal`]
//! 5. Role gates (where present) compare the principal's role exactly
//! 6. When the access token expires the client trades its refresh token for
//!    a new one at `/api/users/refresh`
//!
//! ## Security
//!
//! - Access tokens are stateless and cannot be revoked; they expire after 15 minutes
//! - Missing credentials map to 403, bad credentials to 401, role mismatch to 403
//! - Passwords are stored as Argon2 PHC strings

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod password;
pub mod roles;

pub use claims::{AccessClaims, Principal, RefreshClaims};
pub use codec::{CredentialCodec, IssuedToken, TokenError, TokenKind};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, RequestContext};
pub use middleware::{enforce_role, require_auth, require_role, RoleGuard};
pub use roles::Role;
