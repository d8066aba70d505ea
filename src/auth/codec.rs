// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Minting and verification of signed, time-bounded tokens.
//!
//! Access and refresh tokens are two independent signing contexts: each has
//! its own HMAC secret and lifetime, and a token minted in one context never
//! verifies in the other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};

use super::claims::{AccessClaims, RefreshClaims};
use super::roles::Role;
use crate::clock::Clock;
use crate::config::TokenConfig;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Which signing context a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Verification failure.
///
/// Callers reject the request identically for all three; the distinction
/// exists for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to sign token: {0}")]
pub struct IssueError(#[from] jsonwebtoken::errors::Error);

/// A freshly minted token with its validity window.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Claims that carry an expiry timestamp (Unix seconds).
pub trait TimeBounded {
    fn expires_at(&self) -> i64;
}

impl TimeBounded for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl TimeBounded for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

struct SigningContext {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl SigningContext {
    fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Stateless token codec.
///
/// Built once at startup from an explicit [`TokenConfig`] and a [`Clock`].
pub struct CredentialCodec {
    access: SigningContext,
    refresh: SigningContext,
    clock: Arc<dyn Clock>,
}

impl CredentialCodec {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            access: SigningContext::new(&config.access_secret, config.access_ttl),
            refresh: SigningContext::new(&config.refresh_secret, config.refresh_ttl),
            clock,
        }
    }

    fn context(&self, kind: TokenKind) -> &SigningContext {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Current time according to the codec's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Mint an access token for a user.
    pub fn issue_access(&self, subject_id: &str, email: &str, role: Role) -> Result<IssuedToken, IssueError> {
        let (issued_at, expires_at) = self.window(TokenKind::Access);
        let claims = AccessClaims {
            id: subject_id.to_string(),
            email: email.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = self.sign(TokenKind::Access, &claims)?;
        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Mint a refresh token for a user.
    pub fn issue_refresh(&self, subject_id: &str, email: &str) -> Result<IssuedToken, IssueError> {
        let (issued_at, expires_at) = self.window(TokenKind::Refresh);
        let claims = RefreshClaims {
            id: subject_id.to_string(),
            email: email.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = self.sign(TokenKind::Refresh, &claims)?;
        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token, TokenKind::Refresh)
    }

    /// Verify a token against the secret of `kind`.
    ///
    /// The signature is checked first, then expiry against the codec clock.
    /// `now == exp` counts as expired.
    pub fn verify<C>(&self, token: &str, kind: TokenKind) -> Result<C, TokenError>
    where
        C: DeserializeOwned + TimeBounded,
    {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is checked below against the injected clock, without leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<C>(token, &self.context(kind).decoding, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })?;

        if self.clock.now().timestamp() >= data.claims.expires_at() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    fn window(&self, kind: TokenKind) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = self.clock.now();
        // Claims carry whole seconds; keep the reported window consistent.
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        (issued_at, issued_at + self.context(kind).ttl)
    }

    fn sign<C: Serialize>(&self, kind: TokenKind, claims: &C) -> Result<String, IssueError> {
        Ok(encode(&Header::new(ALGORITHM), claims, &self.context(kind).encoding)?)
    }
}
