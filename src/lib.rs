// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SecureExpense - Budget-aware expense tracking service
//!
//! Issues and verifies bearer credentials, gates routes by role and refuses
//! expense writes that would take a user past their budget ceiling.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential codec, auth gate and role gate
//! - `budget` - Budget evaluation (retrospective and prospective)
//! - `storage` - Users, expenses and the refresh-token ledger (memory or redb)

pub mod api;
pub mod auth;
pub mod budget;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
