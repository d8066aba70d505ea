// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistence for users, expenses and the refresh-token ledger.
//!
//! The decision logic treats storage as an external collaborator reached
//! through three small traits. Each call is synchronous and individually
//! consistent; nothing here spans several calls.
//!
//! ## Backends
//!
//! - [`InMemoryStore`]: lock-guarded maps, used in development and tests
//! - [`RedbStore`]: embedded redb file under `DATA_DIR`

pub mod database;
pub mod memory;

pub use database::RedbStore;
pub use memory::InMemoryStore;

use crate::models::{Expense, RefreshRecord, User};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// User accounts.
pub trait UserStore {
    fn find_user_by_id(&self, id: &str) -> StorageResult<Option<User>>;

    /// Email lookup is case-insensitive.
    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Insert or replace a user.
    ///
    /// # Errors
    /// `AlreadyExists` if another user already holds the same email.
    fn save_user(&self, user: &User) -> StorageResult<()>;

    fn list_users(&self) -> StorageResult<Vec<User>>;
}

/// Expense records.
pub trait ExpenseStore {
    /// A user's expenses, oldest first.
    fn find_expenses_by_user(&self, user_id: &str) -> StorageResult<Vec<Expense>>;

    fn list_expenses(&self) -> StorageResult<Vec<Expense>>;

    fn find_expense(&self, id: &str) -> StorageResult<Option<Expense>>;

    fn insert_expense(&self, expense: &Expense) -> StorageResult<()>;

    /// Replace an existing expense. `NotFound` if it does not exist.
    fn update_expense(&self, expense: &Expense) -> StorageResult<()>;

    /// Remove an expense, returning it if it existed.
    fn delete_expense(&self, id: &str) -> StorageResult<Option<Expense>>;
}

/// Durable record of issued refresh tokens.
///
/// Records are written at login and never removed; there is no revocation.
pub trait TokenLedger {
    fn record(&self, record: &RefreshRecord) -> StorageResult<()>;

    fn find_by_subject(&self, subject_id: &str) -> StorageResult<Vec<RefreshRecord>>;
}

/// Everything the service needs from persistence.
pub trait Store: UserStore + ExpenseStore + TokenLedger + Send + Sync {
    /// Cheap probe used by the readiness endpoint.
    fn health_check(&self) -> StorageResult<()>;
}

/// Normalized form used for email lookups.
pub(crate) fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Sort expenses oldest first, breaking ties by creation time then id.
pub(crate) fn sort_chronologically(expenses: &mut [Expense]) {
    expenses.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
