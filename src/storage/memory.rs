// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory store.
//!
//! Used when no `DATA_DIR` is configured and throughout the tests. Contents
//! are lost when the process exits.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    email_key, sort_chronologically, ExpenseStore, StorageError, StorageResult, Store, TokenLedger,
    UserStore,
};
use crate::models::{Expense, RefreshRecord, User};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    /// normalized email → user id
    emails: HashMap<String, String>,
    expenses: HashMap<String, Expense>,
    refresh_tokens: Vec<RefreshRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a table half-written, so
    // poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl UserStore for InMemoryStore {
    fn find_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        Ok(self.read().users.get(id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let tables = self.read();
        Ok(tables
            .emails
            .get(&email_key(email))
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    fn save_user(&self, user: &User) -> StorageResult<()> {
        let mut tables = self.write();
        let key = email_key(&user.email);

        if let Some(owner) = tables.emails.get(&key) {
            if owner != &user.id {
                return Err(StorageError::AlreadyExists(format!("User with email {}", user.email)));
            }
        }

        let previous_email = tables.users.get(&user.id).map(|u| email_key(&u.email));
        if let Some(previous) = previous_email {
            if previous != key {
                tables.emails.remove(&previous);
            }
        }

        tables.emails.insert(key, user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn list_users(&self) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = self.read().users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

impl ExpenseStore for InMemoryStore {
    fn find_expenses_by_user(&self, user_id: &str) -> StorageResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .read()
            .expenses
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        sort_chronologically(&mut expenses);
        Ok(expenses)
    }

    fn list_expenses(&self) -> StorageResult<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self.read().expenses.values().cloned().collect();
        sort_chronologically(&mut expenses);
        Ok(expenses)
    }

    fn find_expense(&self, id: &str) -> StorageResult<Option<Expense>> {
        Ok(self.read().expenses.get(id).cloned())
    }

    fn insert_expense(&self, expense: &Expense) -> StorageResult<()> {
        let mut tables = self.write();
        if tables.expenses.contains_key(&expense.id) {
            return Err(StorageError::AlreadyExists(format!("Expense {}", expense.id)));
        }
        tables.expenses.insert(expense.id.clone(), expense.clone());
        Ok(())
    }

    fn update_expense(&self, expense: &Expense) -> StorageResult<()> {
        let mut tables = self.write();
        let Some(slot) = tables.expenses.get_mut(&expense.id) else {
            return Err(StorageError::NotFound(format!("Expense {}", expense.id)));
        };
        *slot = expense.clone();
        Ok(())
    }

    fn delete_expense(&self, id: &str) -> StorageResult<Option<Expense>> {
        Ok(self.write().expenses.remove(id))
    }
}

impl TokenLedger for InMemoryStore {
    fn record(&self, record: &RefreshRecord) -> StorageResult<()> {
        self.write().refresh_tokens.push(record.clone());
        Ok(())
    }

    fn find_by_subject(&self, subject_id: &str) -> StorageResult<Vec<RefreshRecord>> {
        Ok(self
            .read()
            .refresh_tokens
            .iter()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect())
    }
}

impl Store for InMemoryStore {
    fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
