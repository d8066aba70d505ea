// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized User
//! - `user_email_index`: lowercase email → user_id
//! - `expenses`: expense_id → serialized Expense
//! - `expense_user_index`: composite key (user_id|expense_id) → ()
//! - `refresh_tokens`: composite key (subject_id|created_at_be|uuid) → serialized RefreshRecord
//!
//! Every mutating call runs in a single write transaction, so a user and its
//! email index entry (or an expense and its index entry) never diverge.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;

use super::{
    email_key, sort_chronologically, ExpenseStore, StorageError, StorageResult, Store, TokenLedger,
    UserStore,
};
use crate::models::{Expense, RefreshRecord, User};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const USER_EMAIL_INDEX: TableDefinition<&str, &str> = TableDefinition::new("user_email_index");

const EXPENSES: TableDefinition<&str, &[u8]> = TableDefinition::new("expenses");

/// Key format: `user_id | 0x00 | expense_id`.
const EXPENSE_USER_INDEX: TableDefinition<&[u8], ()> = TableDefinition::new("expense_user_index");

/// Key format: `subject_id | 0x00 | created_at_millis_be | uuid`.
const REFRESH_TOKENS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("refresh_tokens");

const SEPARATOR: u8 = 0x00;

// =============================================================================
// Key Helpers
// =============================================================================

fn owner_prefix(owner: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + 1);
    key.extend_from_slice(owner.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Exclusive upper bound for a prefix scan.
fn owner_prefix_end(owner: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + 1);
    key.extend_from_slice(owner.as_bytes());
    key.push(SEPARATOR + 1);
    key
}

fn expense_index_key(user_id: &str, expense_id: &str) -> Vec<u8> {
    let mut key = owner_prefix(user_id);
    key.extend_from_slice(expense_id.as_bytes());
    key
}

/// The big-endian timestamp keeps a subject's records in issue order. Tokens
/// minted in the same second are byte-identical, so a random suffix keeps
/// every issuance as its own row.
fn refresh_key(record: &RefreshRecord) -> Vec<u8> {
    let mut key = owner_prefix(&record.subject_id);
    key.extend_from_slice(&record.created_at.timestamp_millis().to_be_bytes());
    key.extend_from_slice(uuid::Uuid::new_v4().as_bytes());
    key
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

// =============================================================================
// RedbStore
// =============================================================================

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAIL_INDEX)?;
            let _ = write_txn.open_table(EXPENSES)?;
            let _ = write_txn.open_table(EXPENSE_USER_INDEX)?;
            let _ = write_txn.open_table(REFRESH_TOKENS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }
}

impl UserStore for RedbStore {
    fn find_user_by_id(&self, id: &str) -> StorageResult<Option<User>> {
        self.get_user(id)
    }

    fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let user_id = {
            let read_txn = self.db.begin_read()?;
            let index = read_txn.open_table(USER_EMAIL_INDEX)?;
            match index.get(email_key(email).as_str())? {
                Some(value) => value.value().to_string(),
                None => return Ok(None),
            }
        };
        self.get_user(&user_id)
    }

    fn save_user(&self, user: &User) -> StorageResult<()> {
        let json = serde_json::to_vec(user)?;
        let key = email_key(&user.email);

        let write_txn = self.db.begin_write()?;
        {
            let mut index = write_txn.open_table(USER_EMAIL_INDEX)?;
            let owner = index.get(key.as_str())?.map(|v| v.value().to_string());
            if let Some(owner) = owner {
                if owner != user.id {
                    // Dropping the transaction without commit aborts it.
                    return Err(StorageError::AlreadyExists(format!(
                        "User with email {}",
                        user.email
                    )));
                }
            }

            let mut users = write_txn.open_table(USERS)?;
            let previous: Option<User> = match users.get(user.id.as_str())? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            if let Some(previous) = previous {
                let previous_key = email_key(&previous.email);
                if previous_key != key {
                    index.remove(previous_key.as_str())?;
                }
            }

            users.insert(user.id.as_str(), json.as_slice())?;
            index.insert(key.as_str(), user.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_users(&self) -> StorageResult<Vec<User>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        let mut users = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            users.push(decode::<User>(value.value())?);
        }
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }
}

impl ExpenseStore for RedbStore {
    fn find_expenses_by_user(&self, user_id: &str) -> StorageResult<Vec<Expense>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(EXPENSE_USER_INDEX)?;
        let expenses_table = read_txn.open_table(EXPENSES)?;

        let start = owner_prefix(user_id);
        let end = owner_prefix_end(user_id);
        let mut expenses = Vec::new();
        for entry in index.range(start.as_slice()..end.as_slice())? {
            let (key, _) = entry?;
            let Ok(expense_id) = std::str::from_utf8(&key.value()[start.len()..]) else {
                continue;
            };
            if let Some(value) = expenses_table.get(expense_id)? {
                expenses.push(decode::<Expense>(value.value())?);
            }
        }
        sort_chronologically(&mut expenses);
        Ok(expenses)
    }

    fn list_expenses(&self) -> StorageResult<Vec<Expense>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXPENSES)?;
        let mut expenses = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            expenses.push(decode::<Expense>(value.value())?);
        }
        sort_chronologically(&mut expenses);
        Ok(expenses)
    }

    fn find_expense(&self, id: &str) -> StorageResult<Option<Expense>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXPENSES)?;
        match table.get(id)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn insert_expense(&self, expense: &Expense) -> StorageResult<()> {
        let json = serde_json::to_vec(expense)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EXPENSES)?;
            if table.get(expense.id.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(format!("Expense {}", expense.id)));
            }
            table.insert(expense.id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(EXPENSE_USER_INDEX)?;
            let key = expense_index_key(&expense.user_id, &expense.id);
            index.insert(key.as_slice(), ())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn update_expense(&self, expense: &Expense) -> StorageResult<()> {
        let json = serde_json::to_vec(expense)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EXPENSES)?;
            let previous: Expense = match table.get(expense.id.as_str())? {
                Some(value) => decode(value.value())?,
                None => return Err(StorageError::NotFound(format!("Expense {}", expense.id))),
            };
            table.insert(expense.id.as_str(), json.as_slice())?;

            if previous.user_id != expense.user_id {
                let mut index = write_txn.open_table(EXPENSE_USER_INDEX)?;
                let old_key = expense_index_key(&previous.user_id, &previous.id);
                index.remove(old_key.as_slice())?;
                let new_key = expense_index_key(&expense.user_id, &expense.id);
                index.insert(new_key.as_slice(), ())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_expense(&self, id: &str) -> StorageResult<Option<Expense>> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(EXPENSES)?;
            let removed: Option<Expense> = match table.remove(id)? {
                Some(value) => Some(decode(value.value())?),
                None => None,
            };
            if let Some(expense) = &removed {
                let mut index = write_txn.open_table(EXPENSE_USER_INDEX)?;
                let key = expense_index_key(&expense.user_id, &expense.id);
                index.remove(key.as_slice())?;
            }
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}

impl TokenLedger for RedbStore {
    fn record(&self, record: &RefreshRecord) -> StorageResult<()> {
        let json = serde_json::to_vec(record)?;
        let key = refresh_key(record);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REFRESH_TOKENS)?;
            table.insert(key.as_slice(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn find_by_subject(&self, subject_id: &str) -> StorageResult<Vec<RefreshRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REFRESH_TOKENS)?;
        let start = owner_prefix(subject_id);
        let end = owner_prefix_end(subject_id);
        let mut records = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = entry?;
            records.push(decode::<RefreshRecord>(value.value())?);
        }
        Ok(records)
    }
}

impl Store for RedbStore {
    fn health_check(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(USERS)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateExpenseRequest;
    use chrono::{Duration, TimeZone, Utc};

    fn temp_db() -> (RedbStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = RedbStore::open(&dir.path().join("test.redb")).unwrap();
        (db, dir)
    }

    fn expense(user_id: &str, amount: f64, day: u32) -> Expense {
        CreateExpenseRequest {
            user_id: user_id.to_string(),
            amount,
            category: "Travel".to_string(),
            note: Some("train".to_string()),
            date: Some(Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()),
        }
        .into_expense()
    }

    #[test]
    fn user_round_trip_and_email_index() {
        let (db, _dir) = temp_db();
        let user = User::new("Alice", "alice@example.com", "hash");
        db.save_user(&user).unwrap();

        assert_eq!(db.find_user_by_id(&user.id).unwrap(), Some(user.clone()));
        assert_eq!(db.find_user_by_email("ALICE@example.com").unwrap(), Some(user));
        assert!(db.find_user_by_email("bob@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected_without_side_effects() {
        let (db, _dir) = temp_db();
        db.save_user(&User::new("Alice", "a@x.com", "hash")).unwrap();

        let intruder = User::new("Mallory", "a@x.com", "hash");
        assert!(matches!(db.save_user(&intruder), Err(StorageError::AlreadyExists(_))));
        assert!(db.find_user_by_id(&intruder.id).unwrap().is_none());
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn email_change_moves_index_entry() {
        let (db, _dir) = temp_db();
        let mut user = User::new("Alice", "a@x.com", "hash");
        db.save_user(&user).unwrap();

        user.email = "alice@x.com".to_string();
        db.save_user(&user).unwrap();

        assert!(db.find_user_by_email("a@x.com").unwrap().is_none());
        assert_eq!(db.find_user_by_email("alice@x.com").unwrap().unwrap().id, user.id);
        // The old address is free again.
        db.save_user(&User::new("Other", "a@x.com", "hash")).unwrap();
    }

    #[test]
    fn expenses_by_user_use_the_index() {
        let (db, _dir) = temp_db();
        let late = expense("u1", 30.0, 20);
        let early = expense("u1", 10.0, 2);
        let foreign = expense("u10", 99.0, 5);
        db.insert_expense(&late).unwrap();
        db.insert_expense(&early).unwrap();
        db.insert_expense(&foreign).unwrap();

        assert_eq!(db.find_expenses_by_user("u1").unwrap(), vec![early, late]);
        assert_eq!(db.find_expenses_by_user("u10").unwrap(), vec![foreign]);
        assert!(db.find_expenses_by_user("u").unwrap().is_empty());
        assert_eq!(db.list_expenses().unwrap().len(), 3);
    }

    #[test]
    fn update_and_delete_keep_index_consistent() {
        let (db, _dir) = temp_db();
        let mut item = expense("u1", 10.0, 1);
        db.insert_expense(&item).unwrap();
        assert!(matches!(db.insert_expense(&item), Err(StorageError::AlreadyExists(_))));

        item.amount = 12.5;
        db.update_expense(&item).unwrap();
        assert_eq!(db.find_expense(&item.id).unwrap().unwrap().amount, 12.5);

        assert_eq!(db.delete_expense(&item.id).unwrap(), Some(item.clone()));
        assert!(db.find_expenses_by_user("u1").unwrap().is_empty());
        assert!(db.delete_expense(&item.id).unwrap().is_none());
        assert!(matches!(db.update_expense(&item), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn refresh_ledger_in_issue_order() {
        let (db, _dir) = temp_db();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        for (offset, token) in [(2, "second"), (1, "first")] {
            let created_at = base + Duration::minutes(offset);
            db.record(&RefreshRecord {
                subject_id: "u1".to_string(),
                token_value: token.to_string(),
                expires_at: created_at + Duration::days(7),
                created_at,
            })
            .unwrap();
        }

        let tokens: Vec<String> =
            db.find_by_subject("u1").unwrap().into_iter().map(|r| r.token_value).collect();
        assert_eq!(tokens, vec!["first", "second"]);
        assert!(db.find_by_subject("u2").unwrap().is_empty());
    }

    #[test]
    fn identical_ledger_records_are_all_kept() {
        let (db, _dir) = temp_db();
        let created_at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let record = RefreshRecord {
            subject_id: "u1".to_string(),
            token_value: "same-second-token".to_string(),
            expires_at: created_at + Duration::days(7),
            created_at,
        };
        db.record(&record).unwrap();
        db.record(&record).unwrap();

        assert_eq!(db.find_by_subject("u1").unwrap(), vec![record.clone(), record]);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.redb");
        let user = User::new("Alice", "a@x.com", "hash");
        {
            let db = RedbStore::open(&path).unwrap();
            db.save_user(&user).unwrap();
        }
        let db = RedbStore::open(&path).unwrap();
        db.health_check().unwrap();
        assert_eq!(db.find_user_by_email("a@x.com").unwrap(), Some(user));
    }
}
