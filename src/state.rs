// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::auth::CredentialCodec;
use crate::clock::Clock;
use crate::config::TokenConfig;
use crate::storage::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub codec: Arc<CredentialCodec>,
    pub budget_locks: Arc<BudgetLocks>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: &TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            codec: Arc::new(CredentialCodec::new(tokens, clock)),
            budget_locks: Arc::new(BudgetLocks::default()),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(
            Arc::new(crate::storage::InMemoryStore::new()),
            &TokenConfig::new("test-access-secret", "test-refresh-secret"),
            Arc::new(crate::clock::SystemClock),
        )
    }
}

/// Per-user serialization of budget-gated writes.
///
/// Holding a user's guard across read-total, check and insert means two
/// concurrent writes cannot both pass against the same stale total.
#[derive(Default)]
pub struct BudgetLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl BudgetLocks {
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on can go.
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_writes_are_serialized() {
        let locks = Arc::new(BudgetLocks::default());
        let guard = locks.lock("u1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("u1").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = BudgetLocks::default();
        let _alice = locks.lock("alice").await;
        let _bob = locks.lock("bob").await;
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = BudgetLocks::default();
        drop(locks.lock("u1").await);
        drop(locks.lock("u2").await);
        assert_eq!(locks.locks.lock().unwrap().len(), 1);
    }
}
