//! In-memory persistence with the two primitives the engine needs:
//! atomic create-if-absent and per-key optimistic (versioned) updates.
//!
//! Every access is bounded by a deadline; hitting it surfaces
//! `StoreTimeout`, never a silent success or failure. Records are cloned
//! out so callers never hold the lock while computing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::error::EngineError;

/// A stored record plus its write version. Versions start at 1 on insert
/// and increment on every successful put.
#[derive(Clone, Debug)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

#[derive(Clone)]
pub struct KvStore<K, V> {
    inner: Arc<RwLock<HashMap<K, Versioned<V>>>>,
    op_timeout: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> KvStore<K, V> {
    pub fn new(op_timeout: Duration) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), op_timeout }
    }

    pub async fn read(&self, key: &K) -> Result<Option<Versioned<V>>, EngineError> {
        let guard = timeout(self.op_timeout, self.inner.read())
            .await
            .map_err(|_| EngineError::StoreTimeout)?;
        Ok(guard.get(key).cloned())
    }

    /// Insert `record` only if `key` is absent. Returns the row now stored
    /// under the key and whether this call created it. The loser of a race
    /// gets `(winner_row, false)` and must discard its own computation.
    pub async fn create_if_absent(&self, key: K, record: V) -> Result<(Versioned<V>, bool), EngineError> {
        let mut guard = timeout(self.op_timeout, self.inner.write())
            .await
            .map_err(|_| EngineError::StoreTimeout)?;
        if let Some(existing) = guard.get(&key) {
            return Ok((existing.clone(), false));
        }
        let row = Versioned { version: 1, record };
        guard.insert(key, row.clone());
        Ok((row, true))
    }

    /// Optimistic put: succeeds only if the stored version still equals
    /// `expected_version` (0 for an absent key). On mismatch returns
    /// `TransientStoreConflict`; the caller owns the retry policy.
    pub async fn compare_and_put(
        &self,
        key: K,
        expected_version: u64,
        record: V,
    ) -> Result<Versioned<V>, EngineError> {
        let mut guard = timeout(self.op_timeout, self.inner.write())
            .await
            .map_err(|_| EngineError::StoreTimeout)?;
        let current = guard.get(&key).map(|v| v.version).unwrap_or(0);
        if current != expected_version {
            return Err(EngineError::TransientStoreConflict);
        }
        let row = Versioned { version: expected_version + 1, record };
        guard.insert(key, row.clone());
        Ok(row)
    }

    /// Snapshot of all records. Read-only projections (history) only.
    pub async fn scan(&self) -> Result<Vec<(K, V)>, EngineError> {
        let guard = timeout(self.op_timeout, self.inner.read())
            .await
            .map_err(|_| EngineError::StoreTimeout)?;
        Ok(guard.iter().map(|(k, v)| (k.clone(), v.record.clone())).collect())
    }
}
