//! Per-user statistics aggregation.
//!
//! `record` is invoked by the attempt ledger exactly once per terminal
//! outcome; this store does not deduplicate. Streak rules:
//!   - correct and yesterday was the last result day → streak + 1
//!   - correct otherwise (first result or gap) → streak = 1
//!   - incorrect → streak = 0
//! The last-result date always advances: both a win and a loss count as
//! "played". Accuracy is derived on read, never stored.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::domain::UserStats;
use crate::error::EngineError;
use crate::store::KvStore;

pub struct StatsStore {
    users: KvStore<String, UserStats>,
    retry_cap: u32,
}

impl StatsStore {
    pub fn new(op_timeout: Duration, retry_cap: u32) -> Self {
        Self { users: KvStore::new(op_timeout), retry_cap }
    }

    /// Read-only projection. A user with no terminal results yet gets the
    /// zeroed default.
    pub async fn get(&self, user_id: &str) -> Result<UserStats, EngineError> {
        Ok(self
            .users
            .read(&user_id.to_string())
            .await?
            .map(|v| v.record)
            .unwrap_or_default())
    }

    /// Fold one terminal outcome into the user's stats.
    #[instrument(level = "info", skip(self), fields(%user_id, %date, is_correct))]
    pub async fn record(
        &self,
        user_id: &str,
        date: NaiveDate,
        is_correct: bool,
        category: &str,
        format: &str,
        entity_code: &str,
    ) -> Result<UserStats, EngineError> {
        let key = user_id.to_string();

        for _ in 0..=self.retry_cap {
            let (version, mut stats) = match self.users.read(&key).await? {
                Some(v) => (v.version, v.record),
                None => (0, UserStats::default()),
            };

            if is_correct {
                if stats.last_result_date == date.pred_opt() {
                    stats.current_streak += 1;
                } else {
                    // First result ever, or a gap in days.
                    stats.current_streak = 1;
                }
                stats.longest_streak = stats.longest_streak.max(stats.current_streak);
                stats.total_correct += 1;
            } else {
                stats.current_streak = 0;
                if !stats.missed_entities.iter().any(|c| c == entity_code) {
                    stats.missed_entities.push(entity_code.to_string());
                }
            }
            stats.last_result_date = Some(date);

            let cat = stats.category_breakdown.entry(category.to_string()).or_default();
            cat.total += 1;
            if is_correct {
                cat.correct += 1;
            }
            let fmt = stats.format_breakdown.entry(format.to_string()).or_default();
            fmt.total += 1;
            if is_correct {
                fmt.correct += 1;
            }

            match self.users.compare_and_put(key.clone(), version, stats).await {
                Ok(row) => {
                    info!(target: "stats", %user_id, streak = row.record.current_streak, total_correct = row.record.total_correct, "Stats updated");
                    return Ok(row.record);
                }
                Err(EngineError::TransientStoreConflict) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(EngineError::TransientStoreConflict)
    }
}
