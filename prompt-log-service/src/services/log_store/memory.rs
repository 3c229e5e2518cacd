//! In-process interaction log for tests and local development.

use super::InteractionStore;
use crate::error::StorageError;
use crate::models::{DailyCount, NewInteraction, PromptFrequency, PromptInteraction};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
#[cfg(test)]
use chrono::DateTime;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Log {
    last_id: i64,
    rows: Vec<PromptInteraction>,
}

/// Interaction log held in memory, with the same ordering rules as the
/// PostgreSQL store. Reads and writes can be made to fail for tests.
#[derive(Default)]
pub struct InMemoryInteractionStore {
    log: RwLock<Log>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent append fail with `WriteFailed`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent read fail with `ReadFailed`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Append with an explicit timestamp, for seeding history in tests.
    #[cfg(test)]
    pub(crate) async fn append_at(
        &self,
        record: &NewInteraction,
        created_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(anyhow::anyhow!("in-memory store rejected write")));
        }

        let mut log = self.log.write().await;
        log.last_id += 1;
        let id = log.last_id;
        log.rows.push(record.clone().into_interaction(id, created_at));
        Ok(id)
    }

    /// Snapshot of every record in insertion order.
    pub async fn all(&self) -> Vec<PromptInteraction> {
        self.log.read().await.rows.clone()
    }

    fn check_read(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFailed(anyhow::anyhow!("in-memory store rejected read")));
        }
        Ok(())
    }
}

fn take(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn append(&self, record: &NewInteraction) -> Result<i64, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(anyhow::anyhow!("in-memory store rejected write")));
        }

        let mut log = self.log.write().await;
        // Keep created_at non-decreasing with id even if the wall clock steps back.
        let now = Utc::now();
        let created_at = log
            .rows
            .last()
            .map_or(now, |last| last.created_at.max(now));
        log.last_id += 1;
        let id = log.last_id;
        log.rows.push(record.clone().into_interaction(id, created_at));
        Ok(id)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<PromptInteraction>, StorageError> {
        self.check_read()?;
        let mut rows = self.log.read().await.rows.clone();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(take(limit));
        Ok(rows)
    }

    async fn count(&self) -> Result<i64, StorageError> {
        self.check_read()?;
        Ok(self.log.read().await.rows.len() as i64)
    }

    async fn average_latency(&self) -> Result<Option<f64>, StorageError> {
        self.check_read()?;
        let log = self.log.read().await;
        let latencies: Vec<i64> = log.rows.iter().filter_map(|r| r.latency_ms).collect();
        if latencies.is_empty() {
            return Ok(None);
        }
        let sum: i64 = latencies.iter().sum();
        Ok(Some(sum as f64 / latencies.len() as f64))
    }

    async fn count_per_day(&self, limit: i64) -> Result<Vec<DailyCount>, StorageError> {
        self.check_read()?;
        let log = self.log.read().await;
        let mut per_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for row in &log.rows {
            *per_day.entry(row.created_at.date_naive()).or_default() += 1;
        }
        Ok(per_day
            .into_iter()
            .rev()
            .take(take(limit))
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }

    async fn top_prompts(&self, limit: i64) -> Result<Vec<PromptFrequency>, StorageError> {
        self.check_read()?;
        let log = self.log.read().await;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for row in &log.rows {
            *counts.entry(row.prompt.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<PromptFrequency> = counts
            .into_iter()
            .map(|(prompt, count)| PromptFrequency {
                prompt: prompt.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.prompt.cmp(&b.prompt)));
        ranked.truncate(take(limit));
        Ok(ranked)
    }

    async fn slowest(&self, limit: i64) -> Result<Vec<PromptInteraction>, StorageError> {
        self.check_read()?;
        let log = self.log.read().await;
        let mut rows: Vec<PromptInteraction> = log
            .rows
            .iter()
            .filter(|r| r.latency_ms.is_some())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.latency_ms.cmp(&a.latency_ms).then_with(|| b.id.cmp(&a.id)));
        rows.truncate(take(limit));
        Ok(rows)
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.check_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(prompt: &str, latency_ms: Option<i64>) -> NewInteraction {
        NewInteraction {
            prompt: prompt.to_string(),
            response: format!("answer to {}", prompt),
            model: "gpt-4o-mini".to_string(),
            regenerated: false,
            latency_ms,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, day, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn ids_increase_in_insertion_order() {
        let store = InMemoryInteractionStore::new();
        let first = store.append(&record("a", Some(1))).await.unwrap();
        let second = store.append(&record("b", Some(2))).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn recent_orders_newest_first_and_breaks_ties_by_id() {
        let store = InMemoryInteractionStore::new();
        store.append_at(&record("old", None), at(1, 9)).await.unwrap();
        store.append_at(&record("tie-1", None), at(2, 9)).await.unwrap();
        store.append_at(&record("tie-2", None), at(2, 9)).await.unwrap();

        let prompts: Vec<String> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.prompt)
            .collect();
        assert_eq!(prompts, vec!["tie-2", "tie-1", "old"]);

        assert_eq!(store.recent(2).await.unwrap().len(), 2);
        assert!(store.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn average_ignores_missing_latency() {
        let store = InMemoryInteractionStore::new();
        assert_eq!(store.average_latency().await.unwrap(), None);

        store.append(&record("a", None)).await.unwrap();
        assert_eq!(store.average_latency().await.unwrap(), None);

        store.append(&record("b", Some(100))).await.unwrap();
        store.append(&record("c", Some(201))).await.unwrap();
        assert_eq!(store.average_latency().await.unwrap(), Some(150.5));
    }

    #[tokio::test]
    async fn per_day_counts_keep_only_active_dates() {
        let store = InMemoryInteractionStore::new();
        for day in [1, 1, 3, 10, 10, 10] {
            store.append_at(&record("p", None), at(day, 12)).await.unwrap();
        }

        let days = store.count_per_day(7).await.unwrap();
        assert_eq!(
            days,
            vec![
                DailyCount { date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(), count: 3 },
                DailyCount { date: NaiveDate::from_ymd_opt(2025, 4, 3).unwrap(), count: 1 },
                DailyCount { date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), count: 2 },
            ]
        );
        assert_eq!(store.count_per_day(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn top_prompts_break_ties_alphabetically() {
        let store = InMemoryInteractionStore::new();
        for prompt in ["b", "a", "c", "c", "b"] {
            store.append(&record(prompt, None)).await.unwrap();
        }

        let top = store.top_prompts(5).await.unwrap();
        let ranked: Vec<(&str, i64)> = top.iter().map(|f| (f.prompt.as_str(), f.count)).collect();
        assert_eq!(ranked, vec![("b", 2), ("c", 2), ("a", 1)]);
    }

    #[tokio::test]
    async fn slowest_skips_null_latency() {
        let store = InMemoryInteractionStore::new();
        store.append(&record("fast", Some(5))).await.unwrap();
        store.append(&record("untimed", None)).await.unwrap();
        store.append(&record("slow", Some(500))).await.unwrap();

        let slowest = store.slowest(5).await.unwrap();
        assert_eq!(slowest.len(), 2);
        assert_eq!(slowest[0].prompt, "slow");
        assert_eq!(slowest[1].prompt, "fast");
    }

    #[tokio::test]
    async fn injected_failures_surface_as_storage_errors() {
        let store = InMemoryInteractionStore::new();
        store.set_fail_writes(true);
        assert!(matches!(
            store.append(&record("a", None)).await,
            Err(StorageError::WriteFailed(_))
        ));
        assert_eq!(store.all().await.len(), 0);

        store.set_fail_reads(true);
        assert!(matches!(store.count().await, Err(StorageError::ReadFailed(_))));
    }
}
