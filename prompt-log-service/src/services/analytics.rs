//! Usage analytics over the interaction log.
//!
//! A snapshot is assembled from five independent store reads issued
//! concurrently. They are not run inside one transaction, so a record landing
//! mid-computation may be visible to some sub-queries and not others. Any
//! failed read fails the whole snapshot; partial snapshots are never returned.

use crate::error::StorageError;
use crate::models::{DailyCount, MetricsSnapshot, PromptFrequency, PromptInteraction};
use crate::services::log_store::InteractionStore;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Number of most recent active dates reported.
pub const DAY_BUCKETS: i64 = 7;

/// Number of most frequent prompts reported.
pub const TOP_PROMPTS: i64 = 5;

/// Number of slowest interactions reported.
pub const SLOWEST_PROMPTS: i64 = 5;

/// Builds [`MetricsSnapshot`]s from an interaction store.
#[derive(Clone)]
pub struct AnalyticsAggregator {
    store: Arc<dyn InteractionStore>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self { store }
    }

    /// Compute a fresh snapshot.
    #[instrument(skip(self))]
    pub async fn compute_metrics(&self) -> Result<MetricsSnapshot, StorageError> {
        let started = Instant::now();

        let (total_prompts, avg_latency, prompts_per_day, top_prompts, slowest_prompts) =
            tokio::try_join!(
                self.store.count(),
                self.store.average_latency(),
                self.store.count_per_day(DAY_BUCKETS),
                self.store.top_prompts(TOP_PROMPTS),
                self.store.slowest(SLOWEST_PROMPTS),
            )
            .map_err(|e| {
                tracing::error!(error = %e, "Metrics snapshot failed");
                e
            })?;

        let snapshot = MetricsSnapshot {
            total_prompts,
            avg_latency,
            prompts_per_day: rank_days(prompts_per_day),
            top_prompts: rank_prompts(top_prompts),
            slowest_prompts: rank_slowest(slowest_prompts),
        };

        tracing::debug!(
            total_prompts = snapshot.total_prompts,
            active_days = snapshot.prompts_per_day.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Metrics snapshot computed"
        );

        Ok(snapshot)
    }
}

fn cap(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

// Stores are expected to return rows already ranked; these re-apply the
// ordering and caps so every backend yields the same snapshot shape. Sorts are
// stable, so the store's tie order survives.

fn rank_days(mut days: Vec<DailyCount>) -> Vec<DailyCount> {
    days.retain(|d| d.count > 0);
    days.sort_by_key(|d| Reverse(d.date));
    days.dedup_by_key(|d| d.date);
    days.truncate(cap(DAY_BUCKETS));
    days
}

fn rank_prompts(mut prompts: Vec<PromptFrequency>) -> Vec<PromptFrequency> {
    prompts.sort_by_key(|p| Reverse(p.count));
    prompts.truncate(cap(TOP_PROMPTS));
    prompts
}

fn rank_slowest(mut rows: Vec<PromptInteraction>) -> Vec<PromptInteraction> {
    rows.retain(|r| r.latency_ms.is_some());
    rows.sort_by_key(|r| Reverse(r.latency_ms));
    rows.truncate(cap(SLOWEST_PROMPTS));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewInteraction;
    use crate::services::log_store::InMemoryInteractionStore;
    use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};

    fn record(prompt: &str, latency_ms: Option<i64>, regenerated: bool) -> NewInteraction {
        NewInteraction {
            prompt: prompt.to_string(),
            response: format!("re: {}", prompt),
            model: "gpt-4o-mini".to_string(),
            regenerated,
            latency_ms,
        }
    }

    fn aggregator() -> (AnalyticsAggregator, Arc<InMemoryInteractionStore>) {
        let store = Arc::new(InMemoryInteractionStore::new());
        (AnalyticsAggregator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn worked_example() {
        let (aggregator, store) = aggregator();
        store.append(&record("A", Some(100), false)).await.unwrap();
        store.append(&record("B", Some(300), false)).await.unwrap();
        store.append(&record("A", Some(200), true)).await.unwrap();

        let snapshot = aggregator.compute_metrics().await.unwrap();

        assert_eq!(snapshot.total_prompts, 3);
        assert_eq!(snapshot.avg_latency, Some(200.0));
        assert_eq!(
            snapshot.top_prompts[0],
            PromptFrequency {
                prompt: "A".to_string(),
                count: 2
            }
        );
        assert_eq!(snapshot.slowest_prompts[0].prompt, "B");
        assert_eq!(snapshot.slowest_prompts[0].latency_ms, Some(300));
        assert_eq!(snapshot.prompts_per_day.len(), 1);
        assert_eq!(snapshot.prompts_per_day[0].count, 3);
    }

    #[tokio::test]
    async fn empty_log_has_no_average() {
        let (aggregator, _) = aggregator();
        let snapshot = aggregator.compute_metrics().await.unwrap();

        assert_eq!(snapshot.total_prompts, 0);
        assert_eq!(snapshot.avg_latency, None);
        assert!(snapshot.prompts_per_day.is_empty());
        assert!(snapshot.top_prompts.is_empty());
        assert!(snapshot.slowest_prompts.is_empty());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["avgLatency"].is_null());
    }

    #[tokio::test]
    async fn untimed_records_are_counted_but_not_averaged_or_ranked() {
        let (aggregator, store) = aggregator();
        store.append(&record("x", None, false)).await.unwrap();
        store.append(&record("y", None, false)).await.unwrap();

        let snapshot = aggregator.compute_metrics().await.unwrap();
        assert_eq!(snapshot.total_prompts, 2);
        assert_eq!(snapshot.avg_latency, None);
        assert!(snapshot.slowest_prompts.is_empty());
    }

    #[tokio::test]
    async fn per_day_lists_seven_most_recent_active_dates() {
        let (aggregator, store) = aggregator();
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        // Activity every other day for 20 days, two records per active day.
        for offset in (0..20).step_by(2) {
            let at = start + ChronoDuration::days(offset);
            store.append_at(&record("p", None, false), at).await.unwrap();
            store.append_at(&record("q", None, false), at).await.unwrap();
        }

        let days = aggregator.compute_metrics().await.unwrap().prompts_per_day;
        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 3, 19).unwrap());
        assert_eq!(days[6].date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert!(days.windows(2).all(|w| w[0].date > w[1].date));
        assert!(days.iter().all(|d| d.count == 2));
    }

    #[tokio::test]
    async fn rankings_are_capped_and_descending() {
        let (aggregator, store) = aggregator();
        for i in 0..8i64 {
            for _ in 0..=i {
                store
                    .append(&record(&format!("prompt-{}", i), Some(i * 10), false))
                    .await
                    .unwrap();
            }
        }

        let snapshot = aggregator.compute_metrics().await.unwrap();

        assert_eq!(snapshot.top_prompts.len(), 5);
        assert_eq!(snapshot.top_prompts[0].prompt, "prompt-7");
        assert!(snapshot
            .top_prompts
            .windows(2)
            .all(|w| w[0].count > w[1].count));

        assert_eq!(snapshot.slowest_prompts.len(), 5);
        assert!(snapshot
            .slowest_prompts
            .iter()
            .all(|r| r.latency_ms == Some(70)));
    }

    #[tokio::test]
    async fn tie_order_is_stable_across_snapshots() {
        let (aggregator, store) = aggregator();
        for prompt in ["delta", "alpha", "charlie", "bravo"] {
            store.append(&record(prompt, None, false)).await.unwrap();
        }

        let first = aggregator.compute_metrics().await.unwrap().top_prompts;
        let second = aggregator.compute_metrics().await.unwrap().top_prompts;
        assert_eq!(first, second);
        assert_eq!(first[0].prompt, "alpha");
    }

    #[tokio::test]
    async fn read_failure_fails_the_snapshot() {
        let (aggregator, store) = aggregator();
        store.append(&record("A", Some(1), false)).await.unwrap();
        store.set_fail_reads(true);

        assert!(matches!(
            aggregator.compute_metrics().await,
            Err(StorageError::ReadFailed(_))
        ));
    }

    #[test]
    fn ranking_restores_order_from_unordered_input() {
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let days = rank_days(vec![
            DailyCount { date: day(2), count: 1 },
            DailyCount { date: day(9), count: 4 },
            DailyCount { date: day(5), count: 2 },
        ]);
        assert_eq!(
            days.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![day(9), day(5), day(2)]
        );

        let prompts = rank_prompts(vec![
            PromptFrequency { prompt: "x".into(), count: 1 },
            PromptFrequency { prompt: "y".into(), count: 3 },
            PromptFrequency { prompt: "z".into(), count: 3 },
        ]);
        assert_eq!(
            prompts.iter().map(|p| p.prompt.as_str()).collect::<Vec<_>>(),
            vec!["y", "z", "x"]
        );
    }
}
