//! Service metrics for the fraud model router.
//!
//! Lives in the service layer; the detection pipeline itself keeps no state.

use crate::models::BackendFailure;
use crate::reconcile::ReconciliationReason;
use crate::types::{FraudResult, RiskLevel};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for scored requests
pub struct PipelineMetrics {
    /// Requests that produced a score
    pub requests_processed: AtomicU64,
    /// Requests rejected as structurally invalid
    pub requests_rejected: AtomicU64,
    /// Requests refused while the kill switch was engaged
    pub requests_disabled: AtomicU64,
    /// Scored requests that ran without similar patterns
    pub empty_retrievals: AtomicU64,
    results_by_level: RwLock<HashMap<RiskLevel, u64>>,
    outcomes: RwLock<HashMap<ReconciliationReason, u64>>,
    backends: RwLock<HashMap<String, BackendStats>>,
    /// Processing times in milliseconds
    processing_times: RwLock<Vec<u64>>,
    /// Fraud score distribution over 0-100 in steps of 10
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

/// Answer and failure counts for one backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub successes: u64,
    pub failures: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            requests_disabled: AtomicU64::new(0),
            empty_retrievals: AtomicU64::new(0),
            results_by_level: RwLock::new(HashMap::new()),
            outcomes: RwLock::new(HashMap::new()),
            backends: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored request, the backend that answered (if any) and the
    /// backends that failed before it
    pub fn record_result(&self, result: &FraudResult, answered_by: Option<&str>, failures: &[BackendFailure]) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);

        if result.similar_patterns_count == 0 {
            self.empty_retrievals.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(result.processing_time_ms);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = ((result.fraud_score / 10.0) as usize).min(9);
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut by_level) = self.results_by_level.write() {
            *by_level.entry(result.risk_level).or_insert(0) += 1;
        }

        if let Ok(mut outcomes) = self.outcomes.write() {
            *outcomes.entry(result.reconciliation).or_insert(0) += 1;
        }

        if let Ok(mut backends) = self.backends.write() {
            for failure in failures {
                backends.entry(failure.backend_id.clone()).or_default().failures += 1;
            }
            if let Some(backend) = answered_by {
                backends.entry(backend.to_string()).or_default().successes += 1;
            }
        }
    }

    pub fn record_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disabled(&self) {
        self.requests_disabled.fetch_add(1, Ordering::Relaxed);
    }

    /// Processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_ms: sum / count as u64,
            p50_ms: at(0.50),
            p95_ms: at(0.95),
            p99_ms: at(0.99),
            max_ms: sorted[count - 1],
        }
    }

    /// Requests per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.requests_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or_default()
    }

    pub fn get_results_by_level(&self) -> HashMap<RiskLevel, u64> {
        self.results_by_level.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn get_outcomes(&self) -> HashMap<ReconciliationReason, u64> {
        self.outcomes.read().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn get_backend_stats(&self) -> HashMap<String, BackendStats> {
        self.backends.read().map(|m| m.clone()).unwrap_or_default()
    }

    /// Log a summary of all metrics
    pub fn print_summary(&self) {
        let processed = self.requests_processed.load(Ordering::Relaxed);
        let rejected = self.requests_rejected.load(Ordering::Relaxed);
        let disabled = self.requests_disabled.load(Ordering::Relaxed);
        let empty = self.empty_retrievals.load(Ordering::Relaxed);

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let by_level = self.get_results_by_level();
        let outcomes = self.get_outcomes();
        let score_dist = self.get_score_distribution();
        let pct = |n: u64| {
            if processed > 0 {
                (n as f64 / processed as f64) * 100.0
            } else {
                0.0
            }
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║             FRAUD MODEL ROUTER - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Requests Scored: {:>8}  │  Throughput: {:>6.1} req/s        ║",
            processed, throughput
        );
        info!(
            "║ Rejected: {:>6}  │  Disabled: {:>6}  │  No context: {:>5.1}% ║",
            rejected,
            disabled,
            pct(empty)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (ms): mean={:>6} p50={:>6} p95={:>6} p99={:>6} ║",
            processing.mean_ms, processing.p50_ms, processing.p95_ms, processing.p99_ms
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Results by Risk Level:                                       ║");
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical] {
            let count = by_level.get(&level).copied().unwrap_or(0);
            info!("║   {:10}: {:>6} ({:>5.1}%)                                ║", level.as_str(), count, pct(count));
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Reconciliation Outcomes:                                     ║");
        let mut outcomes: Vec<_> = outcomes.into_iter().collect();
        outcomes.sort_by(|a, b| b.1.cmp(&a.1));
        for (reason, count) in outcomes {
            info!("║   {:22}: {:>6} ({:>5.1}%)                    ║", reason.as_str(), count, pct(count));
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Score Distribution:                                    ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            let share = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((share / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:<3}: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                share,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let backends = self.get_backend_stats();
        if !backends.is_empty() {
            info!("Model Backends:");
            let mut backends: Vec<_> = backends.into_iter().collect();
            backends.sort_by(|a, b| a.0.cmp(&b.0));
            for (backend, stats) in backends {
                info!("  {}: answered={} failed={}", backend, stats.successes, stats.failures);
            }
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

/// Periodic metrics summary task
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;

    fn result(score: f64, model_used: &str, reason: ReconciliationReason, patterns: usize) -> FraudResult {
        FraudResult::new(score, "test".to_string(), model_used.to_string())
            .with_context(patterns, reason)
            .with_processing_time(score as u64 * 10)
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();
        let failure = BackendFailure {
            backend_id: "primary".to_string(),
            error: ProviderError::RateLimited,
        };

        metrics.record_result(
            &result(92.0, "secondary", ReconciliationReason::ModelAccepted, 3),
            Some("secondary"),
            &[failure],
        );
        metrics.record_result(
            &result(15.0, "rule-based-fallback", ReconciliationReason::ModelUnavailable, 0),
            None,
            &[],
        );
        metrics.record_rejected();

        assert_eq!(metrics.requests_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.empty_retrievals.load(Ordering::Relaxed), 1);

        let dist = metrics.get_score_distribution();
        assert_eq!(dist[9], 1);
        assert_eq!(dist[1], 1);

        let by_level = metrics.get_results_by_level();
        assert_eq!(by_level.get(&RiskLevel::Critical), Some(&1));
        assert_eq!(by_level.get(&RiskLevel::Low), Some(&1));

        let backends = metrics.get_backend_stats();
        assert_eq!(backends["primary"], BackendStats { successes: 0, failures: 1 });
        assert_eq!(backends["secondary"], BackendStats { successes: 1, failures: 0 });
        assert!(!backends.contains_key("rule-based-fallback"));

        assert_eq!(metrics.get_outcomes().get(&ReconciliationReason::ModelUnavailable), Some(&1));
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for score in [10.0, 20.0, 30.0, 100.0] {
            metrics.record_result(&result(score, "m", ReconciliationReason::ModelAccepted, 1), Some("m"), &[]);
        }
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.max_ms, 1000);
        assert_eq!(stats.mean_ms, 400);
        assert_eq!(metrics.get_score_distribution()[9], 1);
    }
}
