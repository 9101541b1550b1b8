use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

const LATENCY_BUCKET_COUNT: usize = 12;
const LATENCY_BUCKETS_MS: [u64; LATENCY_BUCKET_COUNT] =
    [1, 2, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

#[derive(Clone, Debug, Serialize)]
pub struct LatencySnapshot {
    pub buckets_ms: Vec<u64>,
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub count: u64,
    pub avg_ms: f64,
    pub max_ms: u64,
}

#[derive(Default)]
struct LatencyMetrics {
    buckets: [AtomicU64; LATENCY_BUCKET_COUNT],
    overflow: AtomicU64,
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyMetrics {
    fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);

        match LATENCY_BUCKETS_MS.iter().position(|bucket| ms <= *bucket) {
            Some(idx) => self.buckets[idx].fetch_add(1, Ordering::Relaxed),
            None => self.overflow.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        let avg_ms = if count > 0 {
            total_ms as f64 / count as f64
        } else {
            0.0
        };
        LatencySnapshot {
            buckets_ms: LATENCY_BUCKETS_MS.to_vec(),
            counts: self
                .buckets
                .iter()
                .map(|bucket| bucket.load(Ordering::Relaxed))
                .collect(),
            overflow: self.overflow.load(Ordering::Relaxed),
            count,
            avg_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
        }
    }
}

/// Which latency histogram an engine call lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationClass {
    StartRound,
    CashOut,
    Account,
    Query,
}

#[derive(Clone, Debug, Serialize)]
pub struct LatencyMetricsSnapshot {
    pub start_round: LatencySnapshot,
    pub cash_out: LatencySnapshot,
    pub account: LatencySnapshot,
    pub query: LatencySnapshot,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct LedgerMetricsSnapshot {
    pub rounds_started: u64,
    pub cashouts_paid: u64,
    pub cashouts_crashed: u64,
    pub crash_reports: u64,
    pub stale_rounds_reclaimed: u64,
    pub rounds_reaped: u64,
    pub refunds_issued: u64,
    pub deposits: u64,
    pub withdrawals: u64,
    pub rejections: BTreeMap<String, u64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HttpRejectionsSnapshot {
    pub origin: u64,
    pub body_limit: u64,
    pub rate_limit: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub ledger: LedgerMetricsSnapshot,
    pub latency: LatencyMetricsSnapshot,
    pub http_rejections: HttpRejectionsSnapshot,
}

#[derive(Default)]
pub struct Metrics {
    rounds_started: AtomicU64,
    cashouts_paid: AtomicU64,
    cashouts_crashed: AtomicU64,
    crash_reports: AtomicU64,
    stale_rounds_reclaimed: AtomicU64,
    rounds_reaped: AtomicU64,
    refunds_issued: AtomicU64,
    deposits: AtomicU64,
    withdrawals: AtomicU64,
    rejections: Mutex<BTreeMap<&'static str, u64>>,

    start_round: LatencyMetrics,
    cash_out: LatencyMetrics,
    account: LatencyMetrics,
    query: LatencyMetrics,

    reject_origin: AtomicU64,
    reject_body_limit: AtomicU64,
    reject_rate_limit: AtomicU64,
}

impl Metrics {
    pub fn record_latency(&self, class: OperationClass, duration: Duration) {
        match class {
            OperationClass::StartRound => self.start_round.record(duration),
            OperationClass::CashOut => self.cash_out.record(duration),
            OperationClass::Account => self.account.record(duration),
            OperationClass::Query => self.query.record(duration),
        }
    }

    pub fn inc_rounds_started(&self) {
        self.rounds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cashouts_paid(&self) {
        self.cashouts_paid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cashouts_crashed(&self) {
        self.cashouts_crashed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_crash_reports(&self) {
        self.crash_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale_rounds_reclaimed(&self) {
        self.stale_rounds_reclaimed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rounds_reaped(&self, count: u64) {
        self.rounds_reaped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_refunds_issued(&self, count: u64) {
        self.refunds_issued.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_deposits(&self) {
        self.deposits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_withdrawals(&self) {
        self.withdrawals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejection(&self, code: &'static str) {
        let mut rejections = self
            .rejections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *rejections.entry(code).or_default() += 1;
    }

    pub fn inc_reject_origin(&self) {
        self.reject_origin.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_body_limit(&self) {
        self.reject_body_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reject_rate_limit(&self) {
        self.reject_rate_limit.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let rejections = self
            .rejections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(code, count)| (code.to_string(), *count))
            .collect();
        MetricsSnapshot {
            ledger: LedgerMetricsSnapshot {
                rounds_started: self.rounds_started.load(Ordering::Relaxed),
                cashouts_paid: self.cashouts_paid.load(Ordering::Relaxed),
                cashouts_crashed: self.cashouts_crashed.load(Ordering::Relaxed),
                crash_reports: self.crash_reports.load(Ordering::Relaxed),
                stale_rounds_reclaimed: self.stale_rounds_reclaimed.load(Ordering::Relaxed),
                rounds_reaped: self.rounds_reaped.load(Ordering::Relaxed),
                refunds_issued: self.refunds_issued.load(Ordering::Relaxed),
                deposits: self.deposits.load(Ordering::Relaxed),
                withdrawals: self.withdrawals.load(Ordering::Relaxed),
                rejections,
            },
            latency: LatencyMetricsSnapshot {
                start_round: self.start_round.snapshot(),
                cash_out: self.cash_out.snapshot(),
                account: self.account.snapshot(),
                query: self.query.snapshot(),
            },
            http_rejections: HttpRejectionsSnapshot {
                origin: self.reject_origin.load(Ordering::Relaxed),
                body_limit: self.reject_body_limit.load(Ordering::Relaxed),
                rate_limit: self.reject_rate_limit.load(Ordering::Relaxed),
            },
        }
    }
}
