use crashline_execution::{CrashPointSource, Engine, SweepReport, TieredCrashPoints};
use crashline_types::{
    AccountSummary, AggregateStats, Amount, CashOutOutcome, CrashAck, DepositReceipt,
    LedgerError, Multiplier, RoundId, RoundStarted, RoundView, UserId, Withdrawal,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

mod api;
pub use api::Api;

mod config;
pub use config::{
    ServerConfig, DEFAULT_HTTP_BODY_LIMIT_BYTES, DEFAULT_HTTP_RATE_LIMIT_BURST,
    DEFAULT_HTTP_RATE_LIMIT_PER_SECOND,
};

mod metrics;
pub use metrics::{
    HttpRejectionsSnapshot, LatencyMetricsSnapshot, LatencySnapshot, LedgerMetricsSnapshot,
    MetricsSnapshot, OperationClass,
};
use metrics::Metrics;

type SharedEngine = Engine<Box<dyn CrashPointSource>>;

/// Wall-clock time in unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// The engine behind one process-wide lock, plus server metrics.
///
/// Every method takes the lock for the whole engine call, so check-then-act sequences inside
/// the engine never interleave across requests. Nothing awaits while the lock is held.
pub struct Server {
    pub config: ServerConfig,
    engine: Mutex<SharedEngine>,
    metrics: Metrics,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let source: Box<dyn CrashPointSource> = match config.deterministic_seed {
            Some(seed) => Box::new(TieredCrashPoints::seeded(seed)),
            None => Box::new(TieredCrashPoints::from_entropy()),
        };
        Self::with_source(config, source)
    }

    pub fn with_source(config: ServerConfig, source: Box<dyn CrashPointSource>) -> Self {
        let engine = Engine::with_source(config.engine, source);
        Self {
            config,
            engine: Mutex::new(engine),
            metrics: Metrics::default(),
        }
    }

    fn engine(&self) -> MutexGuard<'_, SharedEngine> {
        // A request that panicked mid-operation must not lock every user out.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observe<T>(
        &self,
        class: OperationClass,
        started: Instant,
        result: &Result<T, LedgerError>,
    ) {
        self.metrics.record_latency(class, started.elapsed());
        if let Err(err) = result {
            self.metrics.inc_rejection(err.code());
        }
    }

    pub fn account_summary(&self, user: &UserId) -> AccountSummary {
        let started = Instant::now();
        let summary = self.engine().account_summary(user);
        self.metrics
            .record_latency(OperationClass::Account, started.elapsed());
        summary
    }

    pub fn deposit(&self, user: &UserId, amount: Amount) -> Result<DepositReceipt, LedgerError> {
        let started = Instant::now();
        let result = self.engine().deposit(user, amount);
        self.observe(OperationClass::Account, started, &result);
        if result.is_ok() {
            self.metrics.inc_deposits();
        }
        result
    }

    pub fn withdraw(&self, user: &UserId, amount: Amount) -> Result<Withdrawal, LedgerError> {
        let started = Instant::now();
        let result = self.engine().withdraw(user, amount);
        self.observe(OperationClass::Account, started, &result);
        if result.is_ok() {
            self.metrics.inc_withdrawals();
        }
        result
    }

    pub fn start_round(
        &self,
        user: &UserId,
        stake: Amount,
        now: u64,
    ) -> Result<RoundStarted, LedgerError> {
        let started = Instant::now();
        let (result, reclaimed) = {
            let mut engine = self.engine();
            let before = engine.stale_reclaims();
            let result = engine.start_round(user, stake, now);
            (result, engine.stale_reclaims() > before)
        };
        self.observe(OperationClass::StartRound, started, &result);
        if reclaimed {
            self.metrics.inc_stale_rounds_reclaimed();
        }
        if result.is_ok() {
            self.metrics.inc_rounds_started();
        }
        result
    }

    pub fn cash_out(
        &self,
        user: &UserId,
        round_id: RoundId,
        multiplier: Multiplier,
    ) -> Result<CashOutOutcome, LedgerError> {
        let started = Instant::now();
        let result = self.engine().cash_out(user, round_id, multiplier);
        self.observe(OperationClass::CashOut, started, &result);
        match &result {
            Ok(outcome) if outcome.is_crash() => self.metrics.inc_cashouts_crashed(),
            Ok(_) => self.metrics.inc_cashouts_paid(),
            Err(_) => {}
        }
        result
    }

    pub fn report_crash(&self, user: &UserId, round_id: RoundId) -> CrashAck {
        let started = Instant::now();
        let ack = self.engine().report_crash(user, round_id);
        self.metrics
            .record_latency(OperationClass::CashOut, started.elapsed());
        self.metrics.inc_crash_reports();
        ack
    }

    pub fn round(&self, user: &UserId, round_id: RoundId) -> Result<RoundView, LedgerError> {
        let started = Instant::now();
        let result = self.engine().round(user, round_id);
        self.observe(OperationClass::Query, started, &result);
        result
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        let started = Instant::now();
        let stats = self.engine().aggregate_stats();
        self.metrics
            .record_latency(OperationClass::Query, started.elapsed());
        stats
    }

    /// Run one reconciliation sweep at `now`.
    pub fn reconcile(&self, now: u64) -> SweepReport {
        let report = self.engine().reconcile(now);
        self.metrics.add_rounds_reaped(report.rounds_removed as u64);
        self.metrics.add_refunds_issued(report.rounds_refunded as u64);
        if !report.is_empty() {
            info!(
                rounds_removed = report.rounds_removed,
                rounds_refunded = report.rounds_refunded,
                amount_refunded = %report.amount_refunded,
                windows_purged = report.windows_purged,
                "reconcile sweep"
            );
        }
        report
    }

    /// Run [`Server::reconcile`] every `reconcile_interval_ms` until the task is aborted.
    pub fn spawn_reconciler(self: &Arc<Self>) -> JoinHandle<()> {
        let server = Arc::clone(self);
        let period = Duration::from_millis(self.config.engine.reconcile_interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                server.reconcile(now_ms());
            }
        })
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashline_execution::mocks::{user, ScriptedCrashPoints};

    const T0: u64 = 1_700_000_000_000;

    fn scripted_server(crash_points: &[u32]) -> Server {
        Server::with_source(
            ServerConfig::local(),
            Box::new(ScriptedCrashPoints::new(crash_points)),
        )
    }

    fn cents(value: u64) -> Amount {
        Amount::from_cents(value)
    }

    #[test]
    fn test_round_flow_updates_metrics() {
        let server = scripted_server(&[350, 180]);
        let alice = user("alice");
        server.deposit(&alice, cents(10_000)).unwrap();

        let first = server.start_round(&alice, cents(4_000), T0).unwrap();
        let outcome = server
            .cash_out(&alice, first.round_id, Multiplier::from_hundredths(200))
            .unwrap();
        assert_eq!(
            outcome,
            CashOutOutcome::Paid {
                payout: cents(8_000),
                multiplier: Multiplier::from_hundredths(200),
                balance: cents(14_000),
            }
        );

        let second = server.start_round(&alice, cents(4_000), T0 + 5_000).unwrap();
        let outcome = server
            .cash_out(&alice, second.round_id, Multiplier::from_hundredths(200))
            .unwrap();
        assert!(outcome.is_crash());

        let snapshot = server.metrics_snapshot();
        assert_eq!(snapshot.ledger.deposits, 1);
        assert_eq!(snapshot.ledger.rounds_started, 2);
        assert_eq!(snapshot.ledger.cashouts_paid, 1);
        assert_eq!(snapshot.ledger.cashouts_crashed, 1);
        assert_eq!(snapshot.latency.cash_out.count, 2);
    }

    #[test]
    fn test_rejections_counted_by_code() {
        let server = scripted_server(&[500]);
        let alice = user("alice");
        server.deposit(&alice, cents(10_000)).unwrap();
        let started = server.start_round(&alice, cents(1_000), T0).unwrap();

        assert_eq!(
            server.start_round(&alice, cents(1_000), T0 + 2_000),
            Err(LedgerError::ActiveRoundExists {
                round_id: started.round_id
            })
        );
        assert!(server.withdraw(&alice, cents(100)).is_err());

        let snapshot = server.metrics_snapshot();
        assert_eq!(
            snapshot.ledger.rejections.get("active_round_exists"),
            Some(&2)
        );
    }

    #[test]
    fn test_stale_reclaim_counted() {
        let server = scripted_server(&[500, 500]);
        let alice = user("alice");
        server.deposit(&alice, cents(10_000)).unwrap();
        server.start_round(&alice, cents(4_000), T0).unwrap();

        let restarted = server
            .start_round(&alice, cents(4_000), T0 + 65_000)
            .unwrap();
        assert_eq!(restarted.balance, cents(6_000));
        assert_eq!(server.metrics_snapshot().ledger.stale_rounds_reclaimed, 1);
    }

    #[test]
    fn test_reconcile_records_reaped_rounds() {
        let server = scripted_server(&[500]);
        let alice = user("alice");
        server.deposit(&alice, cents(10_000)).unwrap();
        server.start_round(&alice, cents(4_000), T0).unwrap();

        let report = server.reconcile(T0 + 31 * 60_000);
        assert_eq!(report.rounds_refunded, 1);
        assert_eq!(server.account_summary(&alice).balance, cents(10_000));

        let snapshot = server.metrics_snapshot();
        assert_eq!(snapshot.ledger.rounds_reaped, 1);
        assert_eq!(snapshot.ledger.refunds_issued, 1);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let server = Arc::new(scripted_server(&[]));
        let alice = user("alice");
        server.deposit(&alice, cents(500)).unwrap();

        let poisoner = Arc::clone(&server);
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.engine.lock();
            panic!("poison the engine lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(server.engine.is_poisoned());

        assert_eq!(server.account_summary(&alice).balance, cents(500));
        assert!(server.deposit(&alice, cents(100)).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cash_outs_settle_once() {
        let server = Arc::new(scripted_server(&[1_000]));
        let alice = user("alice");
        server.deposit(&alice, cents(10_000)).unwrap();
        let started = server.start_round(&alice, cents(4_000), T0).unwrap();

        let attempts = (0..8).map(|_| {
            let server = Arc::clone(&server);
            let alice = alice.clone();
            tokio::spawn(async move {
                server.cash_out(&alice, started.round_id, Multiplier::from_hundredths(200))
            })
        });
        let results = futures::future::join_all(attempts).await;

        let mut paid = 0;
        for result in results {
            match result.unwrap() {
                Ok(CashOutOutcome::Paid { .. }) => paid += 1,
                Ok(other) => panic!("unexpected outcome: {other:?}"),
                Err(err) => assert!(matches!(
                    err,
                    LedgerError::AlreadyEnded { .. } | LedgerError::AlreadySettled { .. }
                )),
            }
        }
        assert_eq!(paid, 1);
        assert_eq!(server.account_summary(&alice).balance, cents(14_000));
    }

    #[test]
    fn test_seeded_servers_agree() {
        let config = ServerConfig {
            deterministic_seed: Some(42),
            ..ServerConfig::local()
        };
        let first = Server::new(config.clone());
        let second = Server::new(config);
        let alice = user("alice");

        for server in [&first, &second] {
            server.deposit(&alice, cents(10_000)).unwrap();
            let started = server.start_round(&alice, cents(1_000), T0).unwrap();
            server.report_crash(&alice, started.round_id);
        }
        let crash_point = |server: &Server| {
            server
                .round(&alice, RoundId::new(1))
                .unwrap()
                .crash_point
                .unwrap()
        };
        assert_eq!(crash_point(&first), crash_point(&second));
    }
}
