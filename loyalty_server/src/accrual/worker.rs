//! The accrual worker: a single long-running background task that repeatedly sweeps the ledger's
//! pending orders, polls the accrual authority for each, and writes the resulting status
//! transitions and accruals back.
//!
//! The database is the work queue. Terminal transitions (`Processed`, `Invalid`) drop an order
//! out of `pending_orders()` automatically, so there is no in-memory retry state: anything that
//! could not be resolved this sweep is simply seen again on the next one.
use std::time::Duration;

use log::*;
use loyalty_engine::{
    db_types::{OrderId, OrderStatus},
    traits::{LedgerDatabase, LedgerError},
    SqliteDatabase,
};
use tokio::{sync::watch, task::JoinHandle};

use crate::accrual::client::{AccrualApi, AccrualClient, AccrualError, AccrualRecord, AccrualStatus};

/// Minimum pause after a 429, also used when the authority sends no usable `Retry-After`.
const RATE_LIMIT_FLOOR: Duration = Duration::from_secs(5);
/// Idle backoff ceiling between empty sweeps.
const MAX_IDLE_BACKOFF_SECS: u64 = 3;

/// Starts the accrual worker. Do not await the returned JoinHandle until shutdown; signal the
/// watch channel first and the worker will exit at its next iteration boundary.
pub fn start_accrual_worker(
    db: SqliteDatabase,
    client: AccrualClient,
    stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        AccrualWorker::new(db, client).run(stop).await;
    })
}

#[derive(Debug, PartialEq, Eq)]
enum BatchOutcome {
    Completed,
    /// A fetch failed; the rest of the batch is abandoned and retried on the next sweep. This
    /// keeps the worker from hot-looping against a failing authority.
    Aborted,
}

pub struct AccrualWorker<B, C> {
    db: B,
    client: C,
    idle_backoff: u64,
}

impl<B, C> AccrualWorker<B, C>
where
    B: LedgerDatabase,
    C: AccrualApi,
{
    pub fn new(db: B, client: C) -> Self {
        Self { db, client, idle_backoff: 0 }
    }

    /// The poll loop. Returns when the stop signal fires or the ledger store fails; the HTTP
    /// surface keeps serving in the latter case.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!("🔄️ Accrual worker started");
        loop {
            if *stop.borrow() {
                break;
            }
            let pending = match self.db.pending_orders().await {
                Ok(pending) => pending,
                Err(e) => {
                    error!("🔄️ Could not fetch pending orders: {e}. The accrual worker is shutting down.");
                    return;
                },
            };
            if pending.is_empty() {
                let pause = self.bump_idle_backoff();
                if interrupted(&mut stop, pause).await {
                    break;
                }
                continue;
            }
            self.idle_backoff = 0;
            match self.process_batch(&pending, &mut stop).await {
                Ok(BatchOutcome::Completed) => {},
                Ok(BatchOutcome::Aborted) => {
                    debug!("🔄️ Batch abandoned after a fetch failure; pending orders will be retried");
                },
                Err(e) => {
                    error!("🔄️ Ledger update failed: {e}. The accrual worker is shutting down.");
                    return;
                },
            }
        }
        info!("🔄️ Accrual worker stopped");
    }

    async fn process_batch(
        &self,
        pending: &[OrderId],
        stop: &mut watch::Receiver<bool>,
    ) -> Result<BatchOutcome, LedgerError> {
        debug!("🔄️ Polling the accrual authority for {} pending orders", pending.len());
        for &order_id in pending {
            if *stop.borrow() {
                return Ok(BatchOutcome::Completed);
            }
            match self.client.fetch(order_id).await {
                Ok(record) => self.apply(record).await?,
                Err(AccrualError::TooManyRequests { retry_after }) => {
                    let pause = Duration::from_secs(retry_after).max(RATE_LIMIT_FLOOR);
                    warn!("🔄️ Accrual authority is rate limiting. Pausing for {}s", pause.as_secs());
                    if interrupted(stop, pause).await {
                        return Ok(BatchOutcome::Completed);
                    }
                    // The rate-limited order stays pending and is retried on a later sweep.
                },
                Err(AccrualError::OrderNotRegistered) => {
                    trace!("🔄️ Order [{order_id}] is not registered upstream yet");
                },
                Err(e) => {
                    warn!("🔄️ Fetch for order [{order_id}] failed: {e}");
                    return Ok(BatchOutcome::Aborted);
                },
            }
        }
        Ok(BatchOutcome::Completed)
    }

    async fn apply(&self, record: AccrualRecord) -> Result<(), LedgerError> {
        match record.status {
            // The authority has the order but has not started on it; it stays `New`.
            AccrualStatus::Registered => {},
            AccrualStatus::Processing => {
                self.db.set_status(record.order, OrderStatus::Processing).await?;
            },
            AccrualStatus::Invalid => {
                self.db.set_status(record.order, OrderStatus::Invalid).await?;
            },
            AccrualStatus::Processed => {
                self.db.accrue(record.order, record.accrual).await?;
            },
        }
        Ok(())
    }

    fn bump_idle_backoff(&mut self) -> Duration {
        self.idle_backoff = (self.idle_backoff + 1).min(MAX_IDLE_BACKOFF_SECS);
        Duration::from_secs(self.idle_backoff)
    }
}

/// Sleeps for `pause`, returning early with `true` if the stop signal fires first (or its sender
/// is gone).
async fn interrupted(stop: &mut watch::Receiver<bool>, pause: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(pause) => false,
        changed = stop.changed() => changed.is_err() || *stop.borrow(),
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU32, Ordering};

    use lpg_common::Points;
    use mockall::{mock, predicate::eq};
    use reqwest::StatusCode;

    use super::*;

    mock! {
        Ledger {}
        impl LedgerDatabase for Ledger {
            async fn submit_order(&self, order_id: OrderId, login: &str) -> Result<(), LedgerError>;
            async fn withdraw(&self, login: &str, order_id: OrderId, amount: Points) -> Result<(), LedgerError>;
            async fn accrue(&self, order_id: OrderId, amount: Points) -> Result<(), LedgerError>;
            async fn set_status(&self, order_id: OrderId, status: OrderStatus) -> Result<(), LedgerError>;
            async fn pending_orders(&self) -> Result<Vec<OrderId>, LedgerError>;
        }
    }

    mock! {
        Client {}
        impl AccrualApi for Client {
            async fn fetch(&self, order_id: OrderId) -> Result<AccrualRecord, AccrualError>;
        }
    }

    fn oid(s: &str) -> OrderId {
        s.parse().unwrap()
    }

    fn record(order: &str, status: AccrualStatus, accrual: f64) -> AccrualRecord {
        AccrualRecord { order: oid(order), status, accrual: Points::try_from(accrual).unwrap() }
    }

    fn stop_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn statuses_are_translated_into_ledger_operations() {
        let mut db = MockLedger::new();
        db.expect_set_status().with(eq(oid("20")), eq(OrderStatus::Processing)).times(1).returning(|_, _| Ok(()));
        db.expect_set_status().with(eq(oid("34")), eq(OrderStatus::Invalid)).times(1).returning(|_, _| Ok(()));
        db.expect_accrue().with(eq(oid("42")), eq(Points::from_points(500))).times(1).returning(|_, _| Ok(()));

        let mut client = MockClient::new();
        client.expect_fetch().with(eq(oid("18"))).returning(|id| Ok(AccrualRecord {
            order: id,
            status: AccrualStatus::Registered,
            accrual: Points::default(),
        }));
        client.expect_fetch().with(eq(oid("20"))).returning(|_| Ok(record("20", AccrualStatus::Processing, 0.0)));
        client.expect_fetch().with(eq(oid("34"))).returning(|_| Ok(record("34", AccrualStatus::Invalid, 0.0)));
        client.expect_fetch().with(eq(oid("42"))).returning(|_| Ok(record("42", AccrualStatus::Processed, 500.0)));

        let worker = AccrualWorker::new(db, client);
        let (_tx, mut stop) = stop_channel();
        let pending = vec![oid("18"), oid("20"), oid("34"), oid("42")];
        let outcome = worker.process_batch(&pending, &mut stop).await.unwrap();
        assert_eq!(outcome, BatchOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiting_pauses_with_a_floor() {
        let db = MockLedger::new();
        let mut client = MockClient::new();
        client
            .expect_fetch()
            .with(eq(oid("18")))
            .returning(|_| Err(AccrualError::TooManyRequests { retry_after: 2 }));
        client.expect_fetch().with(eq(oid("20"))).returning(|_| Ok(record("20", AccrualStatus::Registered, 0.0)));

        let worker = AccrualWorker::new(db, client);
        let (_tx, mut stop) = stop_channel();
        let started = tokio::time::Instant::now();
        let outcome = worker.process_batch(&[oid("18"), oid("20")], &mut stop).await.unwrap();
        assert_eq!(outcome, BatchOutcome::Completed);
        // Retry-After of 2s is below the 5s floor.
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn a_long_retry_after_is_honoured() {
        let db = MockLedger::new();
        let mut client = MockClient::new();
        client
            .expect_fetch()
            .with(eq(oid("18")))
            .returning(|_| Err(AccrualError::TooManyRequests { retry_after: 30 }));

        let worker = AccrualWorker::new(db, client);
        let (_tx, mut stop) = stop_channel();
        let started = tokio::time::Instant::now();
        worker.process_batch(&[oid("18")], &mut stop).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn unregistered_orders_are_skipped_without_aborting() {
        let mut db = MockLedger::new();
        db.expect_accrue().times(1).returning(|_, _| Ok(()));
        let mut client = MockClient::new();
        client.expect_fetch().with(eq(oid("18"))).returning(|_| Err(AccrualError::OrderNotRegistered));
        client.expect_fetch().with(eq(oid("42"))).returning(|_| Ok(record("42", AccrualStatus::Processed, 10.0)));

        let worker = AccrualWorker::new(db, client);
        let (_tx, mut stop) = stop_channel();
        let outcome = worker.process_batch(&[oid("18"), oid("42")], &mut stop).await.unwrap();
        assert_eq!(outcome, BatchOutcome::Completed);
    }

    #[tokio::test]
    async fn a_fetch_failure_abandons_the_rest_of_the_batch() {
        let db = MockLedger::new();
        let mut client = MockClient::new();
        client
            .expect_fetch()
            .with(eq(oid("18")))
            .times(1)
            .returning(|_| Err(AccrualError::UnexpectedStatus(StatusCode::INTERNAL_SERVER_ERROR)));
        // No expectation for order 42: fetching it would fail the test.

        let worker = AccrualWorker::new(db, client);
        let (_tx, mut stop) = stop_channel();
        let outcome = worker.process_batch(&[oid("18"), oid("42")], &mut stop).await.unwrap();
        assert_eq!(outcome, BatchOutcome::Aborted);
    }

    #[tokio::test]
    async fn a_store_failure_terminates_the_loop() {
        let mut db = MockLedger::new();
        db.expect_pending_orders()
            .times(1)
            .returning(|| Err(LedgerError::DatabaseError("store is gone".to_string())));
        let client = MockClient::new();
        let (_tx, stop) = stop_channel();
        // Returns instead of looping forever.
        AccrualWorker::new(db, client).run(stop).await;
    }

    #[tokio::test]
    async fn the_stop_signal_wins_before_any_work_happens() {
        let db = MockLedger::new();
        let client = MockClient::new();
        let (tx, stop) = stop_channel();
        tx.send(true).unwrap();
        AccrualWorker::new(db, client).run(stop).await;
    }

    #[tokio::test(start_paused = true)]
    async fn the_loop_drains_pending_orders_and_honours_stop() {
        let (tx, stop) = stop_channel();
        let sweeps = AtomicU32::new(0);
        let mut db = MockLedger::new();
        db.expect_pending_orders().returning(move || {
            if sweeps.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![oid("42")])
            } else {
                let _ = tx.send(true);
                Ok(vec![])
            }
        });
        db.expect_accrue().with(eq(oid("42")), eq(Points::from_points(500))).times(1).returning(|_, _| Ok(()));
        let mut client = MockClient::new();
        client.expect_fetch().with(eq(oid("42"))).returning(|_| Ok(record("42", AccrualStatus::Processed, 500.0)));

        AccrualWorker::new(db, client).run(stop).await;
    }

    #[test]
    fn idle_backoff_ramps_to_the_ceiling_and_resets() {
        let mut worker = AccrualWorker::new(MockLedger::new(), MockClient::new());
        assert_eq!(worker.bump_idle_backoff(), Duration::from_secs(1));
        assert_eq!(worker.bump_idle_backoff(), Duration::from_secs(2));
        assert_eq!(worker.bump_idle_backoff(), Duration::from_secs(3));
        assert_eq!(worker.bump_idle_backoff(), Duration::from_secs(3));
        worker.idle_backoff = 0;
        assert_eq!(worker.bump_idle_backoff(), Duration::from_secs(1));
    }
}
