use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::warn;

use crate::dtos::QueueItem;
use crate::error::InspectError;
use crate::link::InspectParams;

pub type Outcome<T> = Result<T, InspectError>;
pub type Waiter<T> = oneshot::Receiver<Outcome<T>>;

/// In-flight inspect for one asset id.
#[derive(Debug)]
pub struct PendingInspect<T> {
    pub params: InspectParams,
    pub retry_count: u32,
    pub started_at: Instant,
    waiters: Vec<oneshot::Sender<Outcome<T>>>,
    attempt_failures: UnboundedSender<InspectError>,
}

impl<T: Clone> PendingInspect<T> {
    /// Hands the outcome to every waiting caller. Callers that gave up are
    /// skipped.
    pub fn complete(self, outcome: Outcome<T>) {
        for waiter in self.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }
}

/// Handles owned by the task that dispatches an admitted entry. It is
/// independent of any caller, so a caller giving up never stops the retries
/// other waiters depend on.
#[derive(Debug)]
pub struct Dispatch<T> {
    pub completed: Waiter<T>,
    /// Backend failures reported for the current attempt.
    pub attempt_failures: UnboundedReceiver<InspectError>,
}

#[derive(Debug)]
pub enum Admission<T> {
    /// A new entry was created. `dispatch` must be handed to a driver task.
    Admitted { dispatch: Dispatch<T>, waiter: Waiter<T> },
    /// An entry already existed; the caller only waits for its outcome.
    Joined(Waiter<T>),
}

#[derive(Debug)]
pub enum RetryDecision<T> {
    /// Entry re-armed with this retry count; dispatch again.
    Retry(u32),
    /// Bound reached; the entry was removed and must be completed by the
    /// caller.
    Exhausted(PendingInspect<T>),
    /// Entry already resolved or swept elsewhere.
    Gone,
}

/// Pending inspects keyed by asset id, with admission control. Every
/// operation is one short critical section.
pub struct CorrelationTable<T> {
    capacity: usize,
    entries: Mutex<HashMap<u64, PendingInspect<T>>>,
}

impl<T: Clone> CorrelationTable<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn admit(&self, params: &InspectParams) -> Result<Admission<T>, InspectError> {
        let mut entries = self.entries.lock().await;
        let (sender, waiter) = oneshot::channel();
        if let Some(entry) = entries.get_mut(&params.a) {
            entry.waiters.push(sender);
            return Ok(Admission::Joined(waiter));
        }
        if entries.len() >= self.capacity {
            return Err(InspectError::QueueFull {
                current: entries.len(),
                max: self.capacity,
            });
        }
        let (driver_sender, completed) = oneshot::channel();
        let (failure_sender, attempt_failures) = mpsc::unbounded_channel();
        entries.insert(
            params.a,
            PendingInspect {
                params: params.clone(),
                retry_count: 0,
                started_at: Instant::now(),
                waiters: vec![driver_sender, sender],
                attempt_failures: failure_sender,
            },
        );
        Ok(Admission::Admitted {
            dispatch: Dispatch {
                completed,
                attempt_failures,
            },
            waiter,
        })
    }

    /// Forwards a backend failure to the driver of the entry's current
    /// attempt. Returns false when no entry is live.
    pub async fn report_failure(&self, asset_id: u64, error: InspectError) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(&asset_id)
            .map(|entry| entry.attempt_failures.send(error).is_ok())
            .unwrap_or(false)
    }

    /// Applies the retry policy after a failed attempt: re-arm while the
    /// retry count is below `max_retries`, otherwise remove the entry.
    pub async fn retry_or_fail(&self, asset_id: u64, max_retries: u32) -> RetryDecision<T> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&asset_id) else {
            return RetryDecision::Gone;
        };
        if entry.retry_count < max_retries {
            entry.retry_count += 1;
            entry.started_at = Instant::now();
            return RetryDecision::Retry(entry.retry_count);
        }
        match entries.remove(&asset_id) {
            Some(entry) => RetryDecision::Exhausted(entry),
            None => RetryDecision::Gone,
        }
    }

    /// Removes the entry so the result processor can complete it. The first
    /// resolution wins; later ones find nothing.
    pub async fn resolve(&self, asset_id: u64) -> Option<PendingInspect<T>> {
        self.entries.lock().await.remove(&asset_id)
    }

    pub async fn fail(&self, asset_id: u64, error: InspectError) -> bool {
        let entry = self.entries.lock().await.remove(&asset_id);
        match entry {
            Some(entry) => {
                entry.complete(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fails every entry whose current attempt started more than
    /// `stale_after` ago. Returns the number of swept entries.
    pub async fn sweep_stale(&self, stale_after: Duration) -> usize {
        let now = Instant::now();
        let stale: Vec<PendingInspect<T>> = {
            let mut entries = self.entries.lock().await;
            let ids: Vec<u64> = entries
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.started_at) > stale_after)
                .map(|(asset_id, _)| *asset_id)
                .collect();
            ids.into_iter().filter_map(|id| entries.remove(&id)).collect()
        };
        let swept = stale.len();
        for entry in stale {
            warn!(asset_id = entry.params.a, "removing stale inspect request");
            entry.complete(Err(InspectError::Timeout));
        }
        swept
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    pub async fn queue_items(&self) -> Vec<QueueItem> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        let mut items: Vec<QueueItem> = entries
            .iter()
            .map(|(asset_id, entry)| QueueItem {
                asset_id: *asset_id,
                elapsed_time: now.duration_since(entry.started_at).as_millis() as u64,
                retry_count: entry.retry_count,
            })
            .collect();
        items.sort_by_key(|item| item.asset_id);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(asset_id: u64) -> InspectParams {
        InspectParams {
            s: "76561198000000001".to_string(),
            a: asset_id,
            d: "42".to_string(),
            m: "0".to_string(),
        }
    }

    #[tokio::test]
    async fn admission_is_bounded_by_capacity() {
        let table: CorrelationTable<u32> = CorrelationTable::new(2);
        assert!(matches!(table.admit(&params(1)).await, Ok(Admission::Admitted { .. })));
        assert!(matches!(table.admit(&params(2)).await, Ok(Admission::Admitted { .. })));
        assert_eq!(
            table.admit(&params(3)).await.err(),
            Some(InspectError::QueueFull { current: 2, max: 2 })
        );
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn same_asset_joins_existing_entry() {
        let table: CorrelationTable<u32> = CorrelationTable::new(1);
        let (dispatch, first) = match table.admit(&params(7)).await {
            Ok(Admission::Admitted { dispatch, waiter }) => (dispatch, waiter),
            other => panic!("unexpected admission {other:?}"),
        };
        let second = match table.admit(&params(7)).await {
            Ok(Admission::Joined(rx)) => rx,
            other => panic!("unexpected admission {other:?}"),
        };
        assert_eq!(table.len().await, 1);

        let entry = table.resolve(7).await.expect("entry");
        assert_eq!(entry.waiter_count(), 3);
        entry.complete(Ok(99));
        assert_eq!(dispatch.completed.await.expect("driver"), Ok(99));
        assert_eq!(first.await.expect("first"), Ok(99));
        assert_eq!(second.await.expect("second"), Ok(99));
        assert!(table.resolve(7).await.is_none());
    }

    #[tokio::test]
    async fn retry_is_bounded() {
        let table: CorrelationTable<u32> = CorrelationTable::new(4);
        let rx = match table.admit(&params(9)).await {
            Ok(Admission::Admitted { waiter, .. }) => waiter,
            other => panic!("unexpected admission {other:?}"),
        };
        for expected in 1..=3 {
            assert!(matches!(
                table.retry_or_fail(9, 3).await,
                RetryDecision::Retry(attempt) if attempt == expected
            ));
        }
        match table.retry_or_fail(9, 3).await {
            RetryDecision::Exhausted(entry) => entry.complete(Err(InspectError::Timeout)),
            other => panic!("unexpected decision {other:?}"),
        }
        assert_eq!(rx.await.expect("outcome"), Err(InspectError::Timeout));
        assert!(matches!(table.retry_or_fail(9, 3).await, RetryDecision::Gone));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn backend_failures_reach_the_driver() {
        let table: CorrelationTable<u32> = CorrelationTable::new(4);
        let mut dispatch = match table.admit(&params(12)).await {
            Ok(Admission::Admitted { dispatch, .. }) => dispatch,
            other => panic!("unexpected admission {other:?}"),
        };
        let busy = InspectError::WorkerProtocol("busy".to_string());
        assert!(table.report_failure(12, busy.clone()).await);
        assert_eq!(dispatch.attempt_failures.recv().await, Some(busy.clone()));
        assert!(!table.report_failure(13, busy).await);
    }

    #[tokio::test]
    async fn stale_entries_are_swept_with_timeout() {
        let table: CorrelationTable<u32> = CorrelationTable::new(4);
        let rx = match table.admit(&params(11)).await {
            Ok(Admission::Admitted { waiter, .. }) => waiter,
            other => panic!("unexpected admission {other:?}"),
        };
        assert_eq!(table.sweep_stale(Duration::from_secs(60)).await, 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(table.sweep_stale(Duration::from_millis(10)).await, 1);
        assert_eq!(rx.await.expect("outcome"), Err(InspectError::Timeout));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn queue_items_report_retry_counts() {
        let table: CorrelationTable<u32> = CorrelationTable::new(4);
        let _first = table.admit(&params(2)).await;
        let _second = table.admit(&params(1)).await;
        table.retry_or_fail(2, 3).await;
        let items = table.queue_items().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].asset_id, 1);
        assert_eq!(items[1].retry_count, 1);
    }
}
