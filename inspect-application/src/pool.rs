use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use inspect_domain::{Credential, InspectResultSink, InspectWorker, WorkerConnector, WorkerInitError};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::scheduler::RoundRobin;
use crate::settings::EngineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUp {
    Ready,
    Disabled,
    Throttled,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolInitReport {
    pub ready: usize,
    pub disabled: usize,
    pub throttled: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PoolInitReport {
    fn record(&mut self, outcome: BringUp) {
        match outcome {
            BringUp::Ready => self.ready += 1,
            BringUp::Disabled => self.disabled += 1,
            BringUp::Throttled => self.throttled += 1,
            BringUp::Skipped => self.skipped += 1,
            BringUp::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolCounts {
    pub ready: usize,
    pub busy: usize,
    pub total: usize,
}

/// Owns worker lifecycle: bring-up, blacklisting, throttling and selection.
pub struct WorkerPool {
    connector: Arc<dyn WorkerConnector>,
    sink: Arc<dyn InspectResultSink>,
    settings: EngineSettings,
    credentials: RwLock<Vec<Credential>>,
    workers: RwLock<Vec<Arc<dyn InspectWorker>>>,
    throttled: Mutex<HashMap<String, Instant>>,
    scheduler: Mutex<RoundRobin>,
}

impl WorkerPool {
    pub fn new(
        connector: Arc<dyn WorkerConnector>,
        sink: Arc<dyn InspectResultSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            connector,
            sink,
            settings,
            credentials: RwLock::new(Vec::new()),
            workers: RwLock::new(Vec::new()),
            throttled: Mutex::new(HashMap::new()),
            scheduler: Mutex::new(RoundRobin::default()),
        }
    }

    /// Replaces the credential list and brings every credential up in batches.
    pub async fn initialize(&self, credentials: Vec<Credential>) -> PoolInitReport {
        *self.credentials.write().await = credentials.clone();
        let report = self.bring_up(credentials).await;
        info!(
            ready = report.ready,
            disabled = report.disabled,
            throttled = report.throttled,
            failed = report.failed,
            "finished initializing {} bots",
            self.size().await
        );
        report
    }

    /// Brings up every known credential that has no live worker and is not
    /// cooling down.
    pub async fn refresh(&self) -> PoolInitReport {
        let live: Vec<String> = {
            let workers = self.workers.read().await;
            workers.iter().map(|worker| worker.username().to_string()).collect()
        };
        let candidates: Vec<Credential> = {
            let credentials = self.credentials.read().await;
            credentials
                .iter()
                .filter(|credential| !live.contains(&credential.username))
                .cloned()
                .collect()
        };
        if candidates.is_empty() {
            return PoolInitReport::default();
        }
        debug!("refreshing pool with {} idle credentials", candidates.len());
        self.bring_up(candidates).await
    }

    async fn bring_up(&self, candidates: Vec<Credential>) -> PoolInitReport {
        let mut report = PoolInitReport::default();
        let total = candidates.len();
        let batch_size = self.settings.batch_size.max(1);
        let mut processed = 0;
        for batch in candidates.chunks(batch_size) {
            let outcomes = join_all(batch.iter().map(|credential| self.bring_up_one(credential))).await;
            for outcome in outcomes {
                report.record(outcome);
            }
            processed += batch.len();
            debug!(
                "initialized batch of {} bots ({}/{} total)",
                batch.len(),
                processed,
                total
            );
        }
        report
    }

    pub async fn bring_up_one(&self, credential: &Credential) -> BringUp {
        let username = credential.username.as_str();
        if self.is_throttled(username).await {
            warn!(username, "account is throttled, skipping initialization");
            return BringUp::Skipped;
        }

        let max_attempts = self.settings.init_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.connector.connect(credential, self.sink.clone()).await {
                Ok(worker) => {
                    self.insert_worker(worker).await;
                    self.throttled.lock().await.remove(username);
                    debug!(username, "bot initialized successfully");
                    return BringUp::Ready;
                }
                Err(WorkerInitError::AccountDisabled) => {
                    error!(username, "account is disabled, blacklisting");
                    self.blacklist(username).await;
                    return BringUp::Disabled;
                }
                Err(WorkerInitError::LoginThrottled) => {
                    warn!(username, "account login throttled, adding to cooldown");
                    self.record_throttle(username).await;
                    return BringUp::Throttled;
                }
                Err(WorkerInitError::InitializationTimeout) => {
                    if attempt < max_attempts {
                        warn!(username, attempt, "initialization timeout, retrying");
                    } else {
                        warn!(username, attempt, "max retries reached, initialization failed");
                    }
                }
                Err(WorkerInitError::Other(reason)) => {
                    error!(username, %reason, "failed to initialize bot");
                    return BringUp::Failed;
                }
            }
        }
        BringUp::Failed
    }

    async fn insert_worker(&self, worker: Arc<dyn InspectWorker>) {
        let mut workers = self.workers.write().await;
        if let Some(slot) = workers
            .iter_mut()
            .find(|existing| existing.username() == worker.username())
        {
            *slot = worker;
        } else {
            workers.push(worker);
        }
    }

    /// Removes a credential permanently.
    pub async fn blacklist(&self, username: &str) {
        self.credentials
            .write()
            .await
            .retain(|credential| credential.username != username);
        self.workers
            .write()
            .await
            .retain(|worker| worker.username() != username);
    }

    /// Excludes a worker immediately; it comes back on the first refresh after
    /// its cooldown has been swept.
    pub async fn throttle(&self, username: &str) {
        self.record_throttle(username).await;
        self.workers
            .write()
            .await
            .retain(|worker| worker.username() != username);
    }

    async fn record_throttle(&self, username: &str) {
        let expiry = Instant::now() + self.settings.throttle_cooldown;
        self.throttled.lock().await.insert(username.to_string(), expiry);
    }

    pub async fn is_throttled(&self, username: &str) -> bool {
        let throttled = self.throttled.lock().await;
        matches!(throttled.get(username), Some(expiry) if Instant::now() < *expiry)
    }

    /// Drops expired throttle entries and returns the released usernames.
    pub async fn sweep_throttled(&self) -> Vec<String> {
        let now = Instant::now();
        let mut throttled = self.throttled.lock().await;
        let expired: Vec<String> = throttled
            .iter()
            .filter(|(_, expiry)| now >= **expiry)
            .map(|(username, _)| username.clone())
            .collect();
        for username in &expired {
            throttled.remove(username);
            debug!(username = username.as_str(), "removed from throttle list");
        }
        expired
    }

    pub fn is_available(worker: &Arc<dyn InspectWorker>) -> bool {
        worker.is_available()
    }

    async fn available(&self) -> Vec<Arc<dyn InspectWorker>> {
        let candidates: Vec<Arc<dyn InspectWorker>> = {
            let workers = self.workers.read().await;
            workers
                .iter()
                .filter(|worker| Self::is_available(worker))
                .cloned()
                .collect()
        };
        let throttled = self.throttled.lock().await;
        let now = Instant::now();
        candidates
            .into_iter()
            .filter(|worker| !matches!(throttled.get(worker.username()), Some(expiry) if now < *expiry))
            .collect()
    }

    /// Picks the next available worker round-robin, or `None` when every
    /// worker is busy, disconnected or cooling down.
    pub async fn select(&self) -> Option<Arc<dyn InspectWorker>> {
        let available = self.available().await;
        let mut scheduler = self.scheduler.lock().await;
        scheduler.pick(&available).cloned()
    }

    pub async fn size(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn credential_count(&self) -> usize {
        self.credentials.read().await.len()
    }

    pub async fn counts(&self) -> PoolCounts {
        let workers = self.workers.read().await;
        let ready = workers
            .iter()
            .filter(|worker| Self::is_available(worker))
            .count();
        PoolCounts {
            ready,
            busy: workers.len() - ready,
            total: workers.len(),
        }
    }

    pub async fn shutdown(&self) {
        let mut workers = self.workers.write().await;
        info!("releasing {} bots", workers.len());
        workers.clear();
    }
}
