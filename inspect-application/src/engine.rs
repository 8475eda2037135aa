use std::sync::Arc;
use std::time::Duration;

use inspect_domain::{
    classify_transition, current_millis, identity_hash, Asset, AssetRepository, Credential,
    History, HistoryRepository, InspectResultSink, RawItem, Rankings, WorkerConnector,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::correlation::{Admission, CorrelationTable, Dispatch, Outcome, RetryDecision, Waiter};
use crate::dtos::{ItemInfo, QueueStats, StatsSnapshot};
use crate::error::InspectError;
use crate::link::InspectParams;
use crate::metrics::{EngineGauges, Metrics};
use crate::pool::{PoolInitReport, WorkerPool};
use crate::settings::EngineSettings;

/// Events emitted by workers, funnelled into the result pump.
#[derive(Debug)]
pub enum WorkerEvent {
    Result { username: String, item: RawItem },
    Failed { username: String, asset_id: u64, reason: String },
    Throttled { username: String },
}

/// Sink handed to every worker at connect time.
#[derive(Clone)]
pub struct ChannelResultSink {
    sender: UnboundedSender<WorkerEvent>,
}

impl InspectResultSink for ChannelResultSink {
    fn deliver(&self, username: &str, item: RawItem) {
        let event = WorkerEvent::Result {
            username: username.to_string(),
            item,
        };
        if self.sender.send(event).is_err() {
            debug!(username, "result pump stopped, dropping inspect result");
        }
    }

    fn failed(&self, username: &str, asset_id: u64, reason: &str) {
        let event = WorkerEvent::Failed {
            username: username.to_string(),
            asset_id,
            reason: reason.to_string(),
        };
        if self.sender.send(event).is_err() {
            debug!(username, asset_id, "result pump stopped, dropping inspect failure");
        }
    }

    fn throttled(&self, username: &str) {
        let event = WorkerEvent::Throttled {
            username: username.to_string(),
        };
        if self.sender.send(event).is_err() {
            debug!(username, "result pump stopped, dropping throttle notice");
        }
    }
}

/// Handles of the engine's periodic tasks and result pump.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn abort_all(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Dispatch and correlation engine. One instance owns the worker pool, the
/// correlation table and the metrics for the lifetime of the service.
pub struct InspectEngine {
    settings: EngineSettings,
    pool: WorkerPool,
    table: CorrelationTable<ItemInfo>,
    metrics: Metrics,
    assets: Arc<dyn AssetRepository>,
    history: Arc<dyn HistoryRepository>,
}

impl InspectEngine {
    pub fn new(
        settings: EngineSettings,
        connector: Arc<dyn WorkerConnector>,
        assets: Arc<dyn AssetRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> (Arc<Self>, UnboundedReceiver<WorkerEvent>) {
        let (sender, events) = mpsc::unbounded_channel();
        let sink = Arc::new(ChannelResultSink { sender });
        let engine = Arc::new(Self {
            pool: WorkerPool::new(connector, sink, settings.clone()),
            table: CorrelationTable::new(settings.max_queue_size),
            metrics: Metrics::new(settings.request_window),
            settings,
            assets,
            history,
        });
        (engine, events)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn initialize(&self, credentials: Vec<Credential>) -> PoolInitReport {
        info!("initializing {} bots", credentials.len());
        self.pool.initialize(credentials).await
    }

    pub async fn is_ready(&self) -> bool {
        self.pool.size().await > 0
    }

    /// Serves an inspect from the cache or dispatches it to a worker and
    /// waits for the correlated result. Dispatch and retries run in a task
    /// owned by the engine, so dropping this future only stops this caller
    /// from waiting.
    pub async fn inspect(self: &Arc<Self>, params: &InspectParams, refresh: bool) -> Result<ItemInfo, InspectError> {
        if !self.is_ready().await {
            return Err(InspectError::Initializing);
        }

        if !refresh {
            if let Some(info) = self.cached(params).await {
                self.metrics.record_request();
                self.metrics.record_cached();
                return Ok(info);
            }
        }

        let waiter = match self.table.admit(params).await? {
            Admission::Joined(waiter) => {
                debug!(asset_id = params.a, "joining in-flight inspect");
                waiter
            }
            Admission::Admitted { dispatch, waiter } => {
                let engine = Arc::clone(self);
                let params = params.clone();
                tokio::spawn(async move { engine.drive(params, dispatch).await });
                waiter
            }
        };
        self.metrics.record_request();
        Self::wait(waiter).await
    }

    async fn cached(&self, params: &InspectParams) -> Option<ItemInfo> {
        match self.assets.lookup(params.a, &params.d).await {
            Ok(Some(asset)) => {
                let rankings = self.rankings_for(asset.asset_id).await;
                Some(ItemInfo::from_asset(&asset, rankings.as_ref()))
            }
            Ok(None) => None,
            Err(err) => {
                warn!(asset_id = params.a, "cache lookup failed: {}", err);
                None
            }
        }
    }

    /// Bounded retry loop: at most `max_retries + 1` dispatches. Ends when
    /// the entry is resolved, swept or exhausted.
    async fn drive(&self, params: InspectParams, mut dispatch: Dispatch<ItemInfo>) {
        loop {
            while dispatch.attempt_failures.try_recv().is_ok() {}

            let failure = match self.dispatch(&params).await {
                Ok(()) => tokio::select! {
                    _ = &mut dispatch.completed => return,
                    Some(err) = dispatch.attempt_failures.recv() => err,
                    _ = sleep(self.settings.queue_timeout) => InspectError::Timeout,
                },
                Err(err) => err,
            };

            match self.table.retry_or_fail(params.a, self.settings.max_retries).await {
                RetryDecision::Retry(attempt) => {
                    warn!(asset_id = params.a, attempt, "inspect attempt failed ({}), retrying", failure);
                }
                RetryDecision::Exhausted(entry) => {
                    error!(asset_id = params.a, "inspect failed after retries: {}", failure);
                    self.metrics.record_failure();
                    entry.complete(Err(failure));
                    return;
                }
                RetryDecision::Gone => return,
            }
        }
    }

    async fn dispatch(&self, params: &InspectParams) -> Result<(), InspectError> {
        let worker = self
            .pool
            .select()
            .await
            .ok_or(InspectError::NoWorkerAvailable)?;
        worker
            .inspect_item(params.dispatch_owner(), params.a, &params.d)
            .await
            .map_err(|err| {
                warn!(asset_id = params.a, username = worker.username(), "dispatch failed: {}", err);
                InspectError::DispatchFailed(err.0)
            })
    }

    async fn wait(waiter: Waiter<ItemInfo>) -> Result<ItemInfo, InspectError> {
        Self::flatten(waiter.await)
    }

    fn flatten(outcome: Result<Outcome<ItemInfo>, tokio::sync::oneshot::error::RecvError>) -> Result<ItemInfo, InspectError> {
        match outcome {
            Ok(outcome) => outcome,
            Err(_) => Err(InspectError::WorkerProtocol(
                "inspect request dropped before completion".to_string(),
            )),
        }
    }

    /// Correlates a worker result with its pending entry, records provenance
    /// and notifies every waiter. Results without a live entry are dropped.
    pub async fn handle_result(&self, username: &str, item: RawItem) {
        let asset_id = item.item_id;
        let Some(entry) = self.table.resolve(asset_id).await else {
            warn!(asset_id, username, "no inspect request found for result, dropping");
            return;
        };

        match self.persist(&entry.params, &item).await {
            Ok(info) => {
                self.metrics.record_success();
                entry.complete(Ok(info));
            }
            Err(err) => {
                error!(asset_id, "failed to handle inspect result: {:#}", err);
                self.metrics.record_failure();
                entry.complete(Err(InspectError::Persistence(err.to_string())));
            }
        }
    }

    async fn persist(&self, params: &InspectParams, item: &RawItem) -> anyhow::Result<ItemInfo> {
        let now = current_millis();
        let hash = identity_hash(&item.physical_attributes());
        let mut asset = Asset::from_inspection(item, params.stored_owner(), &params.d, hash, now);

        let previous = self.assets.find_latest_by_identity_hash(&asset.identity_hash).await?;
        let kind = classify_transition(
            &asset.snapshot(),
            previous.as_ref().map(Asset::snapshot).as_ref(),
        );
        let record = History::record(&asset, previous.as_ref(), kind, now);
        if self.history.append(&record).await? {
            debug!(asset_id = asset.asset_id, kind = kind.as_str(), "history recorded");
        }

        if let Some(previous) = previous.as_ref().filter(|prev| prev.asset_id == asset.asset_id) {
            asset.created_at = previous.created_at;
        }
        self.assets.upsert(&asset).await?;

        let rankings = self.rankings_for(asset.asset_id).await;
        Ok(ItemInfo::from_asset(&asset, rankings.as_ref()))
    }

    async fn rankings_for(&self, asset_id: u64) -> Option<Rankings> {
        match self.assets.rankings(asset_id).await {
            Ok(rankings) => rankings,
            Err(err) => {
                warn!(asset_id, "failed to load rankings: {}", err);
                None
            }
        }
    }

    async fn handle_event(&self, event: WorkerEvent) {
        match event {
            WorkerEvent::Result { username, item } => self.handle_result(&username, item).await,
            WorkerEvent::Failed { username, asset_id, reason } => {
                warn!(asset_id, username = username.as_str(), "bot reported inspect failure: {}", reason);
                if !self.table.report_failure(asset_id, InspectError::WorkerProtocol(reason)).await {
                    debug!(asset_id, "no inspect request found for failure, dropping");
                }
            }
            WorkerEvent::Throttled { username } => {
                warn!(username = username.as_str(), "bot throttled, removing from pool");
                self.pool.throttle(&username).await;
            }
        }
    }

    pub async fn sweep_stale(&self) -> usize {
        let swept = self.table.sweep_stale(self.settings.stale_after()).await;
        if swept > 0 {
            self.metrics.record_failures(swept);
        }
        swept
    }

    pub async fn sweep_throttled(&self) -> PoolInitReport {
        let released = self.pool.sweep_throttled().await;
        if !released.is_empty() {
            info!("{} bots left cooldown", released.len());
        }
        self.pool.refresh().await
    }

    pub async fn stats(&self) -> StatsSnapshot {
        let counts = self.pool.counts().await;
        StatsSnapshot {
            status: if counts.total > 0 { "ready" } else { "initializing" },
            uptime: self.metrics.uptime_breakdown(),
            bots: counts.into(),
            queue: QueueStats::from_items(self.table.queue_items().await, self.table.capacity()),
            metrics: self.metrics.outcomes(),
            requests: self.metrics.requests().await,
        }
    }

    pub async fn render_prometheus(&self) -> String {
        let counts = self.pool.counts().await;
        self.metrics.render_prometheus(&EngineGauges {
            queue_current: self.table.len().await,
            queue_max: self.table.capacity(),
            bots_ready: counts.ready,
            bots_total: counts.total,
        })
    }

    /// Starts the result pump and the periodic tasks.
    pub fn spawn_background(self: &Arc<Self>, mut events: UnboundedReceiver<WorkerEvent>) -> BackgroundTasks {
        let mut handles = Vec::with_capacity(4);

        let engine = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                engine.handle_event(event).await;
            }
            debug!("result pump finished");
        }));

        let engine = Arc::clone(self);
        handles.push(every(Duration::from_secs(1), move || {
            let engine = Arc::clone(&engine);
            async move { engine.metrics.sample_tick().await }
        }));

        let engine = Arc::clone(self);
        handles.push(every(self.settings.stale_sweep_interval, move || {
            let engine = Arc::clone(&engine);
            async move {
                let swept = engine.sweep_stale().await;
                if swept > 0 {
                    warn!("swept {} stale inspect requests", swept);
                }
            }
        }));

        let engine = Arc::clone(self);
        handles.push(every(self.settings.throttle_sweep_interval, move || {
            let engine = Arc::clone(&engine);
            async move {
                engine.sweep_throttled().await;
            }
        }));

        BackgroundTasks { handles }
    }

    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

fn every<F, Fut>(period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            tick().await;
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use inspect_domain::{
        Attachment, HistoryKind, InspectWorker, WorkerInitError, WorkerSendError,
    };
    use tokio::sync::Mutex;

    use super::*;
    use crate::pool::tests::{credentials, ScriptedConnector};

    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub assets: Mutex<Vec<Asset>>,
        pub history: Mutex<Vec<History>>,
    }

    #[async_trait]
    impl AssetRepository for FakeStore {
        async fn lookup(&self, asset_id: u64, decode_token: &str) -> anyhow::Result<Option<Asset>> {
            let assets = self.assets.lock().await;
            Ok(assets
                .iter()
                .find(|asset| asset.asset_id == asset_id && asset.decode_token == decode_token)
                .cloned())
        }

        async fn upsert(&self, asset: &Asset) -> anyhow::Result<()> {
            let mut assets = self.assets.lock().await;
            assets.retain(|existing| existing.asset_id != asset.asset_id);
            assets.push(asset.clone());
            Ok(())
        }

        async fn find_latest_by_identity_hash(&self, identity_hash: &str) -> anyhow::Result<Option<Asset>> {
            let assets = self.assets.lock().await;
            Ok(assets
                .iter()
                .rev()
                .find(|asset| asset.identity_hash == identity_hash)
                .cloned())
        }

        async fn rankings(&self, _asset_id: u64) -> anyhow::Result<Option<Rankings>> {
            Ok(None)
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl HistoryRepository for FakeStore {
        async fn find_by_asset_id(&self, asset_id: u64) -> anyhow::Result<Option<History>> {
            let history = self.history.lock().await;
            Ok(history.iter().find(|row| row.asset_id == asset_id).cloned())
        }

        async fn append(&self, record: &History) -> anyhow::Result<bool> {
            let mut history = self.history.lock().await;
            if history.iter().any(|row| row.asset_id == record.asset_id) {
                return Ok(false);
            }
            history.push(record.clone());
            Ok(true)
        }
    }

    /// Worker that answers every inspect from a fixed catalog, or reports a
    /// backend failure when `rejection` is set.
    struct EchoWorker {
        username: String,
        sink: Arc<dyn InspectResultSink>,
        catalog: HashMap<u64, RawItem>,
        rejection: Option<String>,
        dispatches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl InspectWorker for EchoWorker {
        fn username(&self) -> &str {
            &self.username
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn inspect_item(&self, _owner: &str, asset_id: u64, _decode: &str) -> Result<(), WorkerSendError> {
            self.dispatches.fetch_add(1, Ordering::SeqCst);
            if let Some(reason) = &self.rejection {
                self.sink.failed(&self.username, asset_id, reason);
            } else if let Some(item) = self.catalog.get(&asset_id) {
                self.sink.deliver(&self.username, item.clone());
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct EchoConnector {
        catalog: HashMap<u64, RawItem>,
        rejection: Option<String>,
        dispatches: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WorkerConnector for EchoConnector {
        async fn connect(
            &self,
            credential: &Credential,
            sink: Arc<dyn InspectResultSink>,
        ) -> Result<Arc<dyn InspectWorker>, WorkerInitError> {
            Ok(Arc::new(EchoWorker {
                username: credential.username.clone(),
                sink,
                catalog: self.catalog.clone(),
                rejection: self.rejection.clone(),
                dispatches: Arc::clone(&self.dispatches),
            }))
        }
    }

    const ACCOUNT: &str = "76561198023809011";
    const LISTING: &str = "4567891234567890123";

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            queue_timeout: Duration::from_millis(20),
            ..EngineSettings::default()
        }
    }

    fn item(asset_id: u64) -> RawItem {
        RawItem {
            item_id: asset_id,
            def_index: Some(7),
            paint_index: Some(282),
            rarity: Some(5),
            quality: Some(4),
            paint_wear: Some(0.2),
            paint_seed: Some(661),
            origin: Some(8),
            ..RawItem::default()
        }
    }

    fn params(owner: &str, asset_id: u64) -> InspectParams {
        InspectParams::from_parts(Some(owner), Some(&asset_id.to_string()), Some("42"), None)
            .expect("params")
    }

    fn listing_params(asset_id: u64) -> InspectParams {
        InspectParams::from_parts(None, Some(&asset_id.to_string()), Some("42"), Some(LISTING))
            .expect("params")
    }

    async fn echo_engine(items: Vec<RawItem>) -> (Arc<InspectEngine>, Arc<FakeStore>, BackgroundTasks) {
        let store = Arc::new(FakeStore::default());
        let connector = Arc::new(EchoConnector {
            catalog: items.into_iter().map(|item| (item.item_id, item)).collect(),
            ..EchoConnector::default()
        });
        let settings = EngineSettings {
            queue_timeout: Duration::from_secs(2),
            ..EngineSettings::default()
        };
        let (engine, events) = InspectEngine::new(settings, connector, store.clone(), store.clone());
        let tasks = engine.spawn_background(events);
        engine.initialize(credentials(2)).await;
        (engine, store, tasks)
    }

    async fn silent_engine(
        settings: EngineSettings,
        bots: usize,
    ) -> (Arc<InspectEngine>, Arc<ScriptedConnector>, Arc<FakeStore>, BackgroundTasks) {
        let store = Arc::new(FakeStore::default());
        let connector = Arc::new(ScriptedConnector::default());
        let (engine, events) = InspectEngine::new(settings, connector.clone(), store.clone(), store.clone());
        let tasks = engine.spawn_background(events);
        engine.initialize(credentials(bots)).await;
        (engine, connector, store, tasks)
    }

    fn total_dispatches(connector: &ScriptedConnector, bots: usize) -> usize {
        (0..bots)
            .filter_map(|idx| connector.worker(&format!("bot_{idx}")))
            .map(|worker| worker.dispatch_count())
            .sum()
    }

    #[tokio::test]
    async fn empty_pool_reports_initializing() {
        let (engine, _connector, _store, tasks) = silent_engine(fast_settings(), 0).await;
        assert_eq!(
            engine.inspect(&params(ACCOUNT, 1), false).await,
            Err(InspectError::Initializing)
        );
        assert_eq!(engine.stats().await.status, "initializing");
        tasks.abort_all();
    }

    #[tokio::test]
    async fn resolved_inspect_is_persisted_then_served_from_cache() {
        let (engine, store, tasks) = echo_engine(vec![item(100)]).await;

        let info = engine.inspect(&params(ACCOUNT, 100), false).await.expect("inspect");
        assert_eq!(info.a, "100");
        assert_eq!(info.s, ACCOUNT);
        assert_eq!(engine.metrics().success_count(), 1);

        let history = store.find_by_asset_id(100).await.expect("history").expect("row");
        assert_eq!(history.kind, HistoryKind::TradedUp);
        assert!(history.prev_asset_id.is_none());

        let cached = engine.inspect(&params(ACCOUNT, 100), false).await.expect("cached");
        assert_eq!(cached, info);
        assert_eq!(engine.metrics().cached_count(), 1);
        assert_eq!(engine.metrics().success_count(), 1);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn provenance_chain_links_new_asset_ids() {
        let (engine, store, tasks) = echo_engine(vec![item(100), item(200), item(300)]).await;

        engine.inspect(&params(ACCOUNT, 100), false).await.expect("first sighting");
        engine.inspect(&listing_params(200), false).await.expect("listing");
        let bought = engine
            .inspect(&params("76561198000000001", 300), false)
            .await
            .expect("purchase");
        assert_eq!(bought.s, "76561198000000001");

        let listing = store.find_by_asset_id(200).await.expect("history").expect("row");
        assert_eq!(listing.kind, HistoryKind::MarketListing);
        assert_eq!(listing.prev_asset_id, Some(100));
        assert_eq!(listing.prev_owner.as_deref(), Some(ACCOUNT));

        let purchase = store.find_by_asset_id(300).await.expect("history").expect("row");
        assert_eq!(purchase.kind, HistoryKind::MarketBuy);
        assert_eq!(purchase.prev_asset_id, Some(200));
        tasks.abort_all();
    }

    #[tokio::test]
    async fn sticker_scrape_is_recorded_for_same_owner() {
        let mut before = item(100);
        before.stickers = vec![Attachment {
            slot: 0,
            sticker_id: 76,
            wear: Some(0.1),
            ..Attachment::default()
        }];
        let mut after = before.clone();
        after.item_id = 101;
        after.stickers[0].wear = Some(0.4);

        let (engine, store, tasks) = echo_engine(vec![before, after]).await;
        engine.inspect(&params(ACCOUNT, 100), false).await.expect("before");
        engine.inspect(&params(ACCOUNT, 101), false).await.expect("after");

        let row = store.find_by_asset_id(101).await.expect("history").expect("row");
        assert_eq!(row.kind, HistoryKind::StickerScrape);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn silent_workers_exhaust_retry_bound() {
        let (engine, connector, _store, tasks) = silent_engine(fast_settings(), 2).await;

        let outcome = engine.inspect(&params(ACCOUNT, 5), false).await;
        assert_eq!(outcome, Err(InspectError::Timeout));
        assert_eq!(total_dispatches(&connector, 2), 4);
        assert_eq!(engine.metrics().failed_count(), 1);
        assert_eq!(engine.stats().await.queue.current, 0);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn late_result_after_exhaustion_is_discarded() {
        let (engine, connector, store, tasks) = silent_engine(fast_settings(), 1).await;

        let outcome = engine.inspect(&params(ACCOUNT, 5), false).await;
        assert_eq!(outcome, Err(InspectError::Timeout));
        assert_eq!(total_dispatches(&connector, 1), 4);

        engine.handle_result("bot_0", item(5)).await;
        assert!(store.assets.lock().await.is_empty());
        assert!(store.history.lock().await.is_empty());
        assert_eq!(engine.metrics().failed_count(), 1);
        assert_eq!(engine.metrics().success_count(), 0);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn joined_caller_keeps_retries_when_first_caller_gives_up() {
        let settings = EngineSettings {
            queue_timeout: Duration::from_millis(50),
            ..EngineSettings::default()
        };
        let (engine, connector, _store, tasks) = silent_engine(settings, 1).await;

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.inspect(&params(ACCOUNT, 9), false).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let joined = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.inspect(&params(ACCOUNT, 9), false).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();

        let outcome = tokio::time::timeout(Duration::from_secs(2), joined)
            .await
            .expect("joined caller finished")
            .expect("join");
        assert_eq!(outcome, Err(InspectError::Timeout));
        assert_eq!(total_dispatches(&connector, 1), 4);
        assert_eq!(engine.stats().await.queue.current, 0);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn backend_failure_retries_without_waiting_for_deadline() {
        let store = Arc::new(FakeStore::default());
        let connector = Arc::new(EchoConnector {
            rejection: Some("busy".to_string()),
            ..EchoConnector::default()
        });
        let settings = EngineSettings {
            queue_timeout: Duration::from_secs(5),
            ..EngineSettings::default()
        };
        let (engine, events) = InspectEngine::new(settings, connector.clone(), store.clone(), store.clone());
        let tasks = engine.spawn_background(events);
        engine.initialize(credentials(1)).await;

        let started = std::time::Instant::now();
        let outcome = engine.inspect(&params(ACCOUNT, 8), false).await;
        assert_eq!(outcome, Err(InspectError::WorkerProtocol("busy".to_string())));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(connector.dispatches.load(Ordering::SeqCst), 4);
        assert_eq!(engine.metrics().failed_count(), 1);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn rejected_requests_are_not_counted() {
        let (engine, _connector, _store, tasks) = silent_engine(fast_settings(), 0).await;
        engine.inspect(&params(ACCOUNT, 1), false).await.ok();
        assert_eq!(engine.metrics().requests().await.current, 0);
        tasks.abort_all();

        let settings = EngineSettings {
            queue_timeout: Duration::from_millis(200),
            max_queue_size: 1,
            ..EngineSettings::default()
        };
        let (engine, _connector, _store, tasks) = silent_engine(settings, 1).await;
        let pending = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.inspect(&params(ACCOUNT, 1), false).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(engine.inspect(&params(ACCOUNT, 2), false).await.is_err());
        assert_eq!(engine.metrics().requests().await.current, 1);
        pending.abort();
        tasks.abort_all();
    }

    #[tokio::test]
    async fn busy_pool_fails_with_no_worker_available() {
        let (engine, connector, _store, tasks) = silent_engine(fast_settings(), 1).await;
        let worker = connector.worker("bot_0").expect("worker");
        worker.available.store(false, Ordering::SeqCst);

        assert_eq!(
            engine.inspect(&params(ACCOUNT, 5), false).await,
            Err(InspectError::NoWorkerAvailable)
        );
        assert_eq!(worker.dispatch_count(), 0);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn send_errors_fail_with_dispatch_failed_after_retries() {
        let (engine, connector, _store, tasks) = silent_engine(fast_settings(), 1).await;
        let worker = connector.worker("bot_0").expect("worker");
        worker.fail_sends.store(true, Ordering::SeqCst);

        assert_eq!(
            engine.inspect(&params(ACCOUNT, 5), false).await,
            Err(InspectError::DispatchFailed("socket closed".to_string()))
        );
        assert_eq!(worker.dispatch_count(), 4);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn full_queue_rejects_new_assets() {
        let settings = EngineSettings {
            queue_timeout: Duration::from_millis(200),
            max_queue_size: 1,
            ..EngineSettings::default()
        };
        let (engine, _connector, _store, tasks) = silent_engine(settings, 1).await;

        let pending = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.inspect(&params(ACCOUNT, 1), false).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            engine.inspect(&params(ACCOUNT, 2), false).await,
            Err(InspectError::QueueFull { current: 1, max: 1 })
        );
        pending.abort();
        tasks.abort_all();
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_dispatch() {
        let settings = EngineSettings {
            queue_timeout: Duration::from_secs(2),
            ..EngineSettings::default()
        };
        let (engine, connector, _store, tasks) = silent_engine(settings, 1).await;

        let callers: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.inspect(&params(ACCOUNT, 77), false).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(engine.stats().await.queue.current, 1);

        engine.handle_result("bot_0", item(77)).await;
        for caller in callers {
            let info = caller.await.expect("join").expect("inspect");
            assert_eq!(info.a, "77");
        }
        assert_eq!(total_dispatches(&connector, 1), 1);
        assert_eq!(engine.metrics().success_count(), 1);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn unsolicited_result_is_dropped() {
        let (engine, _connector, store, tasks) = silent_engine(fast_settings(), 1).await;
        engine.handle_result("bot_0", item(404)).await;

        assert!(store.assets.lock().await.is_empty());
        assert!(store.history.lock().await.is_empty());
        assert_eq!(engine.metrics().success_count(), 0);
        assert_eq!(engine.metrics().failed_count(), 0);
        tasks.abort_all();
    }

    #[tokio::test]
    async fn throttle_notice_removes_worker() {
        let (engine, connector, _store, tasks) = silent_engine(fast_settings(), 2).await;
        assert_eq!(engine.pool().size().await, 2);

        engine
            .handle_event(WorkerEvent::Throttled {
                username: "bot_1".to_string(),
            })
            .await;
        assert_eq!(engine.pool().size().await, 1);
        assert!(engine.pool().is_throttled("bot_1").await);

        engine.inspect(&params(ACCOUNT, 3), false).await.ok();
        let throttled = connector.worker("bot_1").expect("worker");
        assert_eq!(throttled.dispatch_count(), 0);
        tasks.abort_all();
    }
}
