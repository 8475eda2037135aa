use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use inspect_application::{AppState, InspectEngine, WorkerEvent};
use inspect_infrastructure::{
    AccountsFileRepository, AppConfig, DefaultHealthService, GatewayConnector, HttpPingService,
    MemoryStore,
};

pub struct AppContext {
    pub state: AppState,
    pub accounts: AccountsFileRepository,
    pub events: UnboundedReceiver<WorkerEvent>,
}

impl AppContext {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let runtime_config = config.to_runtime_config();

        let store = Arc::new(MemoryStore::new());
        let connector = Arc::new(GatewayConnector::new(config.to_gateway_settings()));
        let (engine, events) = InspectEngine::new(
            config.to_engine_settings(),
            connector,
            store.clone(),
            store.clone(),
        );

        let ping_service = HttpPingService::new(
            runtime_config.ping_url.clone(),
            runtime_config.request_timeout_seconds,
        )?;
        if ping_service.is_enabled() {
            info!("inspect ping enabled");
        }

        let state = AppState {
            config: runtime_config,
            engine,
            ping_service: Arc::new(ping_service),
            health_service: Arc::new(DefaultHealthService::new(store)),
        };

        Ok(Self {
            state,
            accounts: AccountsFileRepository::new(config.accounts_file.as_deref()),
            events,
        })
    }
}
