use std::sync::Arc;

use async_trait::async_trait;
use inspect_domain::ports::{AssetRepository, HealthCheckService};

pub struct DefaultHealthService {
    assets: Arc<dyn AssetRepository>,
}

impl DefaultHealthService {
    pub fn new(assets: Arc<dyn AssetRepository>) -> Self {
        Self { assets }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_store(&self) -> anyhow::Result<bool> {
        self.assets.ping().await.map(|_| true)
    }
}
