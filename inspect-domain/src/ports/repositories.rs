use async_trait::async_trait;

use crate::entities::{Asset, History, Rankings};

#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Cached snapshot for an asset id, only when the decode token matches.
    async fn lookup(&self, asset_id: u64, decode_token: &str) -> anyhow::Result<Option<Asset>>;
    /// Inserts or replaces the snapshot keyed by `asset.asset_id`.
    async fn upsert(&self, asset: &Asset) -> anyhow::Result<()>;
    /// Most recently written snapshot carrying `identity_hash`.
    async fn find_latest_by_identity_hash(&self, identity_hash: &str) -> anyhow::Result<Option<Asset>>;
    async fn rankings(&self, asset_id: u64) -> anyhow::Result<Option<Rankings>>;
    async fn ping(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn find_by_asset_id(&self, asset_id: u64) -> anyhow::Result<Option<History>>;
    /// Returns `false` without writing when a row for the asset id already exists.
    async fn append(&self, history: &History) -> anyhow::Result<bool>;
}
