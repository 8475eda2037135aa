use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use inspect_domain::{Asset, AssetRepository, History, HistoryRepository, Rankings};

struct StoredAsset {
    asset: Asset,
    sequence: u64,
}

#[derive(Default)]
struct StoreState {
    assets: HashMap<u64, StoredAsset>,
    history: HashMap<u64, History>,
    sequence: u64,
}

/// Asset and history store kept in process memory. Recency follows write
/// order; rankings are computed on read.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn asset_count(&self) -> usize {
        self.state.read().await.assets.len()
    }
}

#[async_trait]
impl AssetRepository for MemoryStore {
    async fn lookup(&self, asset_id: u64, decode_token: &str) -> anyhow::Result<Option<Asset>> {
        let state = self.state.read().await;
        Ok(state
            .assets
            .get(&asset_id)
            .filter(|stored| stored.asset.decode_token == decode_token)
            .map(|stored| stored.asset.clone()))
    }

    async fn upsert(&self, asset: &Asset) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        state.sequence += 1;
        let sequence = state.sequence;
        let mut asset = asset.clone();
        if let Some(existing) = state.assets.get(&asset.asset_id) {
            asset.created_at = existing.asset.created_at;
        }
        state.assets.insert(asset.asset_id, StoredAsset { asset, sequence });
        Ok(())
    }

    async fn find_latest_by_identity_hash(&self, identity_hash: &str) -> anyhow::Result<Option<Asset>> {
        let state = self.state.read().await;
        Ok(state
            .assets
            .values()
            .filter(|stored| stored.asset.identity_hash == identity_hash)
            .max_by_key(|stored| stored.sequence)
            .map(|stored| stored.asset.clone()))
    }

    async fn rankings(&self, asset_id: u64) -> anyhow::Result<Option<Rankings>> {
        let state = self.state.read().await;
        let Some(target) = state.assets.get(&asset_id).map(|stored| &stored.asset) else {
            return Ok(None);
        };
        let Some(wear) = target.paint_wear.filter(|wear| *wear > 0.0) else {
            return Ok(None);
        };

        let worn = || {
            state
                .assets
                .values()
                .map(|stored| &stored.asset)
                .filter(|asset| asset.paint_wear.is_some_and(|value| value > 0.0))
        };
        let global = distinct_wears(worn());
        let partition = distinct_wears(worn().filter(|asset| same_partition(asset, target)));

        Ok(Some(Rankings {
            asset_id,
            global_low: dense_rank_desc(&global, wear),
            global_high: dense_rank_asc(&global, wear),
            low_rank: dense_rank_desc(&partition, wear),
            high_rank: dense_rank_asc(&partition, wear),
        }))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn find_by_asset_id(&self, asset_id: u64) -> anyhow::Result<Option<History>> {
        Ok(self.state.read().await.history.get(&asset_id).cloned())
    }

    async fn append(&self, history: &History) -> anyhow::Result<bool> {
        let mut state = self.state.write().await;
        if state.history.contains_key(&history.asset_id) {
            return Ok(false);
        }
        state.history.insert(history.asset_id, history.clone());
        Ok(true)
    }
}

fn same_partition(asset: &Asset, target: &Asset) -> bool {
    asset.paint_index == target.paint_index
        && asset.def_index == target.def_index
        && asset.is_stattrak == target.is_stattrak
        && asset.is_souvenir == target.is_souvenir
}

fn distinct_wears<'a>(assets: impl Iterator<Item = &'a Asset>) -> Vec<f64> {
    let mut wears: Vec<f64> = assets.filter_map(|asset| asset.paint_wear).collect();
    wears.sort_by(f64::total_cmp);
    wears.dedup();
    wears
}

fn dense_rank_desc(distinct: &[f64], wear: f64) -> u64 {
    distinct.iter().filter(|value| **value > wear).count() as u64 + 1
}

fn dense_rank_asc(distinct: &[f64], wear: f64) -> u64 {
    distinct.iter().filter(|value| **value < wear).count() as u64 + 1
}
