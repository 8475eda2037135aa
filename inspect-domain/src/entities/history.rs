// History entity
// Append-only provenance event linking an asset id to its predecessor

use serde::{Deserialize, Serialize};

use crate::entities::{Asset, Attachment};
use crate::value_objects::HistoryKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub identity_hash: String,
    pub asset_id: u64,
    pub prev_asset_id: Option<u64>,
    pub owner: String,
    pub prev_owner: Option<String>,
    pub decode_token: String,
    pub stickers: Vec<Attachment>,
    pub keychains: Vec<Attachment>,
    pub prev_stickers: Option<Vec<Attachment>>,
    pub prev_keychains: Option<Vec<Attachment>>,
    pub kind: HistoryKind,
    pub created_at: i64,
}

impl History {
    pub fn record(current: &Asset, previous: Option<&Asset>, kind: HistoryKind, now_ms: i64) -> Self {
        Self {
            identity_hash: current.identity_hash.clone(),
            asset_id: current.asset_id,
            prev_asset_id: previous.map(|asset| asset.asset_id),
            owner: current.owner.clone(),
            prev_owner: previous.map(|asset| asset.owner.clone()),
            decode_token: current.decode_token.clone(),
            stickers: current.stickers.clone(),
            keychains: current.keychains.clone(),
            prev_stickers: previous.map(|asset| asset.stickers.clone()),
            prev_keychains: previous.map(|asset| asset.keychains.clone()),
            kind,
            created_at: now_ms,
        }
    }
}
