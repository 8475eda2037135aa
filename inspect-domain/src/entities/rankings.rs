// Ranking projection row
// Read-only, produced by the storage layer

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    pub asset_id: u64,
    /// Dense rank by wear, highest wear first.
    pub global_low: u64,
    /// Dense rank by wear, lowest wear first.
    pub global_high: u64,
    /// Like `global_low`, within (paint index, def index, stattrak, souvenir).
    pub low_rank: u64,
    /// Like `global_high`, within (paint index, def index, stattrak, souvenir).
    pub high_rank: u64,
}
