// History event kind value object

use serde::{Deserialize, Serialize};

/// How an item's provenance changed between two observed snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryKind {
    TradedUp,
    Dropped,
    PurchasedIngame,
    Unboxed,
    Crafted,
    Trade,
    MarketBuy,
    MarketListing,
    StickerApply,
    StickerRemove,
    StickerScrape,
    StickerChange,
    KeychainAdded,
    KeychainRemoved,
    KeychainScrape,
    KeychainChanged,
    NametagAdded,
    NametagRemoved,
    Unknown,
}

impl HistoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::TradedUp => "TRADED_UP",
            HistoryKind::Dropped => "DROPPED",
            HistoryKind::PurchasedIngame => "PURCHASED_INGAME",
            HistoryKind::Unboxed => "UNBOXED",
            HistoryKind::Crafted => "CRAFTED",
            HistoryKind::Trade => "TRADE",
            HistoryKind::MarketBuy => "MARKET_BUY",
            HistoryKind::MarketListing => "MARKET_LISTING",
            HistoryKind::StickerApply => "STICKER_APPLY",
            HistoryKind::StickerRemove => "STICKER_REMOVE",
            HistoryKind::StickerScrape => "STICKER_SCRAPE",
            HistoryKind::StickerChange => "STICKER_CHANGE",
            HistoryKind::KeychainAdded => "KEYCHAIN_ADDED",
            HistoryKind::KeychainRemoved => "KEYCHAIN_REMOVED",
            HistoryKind::KeychainScrape => "KEYCHAIN_SCRAPE",
            HistoryKind::KeychainChanged => "KEYCHAIN_CHANGED",
            HistoryKind::NametagAdded => "NAMETAG_ADDED",
            HistoryKind::NametagRemoved => "NAMETAG_REMOVED",
            HistoryKind::Unknown => "UNKNOWN",
        }
    }
}
