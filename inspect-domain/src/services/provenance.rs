use crate::entities::{Attachment, ItemSnapshot};
use crate::value_objects::{is_persistent_account, HistoryKind};

/// Attachment slots compared between snapshots.
const ATTACHMENT_SLOTS: [u32; 5] = [0, 1, 2, 3, 4];

const ORIGIN_PURCHASED_INGAME: u32 = 1;
const ORIGIN_UNBOXED: u32 = 2;
const ORIGIN_CRAFTED: u32 = 3;
const ORIGIN_DROPPED: u32 = 4;
const ORIGIN_TRADED_UP: u32 = 8;

#[derive(Debug, Clone, Copy)]
enum AttachmentChange {
    Removed,
    Applied,
    Scraped,
    Replaced,
}

/// Classifies the transition from `previous` (the latest stored snapshot with
/// the same identity hash) to `current`. Exactly one kind per transition;
/// anything not covered resolves to [`HistoryKind::Unknown`].
pub fn classify_transition(current: &ItemSnapshot<'_>, previous: Option<&ItemSnapshot<'_>>) -> HistoryKind {
    let Some(previous) = previous else {
        return kind_for_origin(current.origin);
    };

    if previous.owner != current.owner {
        return classify_owner_change(previous.owner, current.owner);
    }

    if let Some(change) = detect_attachment_change(current.stickers, previous.stickers) {
        return match change {
            AttachmentChange::Removed => HistoryKind::StickerRemove,
            AttachmentChange::Applied => HistoryKind::StickerApply,
            AttachmentChange::Scraped => HistoryKind::StickerScrape,
            AttachmentChange::Replaced => HistoryKind::StickerChange,
        };
    }
    if let Some(change) = detect_attachment_change(current.keychains, previous.keychains) {
        return match change {
            AttachmentChange::Removed => HistoryKind::KeychainRemoved,
            AttachmentChange::Applied => HistoryKind::KeychainAdded,
            AttachmentChange::Scraped => HistoryKind::KeychainScrape,
            AttachmentChange::Replaced => HistoryKind::KeychainChanged,
        };
    }

    match (previous.custom_name, current.custom_name) {
        (None, Some(_)) => HistoryKind::NametagAdded,
        (Some(_), None) => HistoryKind::NametagRemoved,
        _ => HistoryKind::Unknown,
    }
}

fn kind_for_origin(origin: Option<u32>) -> HistoryKind {
    match origin {
        Some(ORIGIN_TRADED_UP) => HistoryKind::TradedUp,
        Some(ORIGIN_DROPPED) => HistoryKind::Dropped,
        Some(ORIGIN_PURCHASED_INGAME) => HistoryKind::PurchasedIngame,
        Some(ORIGIN_UNBOXED) => HistoryKind::Unboxed,
        Some(ORIGIN_CRAFTED) => HistoryKind::Crafted,
        _ => HistoryKind::Unknown,
    }
}

fn classify_owner_change(previous_owner: &str, current_owner: &str) -> HistoryKind {
    match (
        is_persistent_account(previous_owner),
        is_persistent_account(current_owner),
    ) {
        (true, false) => HistoryKind::MarketListing,
        (true, true) => HistoryKind::Trade,
        (false, _) => HistoryKind::MarketBuy,
    }
}

fn detect_attachment_change(current: &[Attachment], previous: &[Attachment]) -> Option<AttachmentChange> {
    for slot in ATTACHMENT_SLOTS {
        let now = current.iter().find(|attachment| attachment.slot == slot);
        let before = previous.iter().find(|attachment| attachment.slot == slot);
        match (now, before) {
            (None, Some(_)) => return Some(AttachmentChange::Removed),
            (Some(_), None) => return Some(AttachmentChange::Applied),
            (Some(now), Some(before)) => {
                // Equal ids are checked first: wear progression is not a swap.
                if now.sticker_id == before.sticker_id {
                    if now.wear.unwrap_or(0.0) > before.wear.unwrap_or(0.0) {
                        return Some(AttachmentChange::Scraped);
                    }
                } else {
                    return Some(AttachmentChange::Replaced);
                }
            }
            (None, None) => {}
        }
    }
    None
}
