// Asset entity
// Current-known snapshot of a physical item, keyed by asset id

use serde::{Deserialize, Serialize};

use crate::entities::{Attachment, PhysicalAttributes, RawItem};

const SOUVENIR_QUALITY: u32 = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: u64,
    pub decode_token: String,
    pub owner: String,
    pub identity_hash: String,
    pub paint_seed: Option<u32>,
    pub paint_index: Option<u32>,
    pub paint_wear: Option<f64>,
    pub def_index: Option<u32>,
    pub origin: Option<u32>,
    pub rarity: Option<u32>,
    pub quest_id: Option<u32>,
    pub quality: Option<u32>,
    pub drop_reason: Option<u32>,
    pub custom_name: Option<String>,
    pub stickers: Vec<Attachment>,
    pub keychains: Vec<Attachment>,
    pub killeater_score_type: Option<u32>,
    pub killeater_value: Option<u32>,
    pub inventory: Option<u32>,
    pub pet_index: Option<u32>,
    pub music_index: Option<u32>,
    pub ent_index: Option<i32>,
    pub is_stattrak: bool,
    pub is_souvenir: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Asset {
    pub fn from_inspection(
        item: &RawItem,
        owner: &str,
        decode_token: &str,
        identity_hash: String,
        now_ms: i64,
    ) -> Self {
        Self {
            asset_id: item.item_id,
            decode_token: decode_token.to_string(),
            owner: owner.to_string(),
            identity_hash,
            paint_seed: item.paint_seed,
            paint_index: item.paint_index,
            paint_wear: item.paint_wear,
            def_index: item.def_index,
            origin: item.origin,
            rarity: item.rarity,
            quest_id: item.quest_id,
            quality: item.quality,
            drop_reason: item.drop_reason,
            custom_name: item.custom_name.clone().filter(|name| !name.is_empty()),
            stickers: item.stickers.clone(),
            keychains: item.keychains.clone(),
            killeater_score_type: item.killeater_score_type,
            killeater_value: item.killeater_value,
            inventory: item.inventory,
            pet_index: item.pet_index,
            music_index: item.music_index,
            ent_index: item.ent_index,
            is_stattrak: item.killeater_value.is_some(),
            is_souvenir: item.quality == Some(SOUVENIR_QUALITY),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn physical_attributes(&self) -> PhysicalAttributes {
        PhysicalAttributes {
            paint_seed: self.paint_seed,
            paint_index: self.paint_index,
            paint_wear: self.paint_wear,
            def_index: self.def_index,
            origin: self.origin,
            rarity: self.rarity,
            quest_id: self.quest_id,
            quality: self.quality,
            drop_reason: self.drop_reason,
        }
    }

    pub fn snapshot(&self) -> ItemSnapshot<'_> {
        ItemSnapshot {
            owner: &self.owner,
            origin: self.origin,
            stickers: &self.stickers,
            keychains: &self.keychains,
            custom_name: self.custom_name.as_deref(),
        }
    }
}

/// The provenance-relevant view of one observation of an item.
#[derive(Debug, Clone, Copy)]
pub struct ItemSnapshot<'a> {
    pub owner: &'a str,
    pub origin: Option<u32>,
    pub stickers: &'a [Attachment],
    pub keychains: &'a [Attachment],
    pub custom_name: Option<&'a str>,
}
