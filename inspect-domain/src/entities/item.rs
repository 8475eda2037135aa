// Item entity
// Raw inspection payload emitted by a worker for one asset id

use serde::{Deserialize, Serialize};

/// Sticker or charm applied to an item, as reported by the game coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Attachment {
    pub slot: u32,
    pub sticker_id: u32,
    #[serde(default)]
    pub wear: Option<f64>,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub tint_id: Option<u32>,
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
    #[serde(default)]
    pub offset_z: Option<f64>,
    #[serde(default)]
    pub pattern: Option<u32>,
}

/// Raw item fields delivered out-of-band for a previously dispatched inspect.
///
/// Field names on the wire follow the coordinator's flat lowercase naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawItem {
    #[serde(rename = "itemid")]
    pub item_id: u64,
    #[serde(rename = "defindex", default)]
    pub def_index: Option<u32>,
    #[serde(rename = "paintindex", default)]
    pub paint_index: Option<u32>,
    #[serde(default)]
    pub rarity: Option<u32>,
    #[serde(default)]
    pub quality: Option<u32>,
    #[serde(rename = "paintwear", default)]
    pub paint_wear: Option<f64>,
    #[serde(rename = "paintseed", default)]
    pub paint_seed: Option<u32>,
    #[serde(rename = "killeaterscoretype", default)]
    pub killeater_score_type: Option<u32>,
    #[serde(rename = "killeatervalue", default)]
    pub killeater_value: Option<u32>,
    #[serde(rename = "customname", default)]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub stickers: Vec<Attachment>,
    #[serde(default)]
    pub keychains: Vec<Attachment>,
    #[serde(default)]
    pub inventory: Option<u32>,
    #[serde(default)]
    pub origin: Option<u32>,
    #[serde(rename = "questid", default)]
    pub quest_id: Option<u32>,
    #[serde(rename = "dropreason", default)]
    pub drop_reason: Option<u32>,
    #[serde(rename = "musicindex", default)]
    pub music_index: Option<u32>,
    #[serde(rename = "entindex", default)]
    pub ent_index: Option<i32>,
    #[serde(rename = "petindex", default)]
    pub pet_index: Option<u32>,
}

impl RawItem {
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
}

/// The immutable physical attributes of an item. Together they identify one
/// physical item across ownership changes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalAttributes {
    pub paint_seed: Option<u32>,
    pub paint_index: Option<u32>,
    pub paint_wear: Option<f64>,
    pub def_index: Option<u32>,
    pub origin: Option<u32>,
    pub rarity: Option<u32>,
    pub quest_id: Option<u32>,
    pub quality: Option<u32>,
    pub drop_reason: Option<u32>,
}
