use inspect_domain::{
    is_persistent_account, origin_name, quality_name, rarity_name, wear_name, Asset, Attachment,
    Rankings,
};
use serde::Serialize;

use crate::pool::PoolCounts;

/// Response body of a successful inspect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemInfoResponse {
    pub iteminfo: ItemInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemInfo {
    pub itemid: String,
    pub floatid: String,
    pub a: String,
    pub d: String,
    pub s: String,
    pub m: String,
    pub origin: Option<u32>,
    pub quality: Option<u32>,
    pub rarity: Option<u32>,
    pub paintseed: Option<u32>,
    pub defindex: Option<u32>,
    pub paintindex: Option<u32>,
    pub floatvalue: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killeaterscoretype: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killeatervalue: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub petindex: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub musicindex: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entindex: Option<i32>,
    pub stickers: Vec<AttachmentInfo>,
    pub keychains: Vec<AttachmentInfo>,
    pub is_stattrak: bool,
    pub is_souvenir: bool,
    pub wear_name: Option<&'static str>,
    pub rarity_name: Option<&'static str>,
    pub quality_name: Option<&'static str>,
    pub origin_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_rank: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_rank: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_low: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_high: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub sticker_id: u32,
    pub slot: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wear: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_z: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<u32>,
}

impl From<&Attachment> for AttachmentInfo {
    fn from(attachment: &Attachment) -> Self {
        Self {
            sticker_id: attachment.sticker_id,
            slot: attachment.slot,
            wear: attachment.wear,
            scale: attachment.scale,
            rotation: attachment.rotation,
            tint_id: attachment.tint_id,
            offset_x: attachment.offset_x,
            offset_y: attachment.offset_y,
            offset_z: attachment.offset_z,
            pattern: attachment.pattern,
        }
    }
}

impl ItemInfo {
    pub fn from_asset(asset: &Asset, rankings: Option<&Rankings>) -> Self {
        let (s, m) = if is_persistent_account(&asset.owner) {
            (asset.owner.clone(), "0".to_string())
        } else {
            ("0".to_string(), asset.owner.clone())
        };
        let floatvalue = asset.paint_wear.unwrap_or(0.0);
        Self {
            itemid: asset.asset_id.to_string(),
            floatid: asset.asset_id.to_string(),
            a: asset.asset_id.to_string(),
            d: asset.decode_token.clone(),
            s,
            m,
            origin: asset.origin,
            quality: asset.quality,
            rarity: asset.rarity,
            paintseed: asset.paint_seed,
            defindex: asset.def_index,
            paintindex: asset.paint_index,
            floatvalue,
            customname: asset.custom_name.clone(),
            killeaterscoretype: asset.killeater_score_type,
            killeatervalue: asset.killeater_value,
            inventory: asset.inventory,
            petindex: asset.pet_index,
            musicindex: asset.music_index,
            entindex: asset.ent_index,
            stickers: asset.stickers.iter().map(AttachmentInfo::from).collect(),
            keychains: asset.keychains.iter().map(AttachmentInfo::from).collect(),
            is_stattrak: asset.is_stattrak,
            is_souvenir: asset.is_souvenir,
            wear_name: (floatvalue > 0.0).then(|| wear_name(floatvalue)),
            rarity_name: asset.rarity.and_then(rarity_name),
            quality_name: asset.quality.and_then(quality_name),
            origin_name: asset.origin.and_then(origin_name),
            low_rank: rankings.map(|rank| rank.low_rank),
            high_rank: rankings.map(|rank| rank.high_rank),
            global_low: rankings.map(|rank| rank.global_low),
            global_high: rankings.map(|rank| rank.global_high),
        }
    }

    pub fn into_response(self) -> ItemInfoResponse {
        ItemInfoResponse { iteminfo: self }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub status: &'static str,
    pub uptime: Uptime,
    pub bots: BotStats,
    pub queue: QueueStats,
    pub metrics: OutcomeStats,
    pub requests: RequestStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Uptime {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub formatted: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotStats {
    pub ready: usize,
    pub busy: usize,
    pub total: usize,
    pub utilization: String,
}

impl From<PoolCounts> for BotStats {
    fn from(counts: PoolCounts) -> Self {
        Self {
            ready: counts.ready,
            busy: counts.busy,
            total: counts.total,
            utilization: percent(counts.busy as u64, counts.total as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub current: usize,
    pub max: usize,
    pub utilization: String,
    pub avg_processing_time: String,
    pub items: Vec<QueueItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub asset_id: u64,
    pub elapsed_time: u64,
    pub retry_count: u32,
}

impl QueueStats {
    pub fn from_items(items: Vec<QueueItem>, max: usize) -> Self {
        let current = items.len();
        let average = if items.is_empty() {
            0
        } else {
            items.iter().map(|item| item.elapsed_time).sum::<u64>() / items.len() as u64
        };
        Self {
            current,
            max,
            utilization: percent(current as u64, max as u64),
            avg_processing_time: format!("{average}ms"),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeStats {
    pub success: Rate,
    pub cached: Rate,
    pub failed: Rate,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rate {
    pub rate: String,
    pub count: u64,
}

impl Rate {
    pub fn of(count: u64, total: u64) -> Self {
        Self {
            rate: percent(count, total),
            count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestStats {
    pub history: Vec<u64>,
    pub current: u64,
    pub average: String,
}

fn percent(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", part as f64 / whole as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use inspect_domain::RawItem;

    use super::*;

    fn sample_asset(owner: &str) -> Asset {
        let item = RawItem {
            item_id: 35675800220,
            def_index: Some(7),
            paint_index: Some(282),
            rarity: Some(5),
            quality: Some(9),
            paint_wear: Some(0.2),
            origin: Some(8),
            killeater_value: Some(12),
            stickers: vec![Attachment {
                slot: 1,
                sticker_id: 5935,
                wear: Some(0.1),
                ..Attachment::default()
            }],
            ..RawItem::default()
        };
        Asset::from_inspection(&item, owner, "12026419764860007457", "deadbeef".into(), 0)
    }

    #[test]
    fn owner_is_split_into_s_and_m() {
        let info = ItemInfo::from_asset(&sample_asset("76561198023809011"), None);
        assert_eq!(info.s, "76561198023809011");
        assert_eq!(info.m, "0");

        let info = ItemInfo::from_asset(&sample_asset("4567891234567890123"), None);
        assert_eq!(info.s, "0");
        assert_eq!(info.m, "4567891234567890123");
    }

    #[test]
    fn item_info_serializes_names_and_rankings() {
        let rankings = Rankings {
            asset_id: 35675800220,
            global_low: 10,
            global_high: 2,
            low_rank: 3,
            high_rank: 1,
        };
        let info = ItemInfo::from_asset(&sample_asset("76561198023809011"), Some(&rankings));
        let json = serde_json::to_value(info.into_response()).expect("serialize");
        let item = &json["iteminfo"];
        assert_eq!(item["a"], "35675800220");
        assert_eq!(item["wear_name"], "Field-Tested");
        assert_eq!(item["quality_name"], "StatTrak™");
        assert_eq!(item["rarity_name"], "Classified");
        assert_eq!(item["origin_name"], "Found in Crate");
        assert_eq!(item["is_stattrak"], true);
        assert_eq!(item["low_rank"], 3);
        assert_eq!(item["stickers"][0]["stickerId"], 5935);
        assert!(item.get("customname").is_none());
    }

    #[test]
    fn queue_stats_average_elapsed_time() {
        let stats = QueueStats::from_items(
            vec![
                QueueItem {
                    asset_id: 1,
                    elapsed_time: 100,
                    retry_count: 0,
                },
                QueueItem {
                    asset_id: 2,
                    elapsed_time: 300,
                    retry_count: 2,
                },
            ],
            100,
        );
        assert_eq!(stats.utilization, "2.00%");
        assert_eq!(stats.avg_processing_time, "200ms");
    }
}
