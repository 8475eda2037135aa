use sha1::{Digest, Sha1};

use crate::entities::PhysicalAttributes;

const IDENTITY_HASH_LEN: usize = 8;
const SEPARATOR: &str = "-";

/// Short digest of the nine physical attributes, stable across owners and
/// asset ids. Attribute order is part of the format and must not change.
pub fn identity_hash(attrs: &PhysicalAttributes) -> String {
    let components = [
        int_component(attrs.paint_seed),
        int_component(attrs.paint_index),
        wear_component(attrs.paint_wear),
        int_component(attrs.def_index),
        int_component(attrs.origin),
        int_component(attrs.rarity),
        int_component(attrs.quest_id),
        int_component(attrs.quality),
        int_component(attrs.drop_reason),
    ];
    let digest = Sha1::digest(components.join(SEPARATOR).as_bytes());

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out.truncate(IDENTITY_HASH_LEN);
    out
}

fn int_component(value: Option<u32>) -> String {
    value.unwrap_or(0).to_string()
}

// Shortest round-trip form with exponent notation outside [1e-6, 1e21),
// so 0.25 renders as "0.25", 1e-7 as "1e-7" and zero as "0".
fn wear_component(value: Option<f64>) -> String {
    match value {
        Some(wear) if wear != 0.0 && wear.is_finite() => {
            let magnitude = wear.abs();
            if magnitude < 1e-6 {
                format!("{wear:e}")
            } else if magnitude >= 1e21 {
                format!("{wear:e}").replacen('e', "e+", 1)
            } else {
                format!("{wear}")
            }
        }
        _ => "0".to_string(),
    }
}
