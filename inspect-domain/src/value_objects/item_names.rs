// Static display names for item attribute codes

pub fn wear_name(wear: f64) -> &'static str {
    if wear < 0.07 {
        "Factory New"
    } else if wear < 0.15 {
        "Minimal Wear"
    } else if wear < 0.38 {
        "Field-Tested"
    } else if wear < 0.45 {
        "Well-Worn"
    } else {
        "Battle-Scarred"
    }
}

pub fn quality_name(quality: u32) -> Option<&'static str> {
    let name = match quality {
        0 => "Normal",
        1 => "Genuine",
        2 => "Vintage",
        3 => "★",
        4 => "Unique",
        5 => "Community",
        6 => "Valve",
        7 => "Prototype",
        8 => "Customized",
        9 => "StatTrak™",
        10 => "Completed",
        11 => "haunted",
        12 => "Souvenir",
        _ => return None,
    };
    Some(name)
}

pub fn rarity_name(rarity: u32) -> Option<&'static str> {
    let name = match rarity {
        1 => "Consumer Grade",
        2 => "Industrial Grade",
        3 => "Mil-Spec Grade",
        4 => "Restricted",
        5 => "Classified",
        6 => "Covert",
        7 => "Contraband",
        _ => return None,
    };
    Some(name)
}

pub fn origin_name(origin: u32) -> Option<&'static str> {
    let name = match origin {
        0 => "Timed Drop",
        1 => "Achievement",
        2 => "Purchased",
        3 => "Traded",
        4 => "Crafted",
        5 => "Store Promotion",
        6 => "Gifted",
        7 => "Support Granted",
        8 => "Found in Crate",
        9 => "Earned",
        10 => "Third-Party Promotion",
        11 => "Wrapped Gift",
        12 => "Halloween Drop",
        13 => "Steam Purchase",
        14 => "Foreign Item",
        15 => "CD Key",
        16 => "Collection Reward",
        17 => "Preview Item",
        18 => "Steam Workshop Contribution",
        19 => "Periodic Score Reward",
        20 => "Recycling",
        21 => "Tournament Drop",
        22 => "Stock Item",
        23 => "Quest Reward",
        24 => "Level Up Reward",
        _ => return None,
    };
    Some(name)
}
