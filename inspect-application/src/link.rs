use inspect_domain::InspectQuery;
use serde::Serialize;

use crate::AppError;

const PREVIEW_ACTION: &str = "csgo_econ_action_preview";
const NO_OWNER: &str = "0";

/// Validated inspect parameters. `s` is an account owner, `m` a market
/// listing; the unused one is `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectParams {
    pub s: String,
    pub a: u64,
    pub d: String,
    pub m: String,
}

impl InspectParams {
    pub fn from_query(query: &InspectQuery) -> Result<Self, AppError> {
        match query.url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
            Some(link) => parse_inspect_link(link),
            None => Self::from_parts(
                query.s.as_deref(),
                query.a.as_deref(),
                query.d.as_deref(),
                query.m.as_deref(),
            ),
        }
    }

    pub fn from_parts(
        s: Option<&str>,
        a: Option<&str>,
        d: Option<&str>,
        m: Option<&str>,
    ) -> Result<Self, AppError> {
        let a = a
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::BadRequest("missing asset id `a`".to_string()))?;
        let a = a
            .parse::<u64>()
            .map_err(|_| AppError::BadRequest(format!("invalid asset id `{a}`")))?;
        let d = d
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::BadRequest("missing decode token `d`".to_string()))?;
        Ok(Self {
            s: owner_or_default(s),
            a,
            d: d.to_string(),
            m: owner_or_default(m),
        })
    }

    /// Owner token persisted with the asset.
    pub fn stored_owner(&self) -> &str {
        if self.m != NO_OWNER {
            &self.m
        } else {
            &self.s
        }
    }

    /// Owner token handed to the worker.
    pub fn dispatch_owner(&self) -> &str {
        if self.s != NO_OWNER {
            &self.s
        } else {
            &self.m
        }
    }
}

fn owner_or_default(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(NO_OWNER)
        .to_string()
}

/// Parses `steam://rungame/730/<id>/+csgo_econ_action_preview S<s>A<a>D<d>`
/// (or `M<m>` in place of `S<s>`), with either a space or `%20` before the
/// parameters.
pub fn parse_inspect_link(link: &str) -> Result<InspectParams, AppError> {
    let invalid = || AppError::BadRequest(format!("invalid inspect link `{link}`"));
    let decoded = link.trim().replace("%20", " ");
    let start = decoded.find(PREVIEW_ACTION).ok_or_else(invalid)?;
    let params = decoded[start + PREVIEW_ACTION.len()..].trim_start();

    let (kind, rest) = params.split_at(params.chars().next().map_or(0, char::len_utf8));
    let a_at = rest.find('A').ok_or_else(invalid)?;
    let owner = &rest[..a_at];
    let rest = &rest[a_at + 1..];
    let d_at = rest.find('D').ok_or_else(invalid)?;
    let asset = &rest[..d_at];
    let decode = rest[d_at + 1..].trim();

    if owner.is_empty() || !owner.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    match kind {
        "S" => InspectParams::from_parts(Some(owner), Some(asset), Some(decode), None),
        "M" => InspectParams::from_parts(None, Some(asset), Some(decode), Some(owner)),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_link_with_encoded_space() {
        let params = parse_inspect_link(
            "steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20S76561198023809011A35675800220D12026419764860007457",
        )
        .expect("link");
        assert_eq!(params.s, "76561198023809011");
        assert_eq!(params.a, 35675800220);
        assert_eq!(params.d, "12026419764860007457");
        assert_eq!(params.m, "0");
        assert_eq!(params.stored_owner(), "76561198023809011");
        assert_eq!(params.dispatch_owner(), "76561198023809011");
    }

    #[test]
    fn parses_market_link_with_plain_space() {
        let params = parse_inspect_link(
            "steam://rungame/730/76561202255233023/+csgo_econ_action_preview M4567891234567890123A31415D2718",
        )
        .expect("link");
        assert_eq!(params.s, "0");
        assert_eq!(params.m, "4567891234567890123");
        assert_eq!(params.stored_owner(), "4567891234567890123");
        assert_eq!(params.dispatch_owner(), "4567891234567890123");
    }

    #[test]
    fn rejects_malformed_links() {
        for link in [
            "https://example.com",
            "steam://rungame/730/1/+csgo_econ_action_preview%20X1A2D3",
            "steam://rungame/730/1/+csgo_econ_action_preview%20S1A2",
            "steam://rungame/730/1/+csgo_econ_action_preview%20S1AxyzD3",
            "steam://rungame/730/1/+csgo_econ_action_preview%20S1A2D",
        ] {
            assert!(
                matches!(parse_inspect_link(link), Err(AppError::BadRequest(_))),
                "accepted {link}"
            );
        }
    }

    #[test]
    fn decomposed_parts_default_missing_owners() {
        let params = InspectParams::from_parts(None, Some("42"), Some("7"), None).expect("params");
        assert_eq!(params.s, "0");
        assert_eq!(params.m, "0");

        assert!(InspectParams::from_parts(Some("1"), Some("-3"), Some("7"), None).is_err());
        assert!(InspectParams::from_parts(Some("1"), Some("3"), Some(" "), None).is_err());
        assert!(InspectParams::from_parts(Some("1"), None, Some("7"), None).is_err());
    }

    #[test]
    fn query_prefers_link_over_parts() {
        let query = InspectQuery {
            url: Some(
                "steam://rungame/730/1/+csgo_econ_action_preview%20S76561198000000001A5D6".to_string(),
            ),
            a: Some("999".to_string()),
            ..InspectQuery::default()
        };
        let params = InspectParams::from_query(&query).expect("params");
        assert_eq!(params.a, 5);
        assert_eq!(params.d, "6");
    }
}
