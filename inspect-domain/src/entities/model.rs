use serde::{Deserialize, Serialize};

/// Inbound inspect query: either a full inspect link or its decomposed parts.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InspectQuery {
    #[serde(default, alias = "link")]
    pub url: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub m: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub refresh: bool,
}

impl InspectQuery {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.s.is_none() && self.a.is_none() && self.d.is_none() && self.m.is_none()
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(matches!(
        raw.as_deref().map(str::trim),
        Some("true") | Some("1") | Some("yes")
    ))
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub allow_refresh: bool,
    pub ping_url: Option<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            api_token: None,
            allow_refresh: true,
            ping_url: None,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
