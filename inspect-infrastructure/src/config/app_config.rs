use std::env;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use inspect_application::EngineSettings;
use inspect_domain::RuntimeConfig;

use crate::services::GatewaySettings;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub accounts_file: Option<String>,
    pub gateway_url: String,
    pub proxy_url: Option<String>,
    pub allow_refresh: bool,
    pub ping_url: Option<String>,
    pub queue_timeout_ms: u64,
    pub max_retries: u32,
    pub max_queue_size: usize,
    pub bot_batch_size: usize,
    pub bot_init_attempts: u32,
    pub bot_login_timeout_seconds: u64,
    pub throttle_cooldown_minutes: u64,
    pub stale_sweep_seconds: u64,
    pub throttle_sweep_seconds: u64,
    pub request_window_seconds: usize,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            api_token: None,
            accounts_file: None,
            gateway_url: "ws://127.0.0.1:3001".to_string(),
            proxy_url: None,
            allow_refresh: false,
            ping_url: None,
            queue_timeout_ms: 5_000,
            max_retries: 3,
            max_queue_size: 100,
            bot_batch_size: 100,
            bot_init_attempts: 3,
            bot_login_timeout_seconds: 30,
            throttle_cooldown_minutes: 30,
            stale_sweep_seconds: 30,
            throttle_sweep_seconds: 300,
            request_window_seconds: 60,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            log_dir: None,
            log_json: false,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("INSPECT_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str(&content).map_err(|err| anyhow!("invalid config {}: {}", path, err))?
        } else {
            warn!("{} not found, using defaults", path);
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        for value in [
            &mut self.api_token,
            &mut self.accounts_file,
            &mut self.proxy_url,
            &mut self.ping_url,
            &mut self.log_dir,
        ] {
            if value.as_deref().is_some_and(|inner| inner.trim().is_empty()) {
                *value = None;
            }
        }
        self.gateway_url = self.gateway_url.trim().to_string();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        if let Some(accounts_file) = &self.accounts_file {
            self.accounts_file = Some(resolve_path(base, accounts_file));
        }
        if let Some(log_dir) = &self.log_dir {
            self.log_dir = Some(resolve_path(base, log_dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if !(self.gateway_url.starts_with("ws://") || self.gateway_url.starts_with("wss://")) {
            return Err(anyhow!("gateway_url must be a ws:// or wss:// url"));
        }
        if let Some(ping_url) = &self.ping_url {
            if !(ping_url.starts_with("http://") || ping_url.starts_with("https://")) {
                return Err(anyhow!("ping_url must be an http(s) url"));
            }
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.queue_timeout_ms == 0 {
            return Err(anyhow!("queue_timeout_ms must be greater than 0"));
        }
        if self.max_queue_size == 0 {
            return Err(anyhow!("max_queue_size must be greater than 0"));
        }
        let retry_budget_ms = self
            .queue_timeout_ms
            .saturating_mul(u64::from(self.max_retries) + 1);
        if self.request_timeout_seconds.saturating_mul(1000) < retry_budget_ms {
            return Err(anyhow!(
                "request_timeout_seconds ({}s) must cover queue_timeout_ms * (max_retries + 1) ({}ms)",
                self.request_timeout_seconds,
                retry_budget_ms
            ));
        }
        if self.bot_batch_size == 0 || self.bot_init_attempts == 0 {
            return Err(anyhow!("bot_batch_size and bot_init_attempts must be greater than 0"));
        }
        if self.stale_sweep_seconds == 0
            || self.throttle_sweep_seconds == 0
            || self.request_window_seconds == 0
        {
            return Err(anyhow!("sweep intervals and request window must be greater than 0"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            allow_refresh: self.allow_refresh,
            ping_url: self.ping_url.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_engine_settings(&self) -> EngineSettings {
        EngineSettings {
            queue_timeout: Duration::from_millis(self.queue_timeout_ms),
            max_retries: self.max_retries,
            max_queue_size: self.max_queue_size,
            batch_size: self.bot_batch_size,
            init_attempts: self.bot_init_attempts,
            throttle_cooldown: Duration::from_secs(self.throttle_cooldown_minutes * 60),
            stale_sweep_interval: Duration::from_secs(self.stale_sweep_seconds),
            throttle_sweep_interval: Duration::from_secs(self.throttle_sweep_seconds),
            request_window: self.request_window_seconds,
        }
    }

    pub fn to_gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            url: self.gateway_url.clone(),
            proxy_url: self.proxy_url.clone(),
            login_timeout: Duration::from_secs(self.bot_login_timeout_seconds.max(1)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("INSPECT_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("INSPECT_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("INSPECT_ACCOUNTS_FILE") {
            self.accounts_file = Some(value);
        }
        if let Ok(value) = env::var("INSPECT_GATEWAY_URL") {
            self.gateway_url = value;
        }
        if let Ok(value) = env::var("INSPECT_PROXY_URL") {
            self.proxy_url = Some(value);
        }
        if let Ok(value) = env::var("INSPECT_ALLOW_REFRESH") {
            self.allow_refresh = value.parse().unwrap_or(self.allow_refresh);
        }
        if let Ok(value) = env::var("INSPECT_PING_URL") {
            self.ping_url = Some(value);
        }
        if let Ok(value) = env::var("INSPECT_QUEUE_TIMEOUT_MS") {
            self.queue_timeout_ms = value.parse().unwrap_or(self.queue_timeout_ms);
        }
        if let Ok(value) = env::var("INSPECT_MAX_RETRIES") {
            self.max_retries = value.parse().unwrap_or(self.max_retries);
        }
        if let Ok(value) = env::var("INSPECT_MAX_QUEUE_SIZE") {
            self.max_queue_size = value.parse().unwrap_or(self.max_queue_size);
        }
        if let Ok(value) = env::var("INSPECT_BOT_BATCH_SIZE") {
            self.bot_batch_size = value.parse().unwrap_or(self.bot_batch_size);
        }
        if let Ok(value) = env::var("INSPECT_BOT_INIT_ATTEMPTS") {
            self.bot_init_attempts = value.parse().unwrap_or(self.bot_init_attempts);
        }
        if let Ok(value) = env::var("INSPECT_BOT_LOGIN_TIMEOUT_SECONDS") {
            self.bot_login_timeout_seconds = value.parse().unwrap_or(self.bot_login_timeout_seconds);
        }
        if let Ok(value) = env::var("INSPECT_THROTTLE_COOLDOWN_MINUTES") {
            self.throttle_cooldown_minutes = value.parse().unwrap_or(self.throttle_cooldown_minutes);
        }
        if let Ok(value) = env::var("INSPECT_STALE_SWEEP_SECONDS") {
            self.stale_sweep_seconds = value.parse().unwrap_or(self.stale_sweep_seconds);
        }
        if let Ok(value) = env::var("INSPECT_THROTTLE_SWEEP_SECONDS") {
            self.throttle_sweep_seconds = value.parse().unwrap_or(self.throttle_sweep_seconds);
        }
        if let Ok(value) = env::var("INSPECT_REQUEST_WINDOW_SECONDS") {
            self.request_window_seconds = value.parse().unwrap_or(self.request_window_seconds);
        }
        if let Ok(value) = env::var("INSPECT_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("INSPECT_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
        if let Ok(value) = env::var("INSPECT_LOG_DIR") {
            self.log_dir = Some(value);
        }
        if let Ok(value) = env::var("INSPECT_LOG_JSON") {
            self.log_json = value.parse().unwrap_or(self.log_json);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() || base.as_os_str().is_empty() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
