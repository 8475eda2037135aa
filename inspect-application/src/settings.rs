use std::time::Duration;

/// Tunables of the dispatch engine. Defaults match the production service.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Deadline for one dispatch attempt.
    pub queue_timeout: Duration,
    /// Retries after the first attempt; a request is dispatched at most
    /// `max_retries + 1` times.
    pub max_retries: u32,
    /// Live correlation entries admitted at once.
    pub max_queue_size: usize,
    /// Credentials brought up concurrently per batch.
    pub batch_size: usize,
    /// Bring-up attempts per credential.
    pub init_attempts: u32,
    pub throttle_cooldown: Duration,
    pub stale_sweep_interval: Duration,
    pub throttle_sweep_interval: Duration,
    /// Number of one-second request samples kept.
    pub request_window: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            queue_timeout: Duration::from_secs(5),
            max_retries: 3,
            max_queue_size: 100,
            batch_size: 100,
            init_attempts: 3,
            throttle_cooldown: Duration::from_secs(30 * 60),
            stale_sweep_interval: Duration::from_secs(30),
            throttle_sweep_interval: Duration::from_secs(5 * 60),
            request_window: 60,
        }
    }
}

impl EngineSettings {
    /// Entries older than this are swept as stale.
    pub fn stale_after(&self) -> Duration {
        self.queue_timeout * 2
    }
}
