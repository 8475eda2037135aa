use std::sync::Arc;

use inspect_domain::ports::{HealthCheckService, PingService};
use inspect_domain::RuntimeConfig;

use crate::InspectEngine;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub engine: Arc<InspectEngine>,
    pub ping_service: Arc<dyn PingService>,
    pub health_service: Arc<dyn HealthCheckService>,
}
