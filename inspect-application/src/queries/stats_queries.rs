use tracing::error;

use crate::dtos::StatsSnapshot;
use crate::{AppError, AppState};

pub async fn get_stats(state: &AppState) -> StatsSnapshot {
    state.engine.stats().await
}

pub async fn render_metrics(state: &AppState) -> String {
    state.engine.render_prometheus().await
}

/// Ready once the store answers and at least one bot is live.
pub async fn check_ready(state: &AppState) -> Result<bool, AppError> {
    let store_ok = state.health_service.check_store().await.map_err(|err| {
        error!("store health check failed: {}", err);
        AppError::Internal(err)
    })?;
    Ok(store_ok && state.engine.is_ready().await)
}
