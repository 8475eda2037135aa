use tracing::debug;

use crate::dtos::ItemInfoResponse;
use crate::{AppError, AppState, InspectParams};
use inspect_domain::InspectQuery;

pub async fn inspect_item(state: &AppState, query: InspectQuery) -> Result<ItemInfoResponse, AppError> {
    let params = InspectParams::from_query(&query)?;
    if query.refresh && !state.config.allow_refresh {
        return Err(AppError::RefreshForbidden);
    }

    state
        .ping_service
        .spawn_ping(&params.s, &params.a.to_string(), &params.d, &params.m);

    debug!(asset_id = params.a, refresh = query.refresh, "inspect requested");
    let info = state.engine.inspect(&params, query.refresh).await?;
    Ok(info.into_response())
}
