use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use inspect_application::commands::inspect_commands;
use inspect_application::dtos::StatsSnapshot;
use inspect_application::queries::stats_queries;
use inspect_application::AppState;
use inspect_domain::InspectQuery;

use crate::error::HttpError;

const USAGE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Item Inspect</title></head>
<body>
<h1>Item Inspect</h1>
<p>Inspect an item by passing its inspect link or its decomposed parameters.</p>
<pre>
GET /?url=steam://rungame/730/76561202255233023/+csgo_econ_action_preview%20S76561198084749846A698323590D7935523998312483177
GET /?s=76561198084749846&amp;a=698323590&amp;d=7935523998312483177
GET /?m=625254122282020305&amp;a=6760346663&amp;d=30614827701953021
</pre>
<p>Add <code>refresh=true</code> to bypass the cache when the server allows it.</p>
<p>Service counters are available at <code>/stats</code>.</p>
</body>
</html>
"#;

pub async fn inspect(
    State(state): State<AppState>,
    Query(query): Query<InspectQuery>,
) -> Result<Response, HttpError> {
    if query.is_empty() {
        return Ok(Html(USAGE_PAGE).into_response());
    }
    let info = inspect_commands::inspect_item(&state, query).await?;
    Ok(Json(info).into_response())
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(stats_queries::get_stats(&state).await)
}
