use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use crate::context::GroupContext;
use crate::error::AppResult;
use crate::handlers::query_period;
use crate::services::csv_io::{self, ImportReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

pub async fn export(
    State(state): State<AppState>,
    ctx: GroupContext,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let period = query_period(params.month, params.year)?;
    let conn = state.db.get()?;
    let content = csv_io::export_csv(&conn, ctx.group_id, period)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"provisions-{}.csv\"", period),
            ),
        ],
        content,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub content: String,
    #[serde(default)]
    pub overwrite: bool,
}

pub async fn import(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<ImportRequest>,
) -> AppResult<Json<ImportReport>> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let report = csv_io::import_csv(&tx, &ctx, &request.content, request.overwrite)?;
    tx.commit()?;
    Ok(Json(report))
}
