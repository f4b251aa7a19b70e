use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::context::GroupContext;
use crate::error::AppResult;
use crate::handlers::requested_period;
use crate::models::{ProvisionTemplate, UpsertOutcome};
use crate::period::PeriodInput;
use crate::services::templates::{self, SaveTemplate};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    ctx: GroupContext,
) -> AppResult<Json<Vec<ProvisionTemplate>>> {
    let conn = state.db.get()?;
    Ok(Json(templates::list_templates(&conn, ctx.group_id)?))
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub name: String,
    pub description: Option<String>,
    pub period: Option<PeriodInput>,
    pub category_ids: Option<Vec<i64>>,
}

pub async fn save(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<SaveRequest>,
) -> AppResult<Json<ProvisionTemplate>> {
    let input = SaveTemplate {
        name: request.name,
        description: request.description,
        period: requested_period(request.period)?,
        category_ids: request.category_ids,
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let template = templates::save_template(&tx, &ctx, &input)?;
    tx.commit()?;
    Ok(Json(template))
}

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub target: Option<PeriodInput>,
    #[serde(default)]
    pub overwrite: bool,
    pub category_ids: Option<Vec<i64>>,
}

pub async fn apply(
    State(state): State<AppState>,
    ctx: GroupContext,
    Path(id): Path<i64>,
    Json(request): Json<ApplyRequest>,
) -> AppResult<Json<UpsertOutcome>> {
    let target = requested_period(request.target)?;

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let outcome = templates::apply_template(
        &tx,
        &ctx,
        id,
        target,
        request.overwrite,
        request.category_ids.as_deref(),
    )?;
    tx.commit()?;
    Ok(Json(outcome))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: GroupContext,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    templates::delete_template(&tx, &ctx, id)?;
    tx.commit()?;
    Ok(StatusCode::NO_CONTENT)
}
