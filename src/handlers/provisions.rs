use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::GroupContext;
use crate::error::AppResult;
use crate::handlers::{query_period, requested_period};
use crate::models::{
    GridTypeFilter, NoteUpdate, Provision, ProvisionAuditLog, ProvisionEntry, ProvisionMetrics,
    ProvisionsGridRow, UpsertOutcome,
};
use crate::money::{deserialize_money, normalize_note};
use crate::period::PeriodInput;
use crate::services::bulk::{
    self, BulkDistribute, BulkSetValue, DistributionStrategy, NoteStrategy, SetValueMode,
    SingleUpsert,
};
use crate::services::audit::get_history;
use crate::services::grid::{get_provision_metrics, get_provisions_grid, GridQuery};
use crate::state::AppState;

const DEFAULT_HISTORY_PAGE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct GridParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(rename = "type", default)]
    pub type_filter: GridTypeFilter,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct GridResponse {
    pub rows: Vec<ProvisionsGridRow>,
}

pub async fn grid(
    State(state): State<AppState>,
    ctx: GroupContext,
    Query(params): Query<GridParams>,
) -> AppResult<Json<GridResponse>> {
    let period = query_period(params.month, params.year)?;
    let conn = state.db.get()?;

    let query = GridQuery::new(period)
        .with_type(params.type_filter)
        .with_inactive(params.include_inactive);
    let rows = get_provisions_grid(&conn, ctx.group_id, &query)?;
    Ok(Json(GridResponse { rows }))
}

#[derive(Debug, Deserialize)]
pub struct MetricsParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub type_filter: Option<GridTypeFilter>,
}

pub async fn metrics(
    State(state): State<AppState>,
    ctx: GroupContext,
    Query(params): Query<MetricsParams>,
) -> AppResult<Json<ProvisionMetrics>> {
    let period = query_period(params.month, params.year)?;
    let conn = state.db.get()?;

    let type_filter = params.type_filter.unwrap_or(GridTypeFilter::Expense);
    let metrics = get_provision_metrics(&conn, ctx.group_id, period, type_filter)?;
    Ok(Json(metrics))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub limit: Option<i64>,
}

pub async fn history(
    State(state): State<AppState>,
    ctx: GroupContext,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<Vec<ProvisionAuditLog>>> {
    let period = query_period(params.month, params.year)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_PAGE)
        .clamp(1, state.config.history_limit);

    let conn = state.db.get()?;
    let logs = get_history(&conn, ctx.group_id, period, limit)?;
    Ok(Json(logs))
}

#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub id: Option<i64>,
    pub category_id: i64,
    pub period: Option<PeriodInput>,
    #[serde(deserialize_with = "deserialize_money")]
    pub planned_amount: Decimal,
    pub note: Option<String>,
}

pub async fn upsert(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<UpsertRequest>,
) -> AppResult<Json<Provision>> {
    let input = SingleUpsert {
        id: request.id,
        category_id: request.category_id,
        period: requested_period(request.period)?,
        planned_amount: request.planned_amount,
        note: request.note,
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let provision = bulk::upsert_provision(&tx, &ctx, &input)?;
    tx.commit()?;

    info!(
        group_id = ctx.group_id,
        provision_id = provision.id,
        "Provision saved"
    );
    Ok(Json(provision))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: GroupContext,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    bulk::delete_provision(&tx, &ctx, id)?;
    tx.commit()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub category_id: i64,
    #[serde(deserialize_with = "deserialize_money")]
    pub planned_amount: Decimal,
    /// Absent keeps the stored note.
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpsertRequest {
    pub period: Option<PeriodInput>,
    pub entries: Vec<EntryRequest>,
}

pub async fn bulk_upsert(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<BulkUpsertRequest>,
) -> AppResult<Json<UpsertOutcome>> {
    let period = requested_period(request.period)?;
    let entries: Vec<ProvisionEntry> = request
        .entries
        .into_iter()
        .map(|e| ProvisionEntry {
            category_id: e.category_id,
            planned_amount: e.planned_amount,
            note: match e.note {
                Some(note) => NoteUpdate::Replace(normalize_note(Some(&note))),
                None => NoteUpdate::Keep,
            },
        })
        .collect();

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let outcome = bulk::bulk_upsert(&tx, &ctx, period, &entries)?;
    tx.commit()?;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct BulkSetValueRequest {
    pub period: Option<PeriodInput>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    pub mode: SetValueMode,
    #[serde(deserialize_with = "deserialize_money")]
    pub value: Decimal,
    #[serde(default)]
    pub note_strategy: NoteStrategy,
    pub note: Option<String>,
}

pub async fn bulk_set_value(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<BulkSetValueRequest>,
) -> AppResult<Json<CountResponse>> {
    let input = BulkSetValue {
        period: requested_period(request.period)?,
        category_ids: request.category_ids,
        mode: request.mode,
        value: request.value,
        note_strategy: request.note_strategy,
        note: request.note,
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let count = bulk::bulk_set_value(&tx, &ctx, &input)?;
    tx.commit()?;
    Ok(Json(CountResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct BulkDistributeRequest {
    pub period: Option<PeriodInput>,
    #[serde(default)]
    pub category_ids: Vec<i64>,
    #[serde(deserialize_with = "deserialize_money")]
    pub amount: Decimal,
    pub strategy: DistributionStrategy,
}

pub async fn bulk_distribute(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<BulkDistributeRequest>,
) -> AppResult<Json<CountResponse>> {
    let input = BulkDistribute {
        period: requested_period(request.period)?,
        category_ids: request.category_ids,
        amount: request.amount,
        strategy: request.strategy,
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let count = bulk::bulk_distribute(&tx, &ctx, &input)?;
    tx.commit()?;
    Ok(Json(CountResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct CopyRequest {
    pub from: Option<PeriodInput>,
    pub to: Option<PeriodInput>,
    pub category_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub overwrite: bool,
}

pub async fn copy_from_previous(
    State(state): State<AppState>,
    ctx: GroupContext,
    Json(request): Json<CopyRequest>,
) -> AppResult<Json<UpsertOutcome>> {
    let to = requested_period(request.to)?;
    let from = match request.from {
        Some(from) => requested_period(Some(from))?,
        None => to.prev(),
    };

    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;
    let outcome = bulk::copy_from_previous(
        &tx,
        &ctx,
        from,
        to,
        request.overwrite,
        request.category_ids.as_deref(),
    )?;
    tx.commit()?;
    Ok(Json(outcome))
}
