use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use crate::context::GroupContext;
use crate::error::AppResult;
use crate::handlers::query_period;
use crate::models::CategoryType;
use crate::services::charts::{self, DistributionEntry, PlannedVsActualEntry, DEFAULT_CHART_LIMIT};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChartParams {
    pub month: Option<u32>,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
    pub limit: Option<usize>,
}

impl ChartParams {
    fn limit(&self) -> usize {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_CHART_LIMIT)
    }
}

pub async fn planned_vs_actual(
    State(state): State<AppState>,
    ctx: GroupContext,
    Query(params): Query<ChartParams>,
) -> AppResult<Json<Vec<PlannedVsActualEntry>>> {
    let period = query_period(params.month, params.year)?;
    let category_type = params.category_type.unwrap_or(CategoryType::Expense);

    let conn = state.db.get()?;
    let entries = charts::get_planned_vs_actual_chart(
        &conn,
        ctx.group_id,
        period,
        category_type,
        params.limit(),
    )?;
    Ok(Json(entries))
}

pub async fn expense_distribution(
    State(state): State<AppState>,
    ctx: GroupContext,
    Query(params): Query<ChartParams>,
) -> AppResult<Json<Vec<DistributionEntry>>> {
    let period = query_period(params.month, params.year)?;

    let conn = state.db.get()?;
    let entries = charts::get_expense_distribution(&conn, ctx.group_id, period, params.limit())?;
    Ok(Json(entries))
}
