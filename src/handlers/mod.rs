pub mod categories;
pub mod charts;
pub mod csv_io;
pub mod provisions;
pub mod templates;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::error::AppResult;
use crate::period::{resolve_period, Period, PeriodInput};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Categories
        .route("/api/categories", get(categories::list))
        // Grid and headline numbers
        .route("/api/provisions/grid", get(provisions::grid))
        .route("/api/provisions/metrics", get(provisions::metrics))
        .route("/api/provisions/history", get(provisions::history))
        // Single provision
        .route("/api/provisions", post(provisions::upsert))
        .route("/api/provisions/:id", delete(provisions::delete))
        // Bulk mutations
        .route("/api/provisions/bulk-upsert", post(provisions::bulk_upsert))
        .route(
            "/api/provisions/bulk-set-value",
            post(provisions::bulk_set_value),
        )
        .route(
            "/api/provisions/bulk-distribute",
            post(provisions::bulk_distribute),
        )
        .route(
            "/api/provisions/copy-from-previous",
            post(provisions::copy_from_previous),
        )
        // Charts
        .route(
            "/api/provisions/charts/planned-vs-actual",
            get(charts::planned_vs_actual),
        )
        .route(
            "/api/provisions/charts/expense-distribution",
            get(charts::expense_distribution),
        )
        // CSV
        .route("/api/provisions/export", get(csv_io::export))
        .route("/api/provisions/import", post(csv_io::import))
        // Templates
        .route(
            "/api/provisions/templates",
            get(templates::list).post(templates::save),
        )
        .route("/api/provisions/templates/:id", delete(templates::delete))
        .route(
            "/api/provisions/templates/:id/apply",
            post(templates::apply),
        )
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}

/// Fill in the current month for missing parts, then reject impossible months.
pub(crate) fn requested_period(input: Option<PeriodInput>) -> AppResult<Period> {
    resolve_period(input).validate()
}

/// Period from separate `month` / `year` query parameters.
pub(crate) fn query_period(month: Option<u32>, year: Option<i32>) -> AppResult<Period> {
    requested_period(Some(PeriodInput { month, year }))
}
