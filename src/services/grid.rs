//! Planned vs realized rows for one period.

use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::debug;

use crate::db::queries::{provisions, transactions};
use crate::error::AppResult;
use crate::models::provision::{GridTypeFilter, Provision, ProvisionMetrics, ProvisionsGridRow};
use crate::models::transaction::RealizedTotals;
use crate::money::{checked_sum, overflow, round_money};
use crate::period::{create_month_range, Period};
use crate::services::dictionary::{load_category_dictionary, CategoryDictionary};

#[derive(Debug, Clone, Copy)]
pub struct GridQuery {
    pub period: Period,
    pub include_inactive: bool,
    pub type_filter: GridTypeFilter,
}

impl GridQuery {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            include_inactive: false,
            type_filter: GridTypeFilter::All,
        }
    }

    pub fn with_type(mut self, type_filter: GridTypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn with_inactive(mut self, include_inactive: bool) -> Self {
        self.include_inactive = include_inactive;
        self
    }
}

/// Ids of dictionary categories the query selects, in tree order.
pub fn eligible_category_ids(dictionary: &CategoryDictionary, query: &GridQuery) -> Vec<i64> {
    dictionary
        .iter()
        .filter(|entry| query.include_inactive || entry.category.is_active)
        .filter(|entry| query.type_filter.matches(entry.category.category_type))
        .map(|entry| entry.category.id)
        .collect()
}

/// One row per eligible category. Missing provisions and ledger sums count as zero.
pub fn build_grid_rows(
    dictionary: &CategoryDictionary,
    category_ids: &[i64],
    planned: &HashMap<i64, Provision>,
    realized: &HashMap<i64, RealizedTotals>,
) -> Vec<ProvisionsGridRow> {
    category_ids
        .iter()
        .filter_map(|id| dictionary.get(*id))
        .map(|entry| {
            let category = &entry.category;
            let provision = planned.get(&category.id);
            let realized = realized
                .get(&category.id)
                .map(|totals| totals.for_type(category.category_type))
                .unwrap_or(Decimal::ZERO);

            ProvisionsGridRow {
                id: category.id,
                category_id: category.id,
                provision_id: provision.map(|p| p.id),
                name: category.name.clone(),
                color: category.color.clone(),
                category_type: category.category_type,
                parent_id: category.parent_id,
                planned: round_money(provision.map(|p| p.planned_amount).unwrap_or_default()),
                realized: round_money(realized),
                note: provision.and_then(|p| p.note.clone()),
            }
        })
        .collect()
}

/// Grid for an already loaded dictionary.
pub fn build_provisions_grid(
    conn: &Connection,
    group_id: i64,
    dictionary: &CategoryDictionary,
    query: &GridQuery,
) -> AppResult<Vec<ProvisionsGridRow>> {
    let category_ids = eligible_category_ids(dictionary, query);
    if category_ids.is_empty() {
        debug!(group_id, "No eligible categories for grid");
        return Ok(Vec::new());
    }

    let planned: HashMap<i64, Provision> =
        provisions::list_provisions_for_period(conn, group_id, query.period, Some(&category_ids))?
            .into_iter()
            .map(|p| (p.category_id, p))
            .collect();

    let range = create_month_range(query.period);
    let realized = transactions::realized_totals(conn, group_id, &range, &category_ids)?;

    let rows = build_grid_rows(dictionary, &category_ids, &planned, &realized);
    debug!(
        group_id,
        period = %query.period,
        rows = rows.len(),
        "Built provisions grid"
    );
    Ok(rows)
}

pub fn get_provisions_grid(
    conn: &Connection,
    group_id: i64,
    query: &GridQuery,
) -> AppResult<Vec<ProvisionsGridRow>> {
    let dictionary = load_category_dictionary(conn, group_id)?;
    build_provisions_grid(conn, group_id, &dictionary, query)
}

/// Totals over the given rows. Coverage is 0 when nothing is planned.
pub fn compute_metrics(period: Period, rows: &[ProvisionsGridRow]) -> AppResult<ProvisionMetrics> {
    let planned_total = checked_sum(rows.iter().map(|r| r.planned), "planned total")?;
    let realized_total = checked_sum(rows.iter().map(|r| r.realized), "realized total")?;
    let over_budget = rows
        .iter()
        .map(|r| {
            r.realized
                .checked_sub(r.planned)
                .map(|diff| diff.max(Decimal::ZERO))
                .ok_or_else(|| overflow("over budget"))
        })
        .collect::<AppResult<Vec<Decimal>>>()?;
    let over_budget_total = checked_sum(over_budget, "over budget total")?;
    let remaining_total = planned_total
        .checked_sub(realized_total)
        .ok_or_else(|| overflow("remaining total"))?;

    // A ratio too large to represent is over budget by any measure.
    let coverage = if planned_total.is_zero() {
        Decimal::ZERO
    } else {
        realized_total
            .checked_div(planned_total)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ONE_HUNDRED)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    };

    Ok(ProvisionMetrics {
        month: period.month,
        year: period.year,
        planned_total: round_money(planned_total),
        realized_total: round_money(realized_total),
        remaining_total: round_money(remaining_total),
        coverage: round_money(coverage),
        over_budget_total: round_money(over_budget_total),
    })
}

pub fn get_provision_metrics(
    conn: &Connection,
    group_id: i64,
    period: Period,
    type_filter: GridTypeFilter,
) -> AppResult<ProvisionMetrics> {
    let query = GridQuery::new(period).with_type(type_filter);
    let rows = get_provisions_grid(conn, group_id, &query)?;
    compute_metrics(period, &rows)
}
