use std::collections::HashMap;

use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::db::queries::placeholders;
use crate::models::transaction::{NewTransaction, RealizedTotals, TransactionType};
use crate::period::MonthRange;

pub fn create_transaction(
    conn: &Connection,
    group_id: i64,
    transaction: &NewTransaction,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO transactions (group_id, category_id, date, amount_cents, transaction_type, is_paid, description)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            group_id,
            transaction.category_id,
            transaction.date,
            transaction.amount_cents,
            transaction.transaction_type.as_str(),
            transaction.is_paid,
            transaction.description
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(group_id, transaction_id = id, "Created transaction");
    Ok(id)
}

/// Paid amounts per category inside `range`, grouped by transaction type.
///
/// Transfers are not counted towards either bucket.
pub fn realized_totals(
    conn: &Connection,
    group_id: i64,
    range: &MonthRange,
    category_ids: &[i64],
) -> rusqlite::Result<HashMap<i64, RealizedTotals>> {
    if category_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT category_id, transaction_type, SUM(amount_cents)
         FROM transactions
         WHERE group_id = ? AND is_paid = 1
           AND date >= ? AND date <= ?
           AND category_id IN ({})
         GROUP BY category_id, transaction_type",
        placeholders(category_ids.len())
    );

    let start = range.start_date();
    let end = range.end_date();
    let mut params_vec: Vec<&dyn rusqlite::ToSql> = vec![
        &group_id as &dyn rusqlite::ToSql,
        &start as &dyn rusqlite::ToSql,
        &end as &dyn rusqlite::ToSql,
    ];
    params_vec.extend(category_ids.iter().map(|id| id as &dyn rusqlite::ToSql));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_vec.as_slice(), |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut totals: HashMap<i64, RealizedTotals> = HashMap::new();
    for row in rows {
        let (category_id, type_str, cents) = row?;
        let amount = Decimal::new(cents, 2);
        let entry = totals.entry(category_id).or_default();
        match TransactionType::parse(&type_str) {
            Some(TransactionType::Income) => entry.income += amount,
            Some(TransactionType::Expense) => entry.expense += amount,
            _ => trace!(category_id, kind = %type_str, "Ignoring non-budget transaction type"),
        }
    }

    debug!(group_id, categories = totals.len(), "Aggregated realized totals");
    Ok(totals)
}
