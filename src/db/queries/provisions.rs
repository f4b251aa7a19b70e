use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::debug;

use crate::db::queries::placeholders;
use crate::models::provision::Provision;
use crate::money::{parse_amount, to_money_string};
use crate::period::Period;

const PROVISION_COLUMNS: &str =
    "id, group_id, category_id, month, year, planned_amount, note, created_at, updated_at";

fn map_provision(row: &Row<'_>) -> rusqlite::Result<Provision> {
    let planned: String = row.get(5)?;
    Ok(Provision {
        id: row.get(0)?,
        group_id: row.get(1)?,
        category_id: row.get(2)?,
        month: row.get(3)?,
        year: row.get(4)?,
        planned_amount: parse_amount(&planned),
        note: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Provisions of a period, optionally restricted to some categories.
///
/// `Some(&[])` matches nothing.
pub fn list_provisions_for_period(
    conn: &Connection,
    group_id: i64,
    period: Period,
    category_ids: Option<&[i64]>,
) -> rusqlite::Result<Vec<Provision>> {
    let mut sql = format!(
        "SELECT {} FROM provisions WHERE group_id = ? AND month = ? AND year = ?",
        PROVISION_COLUMNS
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(group_id),
        Box::new(period.month),
        Box::new(period.year),
    ];

    if let Some(ids) = category_ids {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sql.push_str(&format!(" AND category_id IN ({})", placeholders(ids.len())));
        params_vec.extend(ids.iter().map(|id| Box::new(*id) as Box<dyn rusqlite::ToSql>));
    }
    sql.push_str(" ORDER BY category_id");

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let provisions = stmt
        .query_map(params_refs.as_slice(), map_provision)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(
        group_id,
        month = period.month,
        year = period.year,
        count = provisions.len(),
        "Listed provisions"
    );
    Ok(provisions)
}

pub fn get_provision(
    conn: &Connection,
    group_id: i64,
    id: i64,
) -> rusqlite::Result<Option<Provision>> {
    let sql = format!(
        "SELECT {} FROM provisions WHERE group_id = ? AND id = ?",
        PROVISION_COLUMNS
    );
    conn.query_row(&sql, params![group_id, id], map_provision)
        .optional()
}

pub fn find_provision(
    conn: &Connection,
    group_id: i64,
    category_id: i64,
    period: Period,
) -> rusqlite::Result<Option<Provision>> {
    let sql = format!(
        "SELECT {} FROM provisions
         WHERE group_id = ? AND category_id = ? AND month = ? AND year = ?",
        PROVISION_COLUMNS
    );
    conn.query_row(
        &sql,
        params![group_id, category_id, period.month, period.year],
        map_provision,
    )
    .optional()
}

pub fn insert_provision(
    conn: &Connection,
    group_id: i64,
    category_id: i64,
    period: Period,
    planned_amount: Decimal,
    note: Option<&str>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO provisions (group_id, category_id, month, year, planned_amount, note)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            group_id,
            category_id,
            period.month,
            period.year,
            to_money_string(planned_amount),
            note
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(group_id, category_id, provision_id = id, %period, "Inserted provision");
    Ok(id)
}

pub fn update_provision(
    conn: &Connection,
    id: i64,
    planned_amount: Decimal,
    note: Option<&str>,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE provisions SET planned_amount = ?, note = ?, updated_at = datetime('now')
         WHERE id = ?",
        params![to_money_string(planned_amount), note, id],
    )?;
    if rows > 0 {
        debug!(provision_id = id, "Updated provision");
    }
    Ok(rows > 0)
}

pub fn delete_provision(conn: &Connection, group_id: i64, id: i64) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM provisions WHERE group_id = ? AND id = ?",
        params![group_id, id],
    )?;
    if rows > 0 {
        debug!(group_id, provision_id = id, "Deleted provision");
    }
    Ok(rows > 0)
}

pub fn count_provisions(conn: &Connection, group_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM provisions WHERE group_id = ?",
        [group_id],
        |row| row.get(0),
    )
}
