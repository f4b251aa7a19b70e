use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use crate::models::audit::{AuditAction, NewAuditLog, ProvisionAuditLog};
use crate::money::{parse_amount, to_optional_money_string};
use crate::period::Period;

fn map_audit_log(row: &Row<'_>) -> rusqlite::Result<ProvisionAuditLog> {
    let action_str: String = row.get(7)?;
    let action = AuditAction::parse(&action_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            Type::Text,
            format!("unknown audit action '{}'", action_str).into(),
        )
    })?;
    let previous: Option<String> = row.get(8)?;
    let new: Option<String> = row.get(9)?;
    let context: String = row.get(10)?;

    Ok(ProvisionAuditLog {
        id: row.get(0)?,
        group_id: row.get(1)?,
        user_id: row.get(2)?,
        category_id: row.get(3)?,
        category_name: row.get(4)?,
        month: row.get(5)?,
        year: row.get(6)?,
        action,
        previous_amount: previous.as_deref().map(parse_amount),
        new_amount: new.as_deref().map(parse_amount),
        context: serde_json::from_str(&context).unwrap_or_default(),
        created_at: row.get(11)?,
    })
}

pub fn insert_audit_log(conn: &Connection, log: &NewAuditLog) -> rusqlite::Result<i64> {
    let context = log
        .context
        .clone()
        .unwrap_or_else(|| serde_json::json!({}))
        .to_string();

    conn.execute(
        "INSERT INTO provision_audit_logs
            (group_id, user_id, category_id, month, year, action, previous_amount, new_amount, context)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            log.group_id,
            log.user_id,
            log.category_id,
            log.period.month,
            log.period.year,
            log.action.as_str(),
            to_optional_money_string(log.previous_amount),
            to_optional_money_string(log.new_amount),
            context
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest first.
pub fn list_audit_logs(
    conn: &Connection,
    group_id: i64,
    period: Period,
    limit: i64,
) -> rusqlite::Result<Vec<ProvisionAuditLog>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.group_id, l.user_id, l.category_id, c.name, l.month, l.year,
                l.action, l.previous_amount, l.new_amount, l.context, l.created_at
         FROM provision_audit_logs l
         LEFT JOIN categories c ON c.id = l.category_id
         WHERE l.group_id = ? AND l.month = ? AND l.year = ?
         ORDER BY l.created_at DESC, l.id DESC
         LIMIT ?",
    )?;
    let logs = stmt
        .query_map(
            params![group_id, period.month, period.year, limit],
            map_audit_log,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(group_id, %period, count = logs.len(), "Listed provision history");
    Ok(logs)
}

pub fn count_audit_logs(conn: &Connection, group_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM provision_audit_logs WHERE group_id = ?",
        [group_id],
        |row| row.get(0),
    )
}
