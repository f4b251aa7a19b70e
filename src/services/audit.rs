use rusqlite::Connection;
use tracing::debug;

use crate::db::queries::audit;
use crate::error::AppResult;
use crate::models::audit::{NewAuditLog, ProvisionAuditLog};
use crate::period::Period;

/// Append one history row for a planned amount change.
///
/// Amounts are stored as fixed-point strings; a missing amount stays NULL.
/// A missing context is stored as `{}`.
pub fn record_provision_audit_log(conn: &Connection, log: &NewAuditLog) -> AppResult<i64> {
    let id = audit::insert_audit_log(conn, log)?;
    debug!(
        group_id = log.group_id,
        user_id = log.user_id,
        category_id = log.category_id,
        period = %log.period,
        action = %log.action,
        "Recorded provision audit log"
    );
    Ok(id)
}

/// Newest entries first, at most `limit`.
pub fn get_history(
    conn: &Connection,
    group_id: i64,
    period: Period,
    limit: i64,
) -> AppResult<Vec<ProvisionAuditLog>> {
    Ok(audit::list_audit_logs(conn, group_id, period, limit)?)
}
