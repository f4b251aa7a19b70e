//! Planned amount mutations: single and bulk upserts, copy between periods,
//! set-value and distribution.
//!
//! Every row written here gets exactly one audit entry. Callers run these
//! inside a database transaction so a failing batch leaves nothing behind.

use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::context::GroupContext;
use crate::db::queries::{provisions, transactions};
use crate::error::{AppError, AppResult};
use crate::models::audit::{AuditAction, NewAuditLog};
use crate::models::category::CategoryType;
use crate::models::provision::{NoteUpdate, Provision, ProvisionEntry, UpsertOutcome};
use crate::money::{bounded_amount, normalize_note};
use crate::period::{create_month_range, Period};
use crate::services::allocation::{allocate_equal, allocate_proportional};
use crate::services::audit::record_provision_audit_log;
use crate::services::dictionary::{ensure_category_ids, load_category_dictionary};

/// How a batch treats categories that already have a provision.
#[derive(Debug, Clone)]
pub(crate) struct WriteOptions {
    pub overwrite: bool,
    pub create_action: AuditAction,
    pub update_action: AuditAction,
    pub context: Value,
}

impl WriteOptions {
    pub fn upsert(context: Value) -> Self {
        Self {
            overwrite: true,
            create_action: AuditAction::Create,
            update_action: AuditAction::Update,
            context,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Keep the last entry per category, in order of first appearance.
fn dedupe_entries(entries: &[ProvisionEntry]) -> Vec<ProvisionEntry> {
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut unique: Vec<ProvisionEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match positions.get(&entry.category_id) {
            Some(pos) => unique[*pos] = entry.clone(),
            None => {
                positions.insert(entry.category_id, unique.len());
                unique.push(entry.clone());
            }
        }
    }
    unique
}

/// Insert or update one provision per entry for `period`.
///
/// Existing rows are updated only when `options.overwrite` is set; skipped
/// rows are neither written nor logged. Any amount out of range fails the
/// whole batch before the first write.
pub(crate) fn write_entries(
    conn: &Connection,
    ctx: &GroupContext,
    period: Period,
    entries: &[ProvisionEntry],
    options: &WriteOptions,
) -> AppResult<UpsertOutcome> {
    let entries = dedupe_entries(entries);
    if entries.is_empty() {
        return Ok(UpsertOutcome::default());
    }
    let amounts = entries
        .iter()
        .map(|e| bounded_amount(e.planned_amount))
        .collect::<AppResult<Vec<Decimal>>>()?;

    let ids: Vec<i64> = entries.iter().map(|e| e.category_id).collect();
    let existing: HashMap<i64, Provision> =
        provisions::list_provisions_for_period(conn, ctx.group_id, period, Some(&ids))?
            .into_iter()
            .map(|p| (p.category_id, p))
            .collect();

    let mut outcome = UpsertOutcome::default();
    for (entry, amount) in entries.iter().zip(amounts) {
        match existing.get(&entry.category_id) {
            Some(current) if options.overwrite => {
                let note = entry.note.resolve(current.note.as_deref());
                provisions::update_provision(conn, current.id, amount, note.as_deref())?;
                record_provision_audit_log(
                    conn,
                    &NewAuditLog {
                        group_id: ctx.group_id,
                        user_id: ctx.user_id,
                        category_id: entry.category_id,
                        period,
                        action: options.update_action,
                        previous_amount: Some(current.planned_amount),
                        new_amount: Some(amount),
                        context: Some(options.context.clone()),
                    },
                )?;
                outcome.updated += 1;
            }
            Some(_) => {
                debug!(category_id = entry.category_id, %period, "Keeping existing provision");
            }
            None => {
                let note = entry.note.resolve(None);
                provisions::insert_provision(
                    conn,
                    ctx.group_id,
                    entry.category_id,
                    period,
                    amount,
                    note.as_deref(),
                )?;
                record_provision_audit_log(
                    conn,
                    &NewAuditLog {
                        group_id: ctx.group_id,
                        user_id: ctx.user_id,
                        category_id: entry.category_id,
                        period,
                        action: options.create_action,
                        previous_amount: None,
                        new_amount: Some(amount),
                        context: Some(options.context.clone()),
                    },
                )?;
                outcome.inserted += 1;
            }
        }
    }

    Ok(outcome)
}

/// Write planned amounts for several categories of one period.
///
/// Every category must belong to the caller's group.
pub fn bulk_upsert(
    conn: &Connection,
    ctx: &GroupContext,
    period: Period,
    entries: &[ProvisionEntry],
) -> AppResult<UpsertOutcome> {
    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    if let Some(unknown) = entries.iter().find(|e| !dictionary.contains(e.category_id)) {
        return Err(AppError::NotFound(format!(
            "Category {} not found",
            unknown.category_id
        )));
    }

    let outcome = write_entries(
        conn,
        ctx,
        period,
        entries,
        &WriteOptions::upsert(json!({ "source": "bulk_upsert" })),
    )?;
    info!(
        group_id = ctx.group_id,
        %period,
        inserted = outcome.inserted,
        updated = outcome.updated,
        "Bulk upsert applied"
    );
    Ok(outcome)
}

#[derive(Debug, Clone)]
pub struct SingleUpsert {
    pub id: Option<i64>,
    pub category_id: i64,
    pub period: Period,
    pub planned_amount: Decimal,
    pub note: Option<String>,
}

/// Create or edit one provision.
///
/// With an id the referenced provision is edited. Without one a provision
/// for the same category and period must not exist yet.
pub fn upsert_provision(
    conn: &Connection,
    ctx: &GroupContext,
    input: &SingleUpsert,
) -> AppResult<Provision> {
    let amount = bounded_amount(input.planned_amount)?;
    let note = normalize_note(input.note.as_deref());
    let context = json!({ "source": "manual" });

    let (id, period, category_id, action, previous) = match input.id {
        Some(id) => {
            let current = provisions::get_provision(conn, ctx.group_id, id)?
                .ok_or_else(|| AppError::NotFound(format!("Provision {} not found", id)))?;
            provisions::update_provision(conn, id, amount, note.as_deref())?;
            (
                id,
                current.period(),
                current.category_id,
                AuditAction::Update,
                Some(current.planned_amount),
            )
        }
        None => {
            let dictionary = load_category_dictionary(conn, ctx.group_id)?;
            if !dictionary.contains(input.category_id) {
                return Err(AppError::NotFound(format!(
                    "Category {} not found",
                    input.category_id
                )));
            }
            if provisions::find_provision(conn, ctx.group_id, input.category_id, input.period)?
                .is_some()
            {
                return Err(AppError::Conflict(format!(
                    "A provision for category {} in {} already exists",
                    input.category_id, input.period
                )));
            }
            let id = provisions::insert_provision(
                conn,
                ctx.group_id,
                input.category_id,
                input.period,
                amount,
                note.as_deref(),
            )?;
            (id, input.period, input.category_id, AuditAction::Create, None)
        }
    };

    record_provision_audit_log(
        conn,
        &NewAuditLog {
            group_id: ctx.group_id,
            user_id: ctx.user_id,
            category_id,
            period,
            action,
            previous_amount: previous,
            new_amount: Some(amount),
            context: Some(context),
        },
    )?;

    provisions::get_provision(conn, ctx.group_id, id)?
        .ok_or_else(|| AppError::Internal(format!("Provision {} vanished after write", id)))
}

pub fn delete_provision(conn: &Connection, ctx: &GroupContext, id: i64) -> AppResult<()> {
    let current = provisions::get_provision(conn, ctx.group_id, id)?
        .ok_or_else(|| AppError::NotFound(format!("Provision {} not found", id)))?;

    provisions::delete_provision(conn, ctx.group_id, id)?;
    record_provision_audit_log(
        conn,
        &NewAuditLog {
            group_id: ctx.group_id,
            user_id: ctx.user_id,
            category_id: current.category_id,
            period: current.period(),
            action: AuditAction::Delete,
            previous_amount: Some(current.planned_amount),
            new_amount: None,
            context: Some(json!({ "source": "manual" })),
        },
    )?;
    info!(group_id = ctx.group_id, provision_id = id, "Provision deleted");
    Ok(())
}

/// Copy planned amounts and notes from one period to another.
///
/// A no-op when both periods are the same. Targets that already have a
/// provision are only touched with `overwrite`.
pub fn copy_from_previous(
    conn: &Connection,
    ctx: &GroupContext,
    from: Period,
    to: Period,
    overwrite: bool,
    category_ids: Option<&[i64]>,
) -> AppResult<UpsertOutcome> {
    if from == to {
        debug!(%from, "Copy source and target are the same period");
        return Ok(UpsertOutcome::default());
    }

    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    let allowed = ensure_category_ids(&dictionary, category_ids);
    let source = provisions::list_provisions_for_period(conn, ctx.group_id, from, Some(&allowed))?;

    let entries: Vec<ProvisionEntry> = source
        .into_iter()
        .map(|p| ProvisionEntry {
            category_id: p.category_id,
            planned_amount: p.planned_amount,
            note: NoteUpdate::Replace(p.note),
        })
        .collect();

    let options = WriteOptions {
        overwrite,
        create_action: AuditAction::CopyCreate,
        update_action: AuditAction::CopyUpdate,
        context: json!({
            "source": "copy",
            "from": { "month": from.month, "year": from.year },
            "overwrite": overwrite,
        }),
    };
    let outcome = write_entries(conn, ctx, to, &entries, &options)?;
    info!(
        group_id = ctx.group_id,
        %from,
        %to,
        inserted = outcome.inserted,
        updated = outcome.updated,
        "Copied provisions"
    );
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetValueMode {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteStrategy {
    #[default]
    Keep,
    Replace,
}

#[derive(Debug, Clone)]
pub struct BulkSetValue {
    pub period: Period,
    pub category_ids: Vec<i64>,
    pub mode: SetValueMode,
    pub value: Decimal,
    pub note_strategy: NoteStrategy,
    pub note: Option<String>,
}

/// New planned amount under `mode`.
///
/// Relative values are a percentage of the current amount. Results beyond the
/// accepted amount range are rejected.
pub fn apply_set_value(mode: SetValueMode, current: Decimal, value: Decimal) -> AppResult<Decimal> {
    let raw = match mode {
        SetValueMode::Absolute => Some(value),
        SetValueMode::Relative => current
            .checked_mul(value)
            .and_then(|scaled| scaled.checked_div(Decimal::ONE_HUNDRED)),
    };
    let raw = raw.ok_or_else(|| {
        AppError::Validation(format!("{}% of {} is out of range", value, current))
    })?;
    bounded_amount(raw)
}

fn require_selection(category_ids: &[i64]) -> AppResult<()> {
    if category_ids.is_empty() {
        return Err(AppError::Validation(
            "Select at least one category".into(),
        ));
    }
    Ok(())
}

/// Set the planned amount of every selected category. Returns rows written.
pub fn bulk_set_value(
    conn: &Connection,
    ctx: &GroupContext,
    input: &BulkSetValue,
) -> AppResult<usize> {
    require_selection(&input.category_ids)?;
    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    let ids = ensure_category_ids(&dictionary, Some(&input.category_ids));

    let current: HashMap<i64, Decimal> =
        provisions::list_provisions_for_period(conn, ctx.group_id, input.period, Some(&ids))?
            .into_iter()
            .map(|p| (p.category_id, p.planned_amount))
            .collect();

    let note = match input.note_strategy {
        NoteStrategy::Keep => NoteUpdate::Keep,
        NoteStrategy::Replace => NoteUpdate::Replace(normalize_note(input.note.as_deref())),
    };
    let entries = ids
        .iter()
        .map(|id| {
            let planned_amount = apply_set_value(
                input.mode,
                current.get(id).copied().unwrap_or_default(),
                input.value,
            )?;
            Ok(ProvisionEntry {
                category_id: *id,
                planned_amount,
                note: note.clone(),
            })
        })
        .collect::<AppResult<Vec<ProvisionEntry>>>()?;

    let context = json!({
        "source": "bulk_set_value",
        "mode": match input.mode {
            SetValueMode::Absolute => "absolute",
            SetValueMode::Relative => "relative",
        },
        "value": input.value.to_string(),
    });
    let outcome = write_entries(
        conn,
        ctx,
        input.period,
        &entries,
        &WriteOptions::upsert(context),
    )?;
    info!(
        group_id = ctx.group_id,
        period = %input.period,
        count = outcome.total(),
        "Bulk set value applied"
    );
    Ok(outcome.total())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    Equal,
    Historical,
}

#[derive(Debug, Clone)]
pub struct BulkDistribute {
    pub period: Period,
    pub category_ids: Vec<i64>,
    pub amount: Decimal,
    pub strategy: DistributionStrategy,
}

/// Split `amount` across the selected categories. Returns rows written.
///
/// The historical strategy weighs each category by what it realized in the
/// previous month and falls back to an even split when nothing was spent.
pub fn bulk_distribute(
    conn: &Connection,
    ctx: &GroupContext,
    input: &BulkDistribute,
) -> AppResult<usize> {
    require_selection(&input.category_ids)?;
    let amount = bounded_amount(input.amount)?;
    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    let ids = ensure_category_ids(&dictionary, Some(&input.category_ids));
    if ids.is_empty() {
        return Ok(0);
    }

    let parts = match input.strategy {
        DistributionStrategy::Equal => allocate_equal(amount, ids.len())?,
        DistributionStrategy::Historical => {
            let previous = create_month_range(input.period.prev());
            let realized = transactions::realized_totals(conn, ctx.group_id, &previous, &ids)?;
            let weights: Vec<Decimal> = ids
                .iter()
                .map(|id| {
                    let category_type = dictionary
                        .get(*id)
                        .map(|e| e.category.category_type)
                        .unwrap_or(CategoryType::Expense);
                    realized
                        .get(id)
                        .map(|totals| totals.for_type(category_type))
                        .unwrap_or_default()
                })
                .collect();
            allocate_proportional(amount, &weights)?
        }
    };

    let entries: Vec<ProvisionEntry> = ids
        .iter()
        .zip(parts)
        .map(|(id, amount)| ProvisionEntry {
            category_id: *id,
            planned_amount: amount,
            note: NoteUpdate::Keep,
        })
        .collect();

    let context = json!({
        "source": "bulk_distribute",
        "strategy": match input.strategy {
            DistributionStrategy::Equal => "equal",
            DistributionStrategy::Historical => "historical",
        },
        "amount": amount.to_string(),
    });
    let outcome = write_entries(
        conn,
        ctx,
        input.period,
        &entries,
        &WriteOptions::upsert(context),
    )?;
    info!(
        group_id = ctx.group_id,
        period = %input.period,
        count = outcome.total(),
        "Bulk distribution applied"
    );
    Ok(outcome.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(category_id: i64, amount: Decimal) -> ProvisionEntry {
        ProvisionEntry {
            category_id,
            planned_amount: amount,
            note: NoteUpdate::Keep,
        }
    }

    #[test]
    fn test_dedupe_keeps_last_value_first_position() {
        let entries = vec![entry(1, dec!(10)), entry(2, dec!(20)), entry(1, dec!(30))];
        let unique = dedupe_entries(&entries);
        assert_eq!(unique, vec![entry(1, dec!(30)), entry(2, dec!(20))]);
    }

    #[test]
    fn test_apply_set_value() {
        assert_eq!(
            apply_set_value(SetValueMode::Absolute, dec!(80), dec!(150)).unwrap(),
            dec!(150)
        );
        assert_eq!(
            apply_set_value(SetValueMode::Relative, dec!(200), dec!(110)).unwrap(),
            dec!(220)
        );
        assert_eq!(
            apply_set_value(SetValueMode::Relative, dec!(0), dec!(50)).unwrap(),
            dec!(0)
        );
        assert_eq!(
            apply_set_value(SetValueMode::Relative, dec!(33.33), dec!(50)).unwrap(),
            dec!(16.67)
        );
    }

    #[test]
    fn test_apply_set_value_out_of_range() {
        let huge = Decimal::MAX;
        assert!(matches!(
            apply_set_value(SetValueMode::Absolute, dec!(0), huge),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            apply_set_value(SetValueMode::Relative, dec!(100), huge),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            apply_set_value(SetValueMode::Relative, dec!(900000000000), dec!(200)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_note_update_resolve() {
        assert_eq!(NoteUpdate::Keep.resolve(Some("old")), Some("old".into()));
        assert_eq!(
            NoteUpdate::Replace(Some("new".into())).resolve(Some("old")),
            Some("new".into())
        );
        assert_eq!(NoteUpdate::Replace(None).resolve(Some("old")), None);
    }
}
