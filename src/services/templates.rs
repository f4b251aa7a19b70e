//! Named sets of planned amounts that can be re-applied to any month.

use rusqlite::Connection;
use serde_json::json;
use tracing::info;

use crate::context::GroupContext;
use crate::db::queries::templates;
use crate::error::{AppError, AppResult};
use crate::models::provision::{NoteUpdate, ProvisionEntry, UpsertOutcome};
use crate::models::template::{NewTemplate, ProvisionTemplate, TemplateItem};
use crate::period::Period;
use crate::services::bulk::{write_entries, WriteOptions};
use crate::services::dictionary::{ensure_category_ids, load_category_dictionary};
use crate::services::grid::{build_provisions_grid, GridQuery};

#[derive(Debug, Clone)]
pub struct SaveTemplate {
    pub name: String,
    pub description: Option<String>,
    pub period: Period,
    pub category_ids: Option<Vec<i64>>,
}

/// Capture the planned amounts of a period under a name.
///
/// Categories without a planned amount are not stored. Saving under an
/// existing name replaces that template.
pub fn save_template(
    conn: &Connection,
    ctx: &GroupContext,
    input: &SaveTemplate,
) -> AppResult<ProvisionTemplate> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Template name is required".into()));
    }

    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    let selected = ensure_category_ids(&dictionary, input.category_ids.as_deref());
    let rows = build_provisions_grid(
        conn,
        ctx.group_id,
        &dictionary,
        &GridQuery::new(input.period).with_inactive(true),
    )?;

    let items: Vec<TemplateItem> = rows
        .into_iter()
        .filter(|row| selected.contains(&row.category_id))
        .filter(|row| !row.planned.is_zero())
        .map(|row| TemplateItem {
            category_id: row.category_id,
            planned_amount: row.planned,
        })
        .collect();

    let template = NewTemplate {
        name: name.to_string(),
        description: input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string),
        source_month: input.period.month,
        source_year: input.period.year,
        created_by: ctx.user_id,
        items,
    };
    let id = templates::upsert_template(conn, ctx.group_id, &template)?;
    info!(
        group_id = ctx.group_id,
        template_id = id,
        items = template.items.len(),
        "Saved provision template"
    );

    templates::get_template(conn, ctx.group_id, id)?
        .ok_or_else(|| AppError::Internal(format!("Template {} vanished after save", id)))
}

pub fn list_templates(conn: &Connection, group_id: i64) -> AppResult<Vec<ProvisionTemplate>> {
    Ok(templates::list_templates(conn, group_id)?)
}

/// Write a template's amounts into `target`.
///
/// Items whose category no longer exists are skipped.
pub fn apply_template(
    conn: &Connection,
    ctx: &GroupContext,
    template_id: i64,
    target: Period,
    overwrite: bool,
    category_ids: Option<&[i64]>,
) -> AppResult<UpsertOutcome> {
    let template = templates::get_template(conn, ctx.group_id, template_id)?
        .ok_or_else(|| AppError::NotFound(format!("Template {} not found", template_id)))?;

    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    let allowed = ensure_category_ids(&dictionary, category_ids);
    let entries: Vec<ProvisionEntry> = template
        .items
        .iter()
        .filter(|item| allowed.contains(&item.category_id))
        .map(|item| ProvisionEntry {
            category_id: item.category_id,
            planned_amount: item.planned_amount,
            note: NoteUpdate::Keep,
        })
        .collect();

    let options = WriteOptions::upsert(json!({
        "source": "template",
        "template_id": template.id,
        "template_name": template.name,
    }))
    .with_overwrite(overwrite);
    let outcome = write_entries(conn, ctx, target, &entries, &options)?;
    info!(
        group_id = ctx.group_id,
        template_id,
        period = %target,
        inserted = outcome.inserted,
        updated = outcome.updated,
        "Applied provision template"
    );
    Ok(outcome)
}

pub fn delete_template(conn: &Connection, ctx: &GroupContext, template_id: i64) -> AppResult<()> {
    if !templates::delete_template(conn, ctx.group_id, template_id)? {
        return Err(AppError::NotFound(format!(
            "Template {} not found",
            template_id
        )));
    }
    Ok(())
}
