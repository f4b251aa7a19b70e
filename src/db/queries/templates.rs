use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::models::template::{NewTemplate, ProvisionTemplate, TemplateItem};
use crate::money::{parse_amount, to_money_string};

const TEMPLATE_COLUMNS: &str = "id, group_id, name, description, source_month, source_year,
     created_by, created_at, updated_at";

fn map_template(row: &Row<'_>) -> rusqlite::Result<ProvisionTemplate> {
    Ok(ProvisionTemplate {
        id: row.get(0)?,
        group_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        source_month: row.get(4)?,
        source_year: row.get(5)?,
        created_by: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        items: Vec::new(),
    })
}

fn load_items(conn: &Connection, template_id: i64) -> rusqlite::Result<Vec<TemplateItem>> {
    let mut stmt = conn.prepare(
        "SELECT category_id, planned_amount FROM provision_template_items
         WHERE template_id = ? ORDER BY id",
    )?;
    let items = stmt
        .query_map([template_id], |row| {
            let amount: String = row.get(1)?;
            Ok(TemplateItem {
                category_id: row.get(0)?,
                planned_amount: parse_amount(&amount),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Create the template, or replace the one with the same name in the group.
pub fn upsert_template(
    conn: &Connection,
    group_id: i64,
    template: &NewTemplate,
) -> rusqlite::Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM provision_templates WHERE group_id = ? AND name = ?",
            params![group_id, template.name],
            |row| row.get(0),
        )
        .optional()?;

    let id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE provision_templates
                 SET description = ?, source_month = ?, source_year = ?, updated_at = datetime('now')
                 WHERE id = ?",
                params![
                    template.description,
                    template.source_month,
                    template.source_year,
                    id
                ],
            )?;
            conn.execute(
                "DELETE FROM provision_template_items WHERE template_id = ?",
                [id],
            )?;
            debug!(group_id, template_id = id, name = %template.name, "Replaced template");
            id
        }
        None => {
            conn.execute(
                "INSERT INTO provision_templates
                    (group_id, name, description, source_month, source_year, created_by)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    group_id,
                    template.name,
                    template.description,
                    template.source_month,
                    template.source_year,
                    template.created_by
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(group_id, template_id = id, name = %template.name, "Created template");
            id
        }
    };

    let mut stmt = conn.prepare(
        "INSERT INTO provision_template_items (template_id, category_id, planned_amount)
         VALUES (?, ?, ?)",
    )?;
    for item in &template.items {
        stmt.execute(params![
            id,
            item.category_id,
            to_money_string(item.planned_amount)
        ])?;
    }

    Ok(id)
}

pub fn get_template(
    conn: &Connection,
    group_id: i64,
    id: i64,
) -> rusqlite::Result<Option<ProvisionTemplate>> {
    let sql = format!(
        "SELECT {} FROM provision_templates WHERE group_id = ? AND id = ?",
        TEMPLATE_COLUMNS
    );
    let template = conn
        .query_row(&sql, params![group_id, id], map_template)
        .optional()?;

    match template {
        Some(mut template) => {
            template.items = load_items(conn, template.id)?;
            Ok(Some(template))
        }
        None => Ok(None),
    }
}

pub fn list_templates(conn: &Connection, group_id: i64) -> rusqlite::Result<Vec<ProvisionTemplate>> {
    let sql = format!(
        "SELECT {} FROM provision_templates WHERE group_id = ? ORDER BY name COLLATE NOCASE",
        TEMPLATE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut templates = stmt
        .query_map([group_id], map_template)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for template in &mut templates {
        template.items = load_items(conn, template.id)?;
    }
    Ok(templates)
}

pub fn delete_template(conn: &Connection, group_id: i64, id: i64) -> rusqlite::Result<bool> {
    conn.execute(
        "DELETE FROM provision_template_items
         WHERE template_id IN (SELECT id FROM provision_templates WHERE group_id = ? AND id = ?)",
        params![group_id, id],
    )?;
    let rows = conn.execute(
        "DELETE FROM provision_templates WHERE group_id = ? AND id = ?",
        params![group_id, id],
    )?;
    if rows > 0 {
        debug!(group_id, template_id = id, "Deleted template");
    }
    Ok(rows > 0)
}
