use crate::models::category::{Category, CategoryType, NewCategory};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tracing::debug;

const CATEGORY_COLUMNS: &str =
    "id, group_id, parent_id, name, category_type, color, icon, is_active";

fn map_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    let type_str: String = row.get(4)?;
    let category_type = CategoryType::parse(&type_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Text,
            format!("unknown category type '{}'", type_str).into(),
        )
    })?;

    Ok(Category {
        id: row.get(0)?,
        group_id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        category_type,
        color: row.get(5)?,
        icon: row.get(6)?,
        is_active: row.get(7)?,
    })
}

/// All categories of a group, active or not, unordered.
pub fn list_categories(conn: &Connection, group_id: i64) -> rusqlite::Result<Vec<Category>> {
    let sql = format!(
        "SELECT {} FROM categories WHERE group_id = ?",
        CATEGORY_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let categories = stmt
        .query_map([group_id], map_category)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(group_id, count = categories.len(), "Listed categories");
    Ok(categories)
}

pub fn create_category(
    conn: &Connection,
    group_id: i64,
    category: &NewCategory,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO categories (group_id, parent_id, name, category_type, color, icon, is_active)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            group_id,
            category.parent_id,
            category.name,
            category.category_type.as_str(),
            category.color,
            category.icon,
            category.is_active
        ],
    )?;
    let id = conn.last_insert_rowid();
    debug!(group_id, category_id = id, name = %category.name, "Created category");
    Ok(id)
}

/// Soft delete / restore.
pub fn set_category_active(
    conn: &Connection,
    group_id: i64,
    id: i64,
    is_active: bool,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "UPDATE categories SET is_active = ?, updated_at = datetime('now')
         WHERE group_id = ? AND id = ?",
        params![is_active, group_id, id],
    )?;
    if rows > 0 {
        debug!(group_id, category_id = id, is_active, "Toggled category");
    }
    Ok(rows > 0)
}
