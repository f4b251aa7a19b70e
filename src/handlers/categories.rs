use axum::extract::State;
use axum::response::Json;

use crate::context::GroupContext;
use crate::error::AppResult;
use crate::models::CategoryDictionaryEntry;
use crate::services::dictionary::load_category_dictionary;
use crate::state::AppState;

/// The group's category tree flattened in display order.
pub async fn list(
    State(state): State<AppState>,
    ctx: GroupContext,
) -> AppResult<Json<Vec<CategoryDictionaryEntry>>> {
    let conn = state.db.get()?;
    let dictionary = load_category_dictionary(&conn, ctx.group_id)?;
    Ok(Json(dictionary.iter().cloned().collect()))
}
