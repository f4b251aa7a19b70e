//! Semicolon separated import and export of planned amounts.
//!
//! Months are written 1-based (1 = January) and amounts use a decimal comma,
//! so a file exported here imports back unchanged.

use std::collections::BTreeMap;

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, trace, warn};

use crate::context::GroupContext;
use crate::error::{AppError, AppResult};
use crate::models::provision::{NoteUpdate, ProvisionEntry};
use crate::money::{bounded_amount, normalize_note, parse_locale_amount, to_locale_string};
use crate::period::Period;
use crate::services::bulk::{write_entries, WriteOptions};
use crate::services::dictionary::{load_category_dictionary, CategoryDictionary};
use crate::services::grid::{build_provisions_grid, GridQuery};

pub const CSV_DELIMITER: u8 = b';';
pub const CSV_HEADER: [&str; 6] = [
    "category_id",
    "category_name",
    "month",
    "year",
    "planned_amount",
    "note",
];

/// A data row that resolved to a known category and a valid period.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProvisionRow {
    pub row_number: usize,
    pub category_id: i64,
    pub period: Period,
    pub planned_amount: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Default)]
pub struct ParsedProvisions {
    pub rows: Vec<ParsedProvisionRow>,
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: Vec<String>,
}

struct Columns {
    category_id: Option<usize>,
    category_name: Option<usize>,
    month: usize,
    year: usize,
    planned_amount: usize,
    note: Option<usize>,
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
}

fn resolve_columns(headers: &csv::StringRecord) -> AppResult<Columns> {
    let category_id = find_column(headers, "category_id");
    let category_name = find_column(headers, "category_name");
    if category_id.is_none() && category_name.is_none() {
        return Err(AppError::CsvParse(
            "CSV needs a category_id or category_name column".into(),
        ));
    }

    let required = |name: &str| {
        find_column(headers, name)
            .ok_or_else(|| AppError::CsvParse(format!("No {} column found in CSV", name)))
    };

    Ok(Columns {
        category_id,
        category_name,
        month: required("month")?,
        year: required("year")?,
        planned_amount: required("planned_amount")?,
        note: find_column(headers, "note"),
    })
}

fn field<'r>(record: &'r csv::StringRecord, col: Option<usize>) -> Option<&'r str> {
    col.and_then(|c| record.get(c))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn resolve_category(
    record: &csv::StringRecord,
    columns: &Columns,
    dictionary: &CategoryDictionary,
) -> Option<i64> {
    let by_id = field(record, columns.category_id)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|id| dictionary.contains(*id));
    by_id.or_else(|| {
        field(record, columns.category_name)
            .and_then(|name| dictionary.find_by_name(name))
            .map(|entry| entry.category.id)
    })
}

fn parse_record(
    record: &csv::StringRecord,
    columns: &Columns,
    dictionary: &CategoryDictionary,
) -> Result<(i64, Period, Decimal, Option<String>), String> {
    let category_id = resolve_category(record, columns, dictionary)
        .ok_or_else(|| "unknown category".to_string())?;

    let month_text = field(record, Some(columns.month)).unwrap_or_default();
    let month = month_text
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| format!("invalid month '{}'", month_text))?;

    let year_text = field(record, Some(columns.year)).unwrap_or_default();
    let year = year_text
        .parse::<i32>()
        .map_err(|_| format!("invalid year '{}'", year_text))?;
    let period = Period::new(month - 1, year)
        .validate()
        .map_err(|e| e.to_string())?;

    let amount_text = field(record, Some(columns.planned_amount)).unwrap_or_default();
    let amount = parse_locale_amount(amount_text)
        .ok_or_else(|| format!("invalid amount '{}'", amount_text))?;
    let amount =
        bounded_amount(amount).map_err(|_| format!("amount '{}' out of range", amount_text))?;

    let note = normalize_note(field(record, columns.note));
    Ok((category_id, period, amount, note))
}

/// Parse an import file against the group's categories.
///
/// A file without the required columns is rejected as a whole. Individual
/// rows that do not resolve are reported in `rejected` and left out.
pub fn parse_provisions_csv(
    content: &str,
    dictionary: &CategoryDictionary,
) -> AppResult<ParsedProvisions> {
    trace!(content_size = content.len(), "Parsing provisions CSV");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CSV_DELIMITER)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers)?;

    let mut parsed = ParsedProvisions::default();
    for (idx, result) in reader.records().enumerate() {
        let row_number = idx + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                parsed.rejected.push(format!("Row {}: {}", row_number, e));
                continue;
            }
        };
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        match parse_record(&record, &columns, dictionary) {
            Ok((category_id, period, planned_amount, note)) => {
                parsed.rows.push(ParsedProvisionRow {
                    row_number,
                    category_id,
                    period,
                    planned_amount,
                    note,
                })
            }
            Err(reason) => parsed
                .rejected
                .push(format!("Row {}: {}", row_number, reason)),
        }
    }

    if !parsed.rejected.is_empty() {
        warn!(
            rejected = parsed.rejected.len(),
            "Provisions CSV contained invalid rows"
        );
    }
    debug!(rows = parsed.rows.len(), "Parsed provisions CSV");
    Ok(parsed)
}

/// Import planned amounts. Rows may span several periods.
pub fn import_csv(
    conn: &Connection,
    ctx: &GroupContext,
    content: &str,
    overwrite: bool,
) -> AppResult<ImportReport> {
    let dictionary = load_category_dictionary(conn, ctx.group_id)?;
    let parsed = parse_provisions_csv(content, &dictionary)?;

    let mut by_period: BTreeMap<Period, Vec<ProvisionEntry>> = BTreeMap::new();
    for row in parsed.rows {
        by_period.entry(row.period).or_default().push(ProvisionEntry {
            category_id: row.category_id,
            planned_amount: row.planned_amount,
            note: NoteUpdate::Replace(row.note),
        });
    }

    let options = WriteOptions::upsert(json!({ "source": "import", "overwrite": overwrite }))
        .with_overwrite(overwrite);
    let mut report = ImportReport {
        rejected: parsed.rejected,
        ..ImportReport::default()
    };
    for (period, entries) in &by_period {
        let outcome = write_entries(conn, ctx, *period, entries, &options)?;
        report.inserted += outcome.inserted;
        report.updated += outcome.updated;
    }

    info!(
        group_id = ctx.group_id,
        periods = by_period.len(),
        inserted = report.inserted,
        updated = report.updated,
        rejected = report.rejected.len(),
        "Imported provisions CSV"
    );
    Ok(report)
}

/// Every active category of the period, including those with nothing planned.
pub fn export_csv(conn: &Connection, group_id: i64, period: Period) -> AppResult<String> {
    let dictionary = load_category_dictionary(conn, group_id)?;
    let rows = build_provisions_grid(conn, group_id, &dictionary, &GridQuery::new(period))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    let month = (period.month + 1).to_string();
    let year = period.year.to_string();
    for row in &rows {
        writer.write_record([
            row.category_id.to_string().as_str(),
            row.name.as_str(),
            month.as_str(),
            year.as_str(),
            to_locale_string(row.planned).as_str(),
            row.note.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
    let content =
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("Invalid CSV: {}", e)))?;
    debug!(group_id, %period, rows = rows.len(), "Exported provisions CSV");
    Ok(content)
}
