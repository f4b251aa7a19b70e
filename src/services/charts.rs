//! Category tree roll-ups for the budgeting charts.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::category::CategoryType;
use crate::models::provision::ProvisionsGridRow;
use crate::money::{checked_sum, overflow, round_money};
use crate::period::Period;
use crate::services::dictionary::{load_category_dictionary, CategoryDictionary};
use crate::services::grid::{build_provisions_grid, GridQuery};

pub const DEFAULT_CHART_LIMIT: usize = 8;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryTreeNode {
    pub category_id: i64,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(with = "rust_decimal::serde::float")]
    pub planned: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub realized: Decimal,
    pub children: Vec<CategoryTreeNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    pub planned: Decimal,
    pub realized: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedVsActualEntry {
    pub category_id: i64,
    pub name: String,
    pub color: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub planned: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub realized: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionEntry {
    pub category_id: i64,
    pub name: String,
    pub color: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub realized: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
}

/// Link flat rows into a forest.
///
/// Parents come from the dictionary (falling back to the row itself). A row
/// whose parent is absent from `rows` becomes a root, so several roots are normal.
pub fn build_tree(
    rows: &[ProvisionsGridRow],
    dictionary: &CategoryDictionary,
) -> Vec<CategoryTreeNode> {
    let parent_of = |row: &ProvisionsGridRow| {
        dictionary
            .get(row.category_id)
            .map(|entry| entry.category.parent_id)
            .unwrap_or(row.parent_id)
    };

    let present: HashSet<i64> = rows.iter().map(|r| r.category_id).collect();
    let mut children_of: HashMap<i64, Vec<usize>> = HashMap::new();
    let mut roots = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        match parent_of(row) {
            Some(parent) if present.contains(&parent) && parent != row.category_id => {
                children_of.entry(parent).or_default().push(idx)
            }
            _ => roots.push(idx),
        }
    }

    let mut visited = HashSet::new();
    roots
        .into_iter()
        .filter_map(|idx| attach(idx, rows, &children_of, &mut visited))
        .collect()
}

fn attach(
    idx: usize,
    rows: &[ProvisionsGridRow],
    children_of: &HashMap<i64, Vec<usize>>,
    visited: &mut HashSet<i64>,
) -> Option<CategoryTreeNode> {
    let row = &rows[idx];
    if !visited.insert(row.category_id) {
        return None;
    }

    let children = children_of
        .get(&row.category_id)
        .map(|kids| {
            kids.iter()
                .filter_map(|child| attach(*child, rows, children_of, visited))
                .collect()
        })
        .unwrap_or_default();

    Some(CategoryTreeNode {
        category_id: row.category_id,
        name: row.name.clone(),
        color: row.color.clone(),
        category_type: row.category_type,
        planned: row.planned,
        realized: row.realized,
        children,
    })
}

/// Roll totals up from the leaves.
///
/// Leaves keep their own values. An inner node's values are replaced by the
/// sum of its children's aggregated totals, rounded after summation.
pub fn aggregate_tree(node: &mut CategoryTreeNode) -> AppResult<Totals> {
    if node.children.is_empty() {
        return Ok(Totals {
            planned: node.planned,
            realized: node.realized,
        });
    }

    let mut planned = Decimal::ZERO;
    let mut realized = Decimal::ZERO;
    for child in &mut node.children {
        let totals = aggregate_tree(child)?;
        planned = planned
            .checked_add(totals.planned)
            .ok_or_else(|| overflow("planned roll-up"))?;
        realized = realized
            .checked_add(totals.realized)
            .ok_or_else(|| overflow("realized roll-up"))?;
    }

    node.planned = round_money(planned);
    node.realized = round_money(realized);
    Ok(Totals {
        planned: node.planned,
        realized: node.realized,
    })
}

fn aggregated_roots(
    rows: &[ProvisionsGridRow],
    dictionary: &CategoryDictionary,
    category_type: CategoryType,
) -> AppResult<Vec<CategoryTreeNode>> {
    let typed: Vec<ProvisionsGridRow> = rows
        .iter()
        .filter(|r| r.category_type == category_type)
        .cloned()
        .collect();

    let mut roots = build_tree(&typed, dictionary);
    for root in &mut roots {
        aggregate_tree(root)?;
    }
    Ok(roots)
}

/// Top `limit` root categories by aggregated planned amount.
pub fn planned_vs_actual(
    rows: &[ProvisionsGridRow],
    dictionary: &CategoryDictionary,
    category_type: CategoryType,
    limit: usize,
) -> AppResult<Vec<PlannedVsActualEntry>> {
    let mut roots = aggregated_roots(rows, dictionary, category_type)?;
    roots.sort_by(|a, b| b.planned.cmp(&a.planned));

    Ok(roots
        .into_iter()
        .take(limit)
        .map(|node| PlannedVsActualEntry {
            category_id: node.category_id,
            name: node.name,
            color: node.color,
            planned: node.planned,
            realized: node.realized,
        })
        .collect())
}

/// Share of spending among the top `limit` expense roots.
///
/// Percentages are relative to the entries shown, not to the grand total.
pub fn expense_distribution(
    rows: &[ProvisionsGridRow],
    dictionary: &CategoryDictionary,
    limit: usize,
) -> AppResult<Vec<DistributionEntry>> {
    let mut roots: Vec<CategoryTreeNode> =
        aggregated_roots(rows, dictionary, CategoryType::Expense)?
            .into_iter()
            .filter(|node| node.realized > Decimal::ZERO)
            .collect();
    roots.sort_by(|a, b| b.realized.cmp(&a.realized));
    roots.truncate(limit);

    let total = checked_sum(roots.iter().map(|node| node.realized), "distribution total")?;
    if total.is_zero() {
        return Ok(Vec::new());
    }

    roots
        .into_iter()
        .map(|node| {
            let share = node
                .realized
                .checked_div(total)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(|| overflow("distribution share"))?;
            Ok(DistributionEntry {
                percentage: round_money(share),
                category_id: node.category_id,
                name: node.name,
                color: node.color,
                realized: node.realized,
            })
        })
        .collect()
}

pub fn get_planned_vs_actual_chart(
    conn: &Connection,
    group_id: i64,
    period: Period,
    category_type: CategoryType,
    limit: usize,
) -> AppResult<Vec<PlannedVsActualEntry>> {
    let dictionary = load_category_dictionary(conn, group_id)?;
    let query = GridQuery::new(period).with_type(category_type.into());
    let rows = build_provisions_grid(conn, group_id, &dictionary, &query)?;
    planned_vs_actual(&rows, &dictionary, category_type, limit)
}

pub fn get_expense_distribution(
    conn: &Connection,
    group_id: i64,
    period: Period,
    limit: usize,
) -> AppResult<Vec<DistributionEntry>> {
    let dictionary = load_category_dictionary(conn, group_id)?;
    let query = GridQuery::new(period).with_type(CategoryType::Expense.into());
    let rows = build_provisions_grid(conn, group_id, &dictionary, &query)?;
    expense_distribution(&rows, &dictionary, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::Category;
    use rust_decimal_macros::dec;

    fn cat(id: i64, parent_id: Option<i64>, name: &str, category_type: CategoryType) -> Category {
        Category {
            id,
            group_id: 1,
            parent_id,
            name: name.to_string(),
            category_type,
            color: "#abcdef".into(),
            icon: "folder".into(),
            is_active: true,
        }
    }

    fn row(
        category: &Category,
        planned: Decimal,
        realized: Decimal,
    ) -> ProvisionsGridRow {
        ProvisionsGridRow {
            id: category.id,
            category_id: category.id,
            provision_id: None,
            name: category.name.clone(),
            color: category.color.clone(),
            category_type: category.category_type,
            parent_id: category.parent_id,
            planned,
            realized,
            note: None,
        }
    }

    #[test]
    fn test_parent_realized_is_rounded_sum_of_children() {
        let cats = vec![
            cat(1, None, "Food", CategoryType::Expense),
            cat(2, Some(1), "Groceries", CategoryType::Expense),
            cat(3, Some(1), "Restaurants", CategoryType::Expense),
            cat(4, Some(1), "Coffee", CategoryType::Expense),
        ];
        let dictionary = CategoryDictionary::build(cats.clone());
        let rows = vec![
            row(&cats[0], dec!(999), dec!(999)),
            row(&cats[1], dec!(0), dec!(10.00)),
            row(&cats[2], dec!(0), dec!(20.005)),
            row(&cats[3], dec!(0), dec!(5)),
        ];

        let mut roots = build_tree(&rows, &dictionary);
        assert_eq!(roots.len(), 1);
        let totals = aggregate_tree(&mut roots[0]).unwrap();
        assert_eq!(totals.realized, dec!(35.01));
        assert_eq!(totals.planned, dec!(0));
        assert_eq!(roots[0].realized, dec!(35.01));
    }

    #[test]
    fn test_multi_level_rollup() {
        let cats = vec![
            cat(1, None, "Home", CategoryType::Expense),
            cat(2, Some(1), "Utilities", CategoryType::Expense),
            cat(3, Some(2), "Power", CategoryType::Expense),
            cat(4, Some(2), "Water", CategoryType::Expense),
            cat(5, Some(1), "Rent", CategoryType::Expense),
        ];
        let dictionary = CategoryDictionary::build(cats.clone());
        let rows = vec![
            row(&cats[0], dec!(1), dec!(1)),
            row(&cats[1], dec!(1), dec!(1)),
            row(&cats[2], dec!(100), dec!(90)),
            row(&cats[3], dec!(50), dec!(55)),
            row(&cats[4], dec!(1000), dec!(1000)),
        ];

        let mut roots = build_tree(&rows, &dictionary);
        let totals = aggregate_tree(&mut roots[0]).unwrap();
        assert_eq!(totals.planned, dec!(1150));
        assert_eq!(totals.realized, dec!(1145));
        assert_eq!(roots[0].children[0].planned, dec!(150));
    }

    #[test]
    fn test_missing_parent_makes_root() {
        let cats = vec![
            cat(1, None, "Food", CategoryType::Expense),
            cat(2, Some(1), "Groceries", CategoryType::Expense),
            cat(3, None, "Transport", CategoryType::Expense),
        ];
        let dictionary = CategoryDictionary::build(cats.clone());
        let rows = vec![row(&cats[1], dec!(10), dec!(5)), row(&cats[2], dec!(20), dec!(0))];

        let roots = build_tree(&rows, &dictionary);
        let ids: Vec<i64> = roots.iter().map(|n| n.category_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_planned_vs_actual_top_n() {
        let cats = vec![
            cat(1, None, "A", CategoryType::Expense),
            cat(2, None, "B", CategoryType::Expense),
            cat(3, None, "C", CategoryType::Expense),
            cat(4, None, "Salary", CategoryType::Income),
        ];
        let dictionary = CategoryDictionary::build(cats.clone());
        let rows = vec![
            row(&cats[0], dec!(100), dec!(10)),
            row(&cats[1], dec!(300), dec!(20)),
            row(&cats[2], dec!(200), dec!(30)),
            row(&cats[3], dec!(5000), dec!(5000)),
        ];

        let chart = planned_vs_actual(&rows, &dictionary, CategoryType::Expense, 2).unwrap();
        let names: Vec<&str> = chart.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_distribution_percentages_use_shown_entries_only() {
        let cats = vec![
            cat(1, None, "A", CategoryType::Expense),
            cat(2, None, "B", CategoryType::Expense),
            cat(3, None, "C", CategoryType::Expense),
            cat(4, None, "D", CategoryType::Expense),
        ];
        let dictionary = CategoryDictionary::build(cats.clone());
        let rows = vec![
            row(&cats[0], dec!(0), dec!(300)),
            row(&cats[1], dec!(0), dec!(100)),
            row(&cats[2], dec!(0), dec!(1000)),
            row(&cats[3], dec!(0), dec!(0)),
        ];

        let chart = expense_distribution(&rows, &dictionary, 2).unwrap();
        assert_eq!(chart.len(), 2);
        assert_eq!(chart[0].name, "C");
        assert_eq!(chart[0].percentage, dec!(76.92));
        assert_eq!(chart[1].name, "A");
        assert_eq!(chart[1].percentage, dec!(23.08));
    }

    #[test]
    fn test_distribution_empty_without_spending() {
        let cats = vec![cat(1, None, "A", CategoryType::Expense)];
        let dictionary = CategoryDictionary::build(cats.clone());
        let rows = vec![row(&cats[0], dec!(50), dec!(0))];
        assert!(expense_distribution(&rows, &dictionary, 5).unwrap().is_empty());
    }
}
