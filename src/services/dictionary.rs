//! In-memory category tree for a financial group.
//!
//! Every entry carries its ancestor `path` and `depth`. Iteration follows a
//! pre-order walk with siblings sorted by name, case-insensitively.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::db::queries::categories;
use crate::error::AppResult;
use crate::models::category::{Category, CategoryDictionaryEntry};

#[derive(Debug, Clone, Default)]
pub struct CategoryDictionary {
    entries: HashMap<i64, CategoryDictionaryEntry>,
    order: Vec<i64>,
}

impl CategoryDictionary {
    /// Arrange flat categories into the dictionary.
    ///
    /// Categories that cannot be reached from a root (dangling or cyclic
    /// parent references) are left out.
    pub fn build(categories: Vec<Category>) -> Self {
        let total = categories.len();
        let known: HashSet<i64> = categories.iter().map(|c| c.id).collect();

        let mut children: HashMap<Option<i64>, Vec<Category>> = HashMap::new();
        for category in categories {
            children.entry(category.parent_id).or_default().push(category);
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        }

        let mut dictionary = CategoryDictionary::default();
        let mut visited: HashSet<i64> = HashSet::new();

        // (category, ancestor names); reversed pushes keep pre-order alphabetical.
        let mut stack: Vec<(Category, Vec<String>)> = children
            .remove(&None)
            .unwrap_or_default()
            .into_iter()
            .rev()
            .map(|c| (c, Vec::new()))
            .collect();

        while let Some((category, ancestors)) = stack.pop() {
            if !visited.insert(category.id) {
                warn!(category_id = category.id, "Category visited twice, skipping");
                continue;
            }

            let mut path = ancestors;
            path.push(category.name.clone());
            let depth = path.len() - 1;

            if let Some(kids) = children.remove(&Some(category.id)) {
                for child in kids.into_iter().rev() {
                    stack.push((child, path.clone()));
                }
            }

            dictionary.order.push(category.id);
            dictionary.entries.insert(
                category.id,
                CategoryDictionaryEntry {
                    category,
                    path,
                    depth,
                },
            );
        }

        let skipped = total - dictionary.entries.len();
        if skipped > 0 {
            let dangling: Vec<i64> = children
                .iter()
                .filter_map(|(parent, _)| *parent)
                .filter(|parent| !known.contains(parent))
                .collect();
            warn!(
                skipped,
                ?dangling,
                "Categories unreachable from any root were excluded"
            );
        }

        dictionary
    }

    pub fn get(&self, id: i64) -> Option<&CategoryDictionaryEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in tree order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryDictionaryEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn ids(&self) -> Vec<i64> {
        self.order.clone()
    }

    /// First entry in tree order whose name matches, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<&CategoryDictionaryEntry> {
        let wanted = name.trim().to_lowercase();
        self.iter()
            .find(|entry| entry.category.name.to_lowercase() == wanted)
    }
}

/// Lowercase with accents stripped from Latin letters, so "Água" sorts
/// next to "agua" rather than after "z".
fn collation_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'ç' => 'c',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ñ' => 'n',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

fn sort_key(category: &Category) -> (String, &str, i64) {
    (collation_key(&category.name), &category.name, category.id)
}

/// Load and arrange every category of the group.
pub fn load_category_dictionary(conn: &Connection, group_id: i64) -> AppResult<CategoryDictionary> {
    let categories = categories::list_categories(conn, group_id)?;
    let dictionary = CategoryDictionary::build(categories);
    debug!(group_id, count = dictionary.len(), "Loaded category dictionary");
    Ok(dictionary)
}

/// The requested ids that exist in the dictionary, or every id when none
/// were requested. Unknown ids are dropped without error.
pub fn ensure_category_ids(dictionary: &CategoryDictionary, ids: Option<&[i64]>) -> Vec<i64> {
    match ids {
        Some(ids) if !ids.is_empty() => {
            let mut seen = HashSet::new();
            ids.iter()
                .copied()
                .filter(|id| dictionary.contains(*id) && seen.insert(*id))
                .collect()
        }
        _ => dictionary.ids(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::CategoryType;

    fn cat(id: i64, parent_id: Option<i64>, name: &str) -> Category {
        Category {
            id,
            group_id: 1,
            parent_id,
            name: name.to_string(),
            category_type: CategoryType::Expense,
            color: "#000000".into(),
            icon: "folder".into(),
            is_active: true,
        }
    }

    #[test]
    fn test_path_and_depth_for_nested_category() {
        let dictionary = CategoryDictionary::build(vec![
            cat(3, Some(2), "Groceries"),
            cat(1, None, "Living"),
            cat(2, Some(1), "Food"),
        ]);

        let entry = dictionary.get(3).unwrap();
        assert_eq!(entry.path, vec!["Living", "Food", "Groceries"]);
        assert_eq!(entry.depth, 2);
        assert_eq!(dictionary.get(1).unwrap().depth, 0);
    }

    #[test]
    fn test_path_length_matches_depth() {
        let dictionary = CategoryDictionary::build(vec![
            cat(1, None, "A"),
            cat(2, Some(1), "B"),
            cat(3, Some(2), "C"),
            cat(4, Some(3), "D"),
            cat(5, None, "E"),
        ]);
        for entry in dictionary.iter() {
            assert_eq!(entry.path.len(), entry.depth + 1);
        }
    }

    #[test]
    fn test_pre_order_with_case_insensitive_siblings() {
        let dictionary = CategoryDictionary::build(vec![
            cat(1, None, "transport"),
            cat(2, None, "Housing"),
            cat(3, Some(2), "rent"),
            cat(4, Some(2), "Electricity"),
            cat(5, None, "bills"),
        ]);
        let names: Vec<&str> = dictionary
            .iter()
            .map(|e| e.category.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["bills", "Housing", "Electricity", "rent", "transport"]
        );
    }

    #[test]
    fn test_accented_siblings_sort_with_their_base_letter() {
        let dictionary = CategoryDictionary::build(vec![
            cat(1, None, "Zebra"),
            cat(2, None, "Água"),
            cat(3, None, "Escola"),
            cat(4, None, "Educação"),
            cat(5, None, "apple"),
        ]);
        let names: Vec<&str> = dictionary
            .iter()
            .map(|e| e.category.name.as_str())
            .collect();
        assert_eq!(names, vec!["Água", "apple", "Educação", "Escola", "Zebra"]);
    }

    #[test]
    fn test_orphans_are_excluded() {
        let dictionary = CategoryDictionary::build(vec![
            cat(1, None, "Root"),
            cat(2, Some(99), "Orphan"),
            cat(3, Some(2), "Orphan child"),
        ]);
        assert_eq!(dictionary.len(), 1);
        assert!(!dictionary.contains(2));
        assert!(!dictionary.contains(3));
    }

    #[test]
    fn test_cycle_does_not_loop() {
        let dictionary = CategoryDictionary::build(vec![
            cat(1, Some(2), "A"),
            cat(2, Some(1), "B"),
            cat(3, None, "Root"),
        ]);
        assert_eq!(dictionary.ids(), vec![3]);
    }

    #[test]
    fn test_ensure_category_ids() {
        let dictionary = CategoryDictionary::build(vec![cat(1, None, "A"), cat(2, None, "B")]);

        assert_eq!(ensure_category_ids(&dictionary, None), vec![1, 2]);
        assert_eq!(ensure_category_ids(&dictionary, Some(&[])), vec![1, 2]);
        assert_eq!(ensure_category_ids(&dictionary, Some(&[2, 42, 2])), vec![2]);
    }

    #[test]
    fn test_find_by_name_ignores_case() {
        let dictionary = CategoryDictionary::build(vec![cat(1, None, "Groceries")]);
        assert_eq!(dictionary.find_by_name(" groceries ").unwrap().category.id, 1);
        assert!(dictionary.find_by_name("rent").is_none());
    }
}
