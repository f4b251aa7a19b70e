use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Expense,
    Income,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "expense",
            CategoryType::Income => "income",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expense" => Some(CategoryType::Expense),
            "income" => Some(CategoryType::Income),
            _ => None,
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub group_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub category_type: CategoryType,
    pub color: String,
    pub icon: String,
    pub is_active: bool,
}

/// A category together with its position in the tree.
///
/// `path` lists ancestor names from the root down to and including this
/// category, so `path.len() == depth + 1`.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDictionaryEntry {
    #[serde(flatten)]
    pub category: Category,
    pub path: Vec<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub parent_id: Option<i64>,
    pub category_type: CategoryType,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewCategory {
    pub fn expense(name: &str, parent_id: Option<i64>) -> Self {
        Self {
            name: name.to_string(),
            parent_id,
            category_type: CategoryType::Expense,
            color: default_color(),
            icon: default_icon(),
            is_active: true,
        }
    }

    pub fn income(name: &str, parent_id: Option<i64>) -> Self {
        Self {
            category_type: CategoryType::Income,
            ..Self::expense(name, parent_id)
        }
    }
}

fn default_color() -> String {
    "#6b7280".to_string()
}

fn default_icon() -> String {
    "folder".to_string()
}

fn default_active() -> bool {
    true
}
