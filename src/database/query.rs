//! Filter predicates for item reads.
//!
//! A predicate is SQL text that only ever contains placeholders, plus the
//! values bound to them. Keywords never end up inside the SQL text itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const SELECT_ITEMS: &str = "SELECT items.id, items.name, categories.name, items.image_filename
     FROM items INNER JOIN categories ON (items.category_id = categories.id)";

/// How a search keyword is compared against item and category names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Whole-name equality.
    #[default]
    Exact,
    Substring,
    Prefix,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchMode::Exact => "exact",
            MatchMode::Substring => "substring",
            MatchMode::Prefix => "prefix",
        };
        f.write_str(s)
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "substring" => Ok(MatchMode::Substring),
            "prefix" => Ok(MatchMode::Prefix),
            other => Err(format!(
                "unknown match mode '{}' (expected exact, substring or prefix)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ItemFilter {
    #[default]
    All,
    Keyword { keyword: String, mode: MatchMode },
}

impl ItemFilter {
    /// An empty keyword is the same as no filter at all.
    pub fn keyword(keyword: impl Into<String>, mode: MatchMode) -> Self {
        let keyword = keyword.into();
        if keyword.is_empty() {
            ItemFilter::All
        } else {
            ItemFilter::Keyword { keyword, mode }
        }
    }

    pub fn predicate(&self) -> Option<Predicate> {
        match self {
            ItemFilter::All => None,
            ItemFilter::Keyword { keyword, mode } => {
                let clause = match mode {
                    MatchMode::Exact => "items.name = ?1 OR categories.name = ?1",
                    // instr/substr keep '%' and '_' in the keyword literal
                    MatchMode::Substring => {
                        "instr(items.name, ?1) > 0 OR instr(categories.name, ?1) > 0"
                    }
                    MatchMode::Prefix => {
                        "substr(items.name, 1, length(?1)) = ?1 OR substr(categories.name, 1, length(?1)) = ?1"
                    }
                };
                Some(Predicate {
                    clause,
                    params: vec![keyword.clone()],
                })
            }
        }
    }

    /// Full SELECT statement for this filter, ordered by item id.
    pub fn to_sql(&self) -> (String, Vec<String>) {
        match self.predicate() {
            None => (format!("{} ORDER BY items.id", SELECT_ITEMS), Vec::new()),
            Some(predicate) => (
                format!("{} WHERE {} ORDER BY items.id", SELECT_ITEMS, predicate.clause),
                predicate.params,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub clause: &'static str,
    pub params: Vec<String>,
}
