use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Active/Inactive flag used by departments and accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveStatus {
    Active,
    Inactive,
}

impl ActiveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveStatus::Active => "Active",
            ActiveStatus::Inactive => "Inactive",
        }
    }
}

impl FromStr for ActiveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ActiveStatus::Active),
            "inactive" => Ok(ActiveStatus::Inactive),
            _ => Err("Status must be Active or Inactive".to_string()),
        }
    }
}

/// Query-string filters shared by the ledger list endpoints.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ListFilter {
    /// `%term%` for LIKE, or `None` when no search term was given.
    pub fn pattern(&self) -> Option<String> {
        non_blank(self.q.as_deref()).map(contains_pattern)
    }

    pub fn kind(&self) -> Option<&str> {
        non_blank(self.kind.as_deref())
    }

    pub fn status(&self) -> Option<&str> {
        non_blank(self.status.as_deref())
    }
}

/// Lowercased `%term%` with LIKE wildcards in the term escaped.
/// Queries using it must say `ESCAPE '\'`.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
