//! Browser configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Settings for a [`crate::Browser`] and the router built around it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserConfig {
    /// URL path where the API is mounted (e.g. "/sql-browser")
    pub base_path: String,

    /// Rows per page when a request does not ask for a limit
    pub default_page_size: u64,

    /// Upper bound for requested page sizes
    pub max_page_size: u64,

    /// Peek columns per table, keyed by `schema.table` or bare `table`
    pub peek_columns: BTreeMap<String, Vec<String>>,

    /// Count every table's rows right after each schema load
    pub count_rows_on_load: bool,

    /// Seconds before a row or count statement is abandoned; 0 disables
    pub query_timeout_seconds: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            base_path: "/sql-browser".to_string(),
            default_page_size: 100,
            max_page_size: 500,
            peek_columns: BTreeMap::new(),
            count_rows_on_load: false,
            query_timeout_seconds: 30,
        }
    }
}

impl BrowserConfig {
    /// Parse a JSON configuration; missing fields keep their defaults
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Let other tables preview `columns` of `table` through their foreign keys
    pub fn with_peek_columns<I, S>(mut self, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peek_columns
            .insert(table.into(), columns.into_iter().map(Into::into).collect());
        self
    }

    /// Page size for a requested limit (0 = default), clamped to the maximum
    pub fn page_size(&self, requested: u64) -> u64 {
        let size = if requested == 0 {
            self.default_page_size
        } else {
            requested
        };
        size.min(self.max_page_size)
    }
}
