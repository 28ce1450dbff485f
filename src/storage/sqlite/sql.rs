//! SQL construction helpers.
//!
//! [`FilterBuilder`] collects `WHERE` conditions with numbered parameters
//! (`?1`, `?2`, ...) so user input never lands in SQL text.

use rusqlite::types::Value;

/// Accumulates filter conditions and their bound values.
///
/// # Examples
///
/// ```ignore
/// let mut filter = FilterBuilder::new();
/// let p = filter.bind("swift".to_string());
/// filter.push(format!("l.technology = {p}"));
/// assert_eq!(filter.where_clause(), " WHERE l.technology = ?1");
/// ```
#[derive(Debug, Default)]
pub struct FilterBuilder {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl FilterBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value and returns its placeholder.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    /// Adds a condition; conditions are joined with `AND`.
    pub fn push(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    /// Adds `column = value`.
    pub fn eq(&mut self, column: &str, value: impl Into<Value>) {
        let p = self.bind(value);
        self.push(format!("{column} = {p}"));
    }

    /// Returns the conditions as ` WHERE a AND b`, or an empty string.
    #[must_use]
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Returns the bound values in placeholder order.
    #[must_use]
    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Encodes a list of strings as a JSON array for `json_each(?)`.
///
/// Lets a variable-length `IN` list bind as a single parameter.
#[must_use]
pub fn json_list<S: AsRef<str>>(items: &[S]) -> String {
    let items: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
    serde_json::Value::from(items).to_string()
}

/// Clamps a `usize` limit into the `i64` range `SQLite` binds.
#[must_use]
pub fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
