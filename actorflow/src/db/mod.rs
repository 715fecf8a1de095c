//! Database collaborator interface.
//!
//! The engine treats the database as an opaque synchronous call that
//! returns rows or fails. Transactions are the collaborator's business.

use crate::core::Value;
use crate::errors::DatabaseError;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;

/// One result row: column name to value, in column order.
pub type Row = IndexMap<String, Value>;

/// A connection able to run queries.
#[cfg_attr(test, mockall::automock)]
pub trait DatabaseConnection: Send + Sync {
    /// Runs `sql` and returns all rows.
    fn execute_query(&self, sql: &str) -> Result<Vec<Row>, DatabaseError>;
}

/// An in-memory connection answering registered queries.
///
/// Queries are matched by their exact text after trimming. Unregistered
/// queries fail.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    results: RwLock<HashMap<String, Vec<Row>>>,
    executed: RwLock<Vec<String>>,
}

impl InMemoryDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the rows returned for `sql`.
    #[must_use]
    pub fn with_result(self, sql: &str, rows: Vec<Row>) -> Self {
        self.register(sql, rows);
        self
    }

    /// Registers the rows returned for `sql`, replacing any previous result.
    pub fn register(&self, sql: &str, rows: Vec<Row>) {
        self.results.write().insert(sql.trim().to_string(), rows);
    }

    /// Returns the queries run so far, oldest first.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.executed.read().clone()
    }
}

impl DatabaseConnection for InMemoryDatabase {
    fn execute_query(&self, sql: &str) -> Result<Vec<Row>, DatabaseError> {
        let sql = sql.trim();
        self.executed.write().push(sql.to_string());
        self.results
            .read()
            .get(sql)
            .cloned()
            .ok_or_else(|| DatabaseError::query_failed(sql, "no result registered"))
    }
}

/// Builds a row from `(column, value)` pairs.
#[must_use]
pub fn row<I, K, V>(columns: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    columns
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
