//! Prepared statements and the per-connection statement cache

use crate::row::SharedColumns;
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use std::sync::Arc;

/// Length of generated server-side statement names
const STATEMENT_NAME_LEN: usize = 36;

/// A prepared statement handle.
///
/// Cheap to clone; the SQL text, server-assigned name, parameter count and
/// column descriptors are shared and immutable. After the owning session
/// reconnects, the server no longer knows the name — held handles are then
/// re-resolved through the cache by SQL text and re-prepared under a fresh
/// name.
#[derive(Debug, Clone)]
pub struct Statement {
    inner: Arc<StatementInner>,
}

#[derive(Debug)]
struct StatementInner {
    sql: String,
    name: String,
    param_count: usize,
    columns: SharedColumns,
}

impl Statement {
    pub(crate) fn new(
        sql: String,
        name: String,
        param_count: usize,
        columns: SharedColumns,
    ) -> Self {
        Self {
            inner: Arc::new(StatementInner {
                sql,
                name,
                param_count,
                columns,
            }),
        }
    }

    /// The SQL text this statement was prepared from
    pub fn sql(&self) -> &str {
        &self.inner.sql
    }

    /// The server-assigned statement name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of `$n` parameters the statement takes
    pub fn param_count(&self) -> usize {
        self.inner.param_count
    }

    /// Result column descriptors (empty for statements returning no rows)
    pub fn columns(&self) -> SharedColumns {
        Arc::clone(&self.inner.columns)
    }
}

/// Cache of prepared statements, keyed by exact SQL text.
///
/// Lives on the connection, so replacing the connection on reconnect
/// discards every cached name together with the server-side statements
/// they referred to.
#[derive(Debug, Default)]
pub(crate) struct StatementCache {
    by_sql: HashMap<String, Statement>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sql: &str) -> Option<Statement> {
        self.by_sql.get(sql).cloned()
    }

    pub fn insert(&mut self, stmt: Statement) {
        self.by_sql.insert(stmt.sql().to_string(), stmt);
    }

    pub fn len(&self) -> usize {
        self.by_sql.len()
    }
}

/// Generate a fresh server-side statement name: 36 random alphanumeric
/// characters from a cryptographic RNG (`thread_rng` is a CSPRNG).
pub(crate) fn next_statement_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATEMENT_NAME_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(sql: &str) -> Statement {
        Statement::new(
            sql.to_string(),
            next_statement_name(),
            0,
            Arc::new(Vec::new()),
        )
    }

    #[test]
    fn test_statement_name_length_and_charset() {
        let name = next_statement_name();
        assert_eq!(name.len(), 36);
        assert!(name.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_statement_names_are_unique() {
        let a = next_statement_name();
        let b = next_statement_name();
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_hit_returns_same_statement() {
        let mut cache = StatementCache::new();
        let stmt = statement("SELECT 1");
        cache.insert(stmt.clone());

        let hit = cache.get("SELECT 1").unwrap();
        assert_eq!(hit.name(), stmt.name());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_keys_by_exact_sql() {
        let mut cache = StatementCache::new();
        cache.insert(statement("SELECT 1"));

        assert!(cache.get("SELECT 1 ").is_none());
        assert!(cache.get("select 1").is_none());
    }

    #[test]
    fn test_cache_reinsert_replaces() {
        let mut cache = StatementCache::new();
        cache.insert(statement("SELECT 1"));
        let second = statement("SELECT 1");
        cache.insert(second.clone());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("SELECT 1").unwrap().name(), second.name());
    }

    #[test]
    fn test_statement_clone_shares_inner() {
        let stmt = statement("SELECT 1");
        let clone = stmt.clone();
        assert_eq!(stmt.name(), clone.name());
        assert_eq!(stmt.sql(), clone.sql());
    }
}
