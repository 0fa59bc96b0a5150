//! Guarded sessions over a single connection
//!
//! A [`Session`] is a cloneable handle to one authenticated connection.
//! Every operation takes the session guard, so a single session is strictly
//! serialised: concurrent callers queue in arrival order and never observe
//! an intermediate message stream. Implicit socket loss is recovered once
//! per operation by reconnecting (which discards the prepared-statement
//! cache); an explicit [`Session::close`] is terminal.

use crate::connection::{Connection, ConnectionConfig, TlsConfig};
use crate::params::Param;
use crate::row::QueryResult;
use crate::statement::Statement;
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A handle to one authenticated connection, serialised by a guard.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

struct SessionInner {
    conn: Option<Connection>,
    config: ConnectionConfig,
    tls: Option<TlsConfig>,
    closed: bool,
}

impl Session {
    /// Connect and authenticate.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        Self::connect_inner(config, None).await
    }

    /// Connect with TLS; required when `config.sslmode` is not `disable`.
    pub async fn connect_with_tls(config: ConnectionConfig, tls: TlsConfig) -> Result<Self> {
        Self::connect_inner(config, Some(tls)).await
    }

    async fn connect_inner(config: ConnectionConfig, tls: Option<TlsConfig>) -> Result<Self> {
        let conn = Connection::connect(&config, tls.as_ref()).await?;
        Ok(Self {
            inner: Arc::new(Mutex::new(SessionInner {
                conn: Some(conn),
                config,
                tls,
                closed: false,
            })),
        })
    }

    /// Close the session. Idempotent; later operations fail with
    /// [`Error::SessionClosed`].
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        if let Some(mut conn) = inner.conn.take() {
            conn.close().await;
        }
        inner.closed = true;
    }

    /// True while the session holds an open connection and has not been
    /// explicitly closed.
    pub async fn is_open(&self) -> bool {
        let inner = self.inner.lock().await;
        !inner.closed && inner.conn.is_some()
    }

    /// Backend process ID and secret key, retained for out-of-band cancel
    /// requests on a secondary socket.
    pub async fn backend_key(&self) -> Option<(i32, i32)> {
        let inner = self.inner.lock().await;
        inner
            .conn
            .as_ref()
            .map(|c| (c.process_id(), c.secret_key()))
    }

    /// A server parameter reported during startup (e.g. `server_version`)
    pub async fn server_parameter(&self, name: &str) -> Option<String> {
        let inner = self.inner.lock().await;
        inner
            .conn
            .as_ref()
            .and_then(|c| c.parameter(name).map(str::to_string))
    }

    /// Prepare `sql`, or return the cached statement for identical text.
    pub async fn prepare(&self, sql: &str) -> Result<Statement> {
        let mut inner = self.inner.lock().await;
        inner.check().await?;
        inner.prepare(sql).await
    }

    /// Execute a prepared statement with no row limit.
    ///
    /// A statement prepared before a reconnect is transparently re-prepared:
    /// resolution goes through the statement cache by SQL text.
    pub async fn execute(&self, stmt: &Statement, params: &[Param]) -> Result<QueryResult> {
        self.execute_with_limit(stmt, params, 0).await
    }

    /// Execute with a row limit; zero means unlimited.
    pub async fn execute_with_limit(
        &self,
        stmt: &Statement,
        params: &[Param],
        row_limit: i32,
    ) -> Result<QueryResult> {
        let mut inner = self.inner.lock().await;
        inner.check().await?;

        // Re-resolve through the cache: after a reconnect the held handle
        // names a statement the server no longer knows.
        let resolved = match inner.conn().cached_statement(stmt.sql()) {
            Some(found) => found,
            None => inner.prepare(stmt.sql()).await?,
        };

        inner.execute(&resolved, params, row_limit).await
    }

    /// Prepare (or fetch from cache) and execute in one call.
    pub async fn query(&self, sql: &str, params: &[Param]) -> Result<QueryResult> {
        let mut inner = self.inner.lock().await;
        inner.check().await?;
        let stmt = inner.prepare(sql).await?;
        inner.execute(&stmt, params, 0).await
    }

    /// Run SQL through the simple query protocol; results are discarded.
    ///
    /// This is the path for strings containing multiple `;`-separated
    /// statements.
    pub async fn execute_simple(&self, sql: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check().await?;
        inner.execute_simple(sql).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl SessionInner {
    /// Pre-operation check: reject closed sessions, recover implicit
    /// disconnects by reconnecting once (dropping every cached statement
    /// with the old connection).
    async fn check(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        if self.conn.is_none() {
            tracing::warn!("connection lost; reconnecting and discarding prepared statements");
            match Connection::connect(&self.config, self.tls.as_ref()).await {
                Ok(conn) => self.conn = Some(conn),
                Err(e) => {
                    tracing::warn!(error = %e, "reconnect failed");
                    return Err(Error::Disconnected);
                }
            }
        }
        Ok(())
    }

    fn conn(&self) -> &Connection {
        self.conn.as_ref().expect("checked connection")
    }

    async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        let result = self
            .conn
            .as_mut()
            .expect("checked connection")
            .prepare(sql)
            .await;
        self.absorb(result)
    }

    async fn execute(
        &mut self,
        stmt: &Statement,
        params: &[Param],
        row_limit: i32,
    ) -> Result<QueryResult> {
        let result = self
            .conn
            .as_mut()
            .expect("checked connection")
            .execute_statement(stmt, params, row_limit)
            .await;
        self.absorb(result)
    }

    async fn execute_simple(&mut self, sql: &str) -> Result<()> {
        let result = self
            .conn
            .as_mut()
            .expect("checked connection")
            .simple_query(sql)
            .await;
        self.absorb(result)
    }

    /// Classify an operation result. Transport and protocol failures drop
    /// the connection so the next operation reconnects; server/interface
    /// errors leave it quiescent and usable.
    fn absorb<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(ref err) = result {
            if connection_is_poisoned(err) {
                self.conn = None;
            }
        }
        result
    }
}

/// Errors after which the socket state can no longer be trusted.
fn connection_is_poisoned(err: &Error) -> bool {
    matches!(
        err,
        Error::Io(_) | Error::ConnectionClosed | Error::Protocol(_) | Error::InvalidState { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poisoning_classification() {
        assert!(connection_is_poisoned(&Error::ConnectionClosed));
        assert!(connection_is_poisoned(&Error::Protocol("bad tag".into())));
        assert!(connection_is_poisoned(&Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe"
        ))));

        // Quiescent errors keep the connection
        assert!(!connection_is_poisoned(&Error::Server(Default::default())));
        assert!(!connection_is_poisoned(&Error::ParameterCount {
            expected: 1,
            got: 2
        }));
        assert!(!connection_is_poisoned(&Error::Decode("bad int".into())));
        assert!(!connection_is_poisoned(&Error::SessionClosed));
    }
}
