//! Core connection type
//!
//! A [`Connection`] drives one authenticated socket: startup and
//! authentication, framed message send/receive (with batched writes for the
//! extended protocol), the prepared-statement cache, and the response loops
//! for prepare, execute and simple queries.

use super::state::ConnectionState;
use super::tls::SslMode;
use super::transport::Transport;
use crate::auth::{md5_password, ScramClient};
use crate::params::Param;
use crate::protocol::{
    decode_message, encode_batch, encode_message, AuthenticationMessage, BackendMessage,
    ErrorFields, FrontendMessage,
};
use crate::row::{Column, QueryResult, Row};
use crate::statement::{next_statement_name, Statement, StatementCache};
use crate::{Error, Result};
use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Connection configuration
///
/// Immutable once constructed; use [`ConnectionConfig::builder`] for the
/// optional fields.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Hostname or IP address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Database name
    pub database: String,
    /// Username
    pub user: String,
    /// Password (optional)
    pub password: Option<String>,
    /// Additional startup parameters
    pub params: HashMap<String, String>,
    /// Application name for Postgres logs
    pub application_name: Option<String>,
    /// SSL/TLS mode
    pub sslmode: SslMode,
    /// Unix socket path; takes precedence over host/port when set
    pub unix_socket: Option<PathBuf>,
    /// Log every wire message at debug level
    pub debug: bool,
}

impl ConnectionConfig {
    /// Create new configuration with defaults (port 5432, no TLS)
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 5432,
            database: database.into(),
            user: user.into(),
            password: None,
            params: HashMap::new(),
            application_name: None,
            sslmode: SslMode::default(),
            unix_socket: None,
            debug: false,
        }
    }

    /// Create a builder for advanced configuration
    pub fn builder(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            config: Self::new(host, database, user),
        }
    }

    /// Set password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add a startup parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Builder for [`ConnectionConfig`]
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the port (default: 5432)
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Add a startup parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.params.insert(key.into(), value.into());
        self
    }

    /// Set application name for Postgres logs
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = Some(name.into());
        self
    }

    /// Set SSL/TLS mode
    pub fn sslmode(mut self, mode: SslMode) -> Self {
        self.config.sslmode = mode;
        self
    }

    /// Connect through a Unix domain socket instead of TCP
    pub fn unix_socket(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.unix_socket = Some(path.into());
        self
    }

    /// Log every wire message at debug level
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

/// Postgres connection
pub struct Connection {
    transport: Option<Transport>,
    state: ConnectionState,
    read_buf: BytesMut,
    process_id: i32,
    secret_key: i32,
    parameters: HashMap<String, String>,
    transaction_status: u8,
    statements: StatementCache,
    debug: bool,
}

impl Connection {
    /// Connect and authenticate.
    ///
    /// `tls_config` is required when `config.sslmode` is not `disable`.
    pub async fn connect(
        config: &ConnectionConfig,
        tls_config: Option<&super::TlsConfig>,
    ) -> Result<Self> {
        let transport = match &config.unix_socket {
            Some(path) => Transport::connect_unix(path).await?,
            None => Transport::connect_tcp(&config.host, config.port).await?,
        };

        let mut conn = Self {
            transport: Some(transport),
            state: ConnectionState::Initial,
            read_buf: BytesMut::with_capacity(8192),
            process_id: 0,
            secret_key: 0,
            parameters: HashMap::new(),
            transaction_status: crate::protocol::constants::tx_status::IDLE,
            statements: StatementCache::new(),
            debug: config.debug,
        };

        conn.startup(config, tls_config).await?;
        Ok(conn)
    }

    /// Backend process ID from BackendKeyData
    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    /// Backend secret key from BackendKeyData (for cancel requests)
    pub fn secret_key(&self) -> i32 {
        self.secret_key
    }

    /// A server parameter reported via ParameterStatus
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(|s| s.as_str())
    }

    /// Transaction status from the last ReadyForQuery (`I`, `T` or `E`)
    pub fn transaction_status(&self) -> u8 {
        self.transaction_status
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of cached prepared statements
    pub fn cached_statements(&self) -> usize {
        self.statements.len()
    }

    /// Negotiate TLS via the SSLRequest protocol.
    ///
    /// Sends the 8-byte SSLRequest message and reads the server's single-byte
    /// response: `S` upgrades the transport, `N` means the server refuses TLS,
    /// anything else is a protocol error.
    async fn negotiate_tls(
        &mut self,
        tls_config: &super::TlsConfig,
        hostname: &str,
        sslmode: SslMode,
    ) -> Result<()> {
        self.state.transition(ConnectionState::NegotiatingTls)?;

        self.send_message(&FrontendMessage::SslRequest).await?;

        let transport = self
            .transport
            .as_mut()
            .expect("transport taken during TLS upgrade");
        while self.read_buf.is_empty() {
            let n = transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }

        let response = self.read_buf[0];
        self.read_buf.advance(1);

        match response {
            b'S' => {
                tracing::debug!("server accepted TLS, upgrading connection");
                let transport = self.transport.take().expect("transport not available");
                self.transport = Some(transport.upgrade_to_tls(tls_config, hostname).await?);
                tracing::info!("TLS connection established");
                Ok(())
            }
            b'N' => Err(Error::Config(format!(
                "server does not support TLS (sslmode={})",
                sslmode
            ))),
            other => Err(Error::Protocol(format!(
                "unexpected SSLRequest response byte: 0x{:02X}",
                other
            ))),
        }
    }

    /// Perform startup and authentication
    async fn startup(
        &mut self,
        config: &ConnectionConfig,
        tls_config: Option<&super::TlsConfig>,
    ) -> Result<()> {
        async {
            if config.sslmode != SslMode::Disable {
                let tls = tls_config.ok_or_else(|| {
                    Error::Config(format!(
                        "sslmode={} requires a TlsConfig but none was provided",
                        config.sslmode
                    ))
                })?;
                if config.unix_socket.is_some() {
                    return Err(Error::Config(
                        "TLS is only supported for TCP connections".into(),
                    ));
                }
                self.negotiate_tls(tls, &config.host, config.sslmode).await?;
            }

            self.state.transition(ConnectionState::AwaitingAuth)?;

            let mut params = vec![
                ("user".to_string(), config.user.clone()),
                ("database".to_string(), config.database.clone()),
            ];
            if let Some(app_name) = &config.application_name {
                params.push(("application_name".to_string(), app_name.clone()));
            }
            for (k, v) in &config.params {
                params.push((k.clone(), v.clone()));
            }

            let startup = FrontendMessage::Startup {
                version: crate::protocol::constants::PROTOCOL_VERSION,
                params,
            };
            self.send_message(&startup).await?;

            self.state.transition(ConnectionState::Authenticating)?;
            self.authenticate(config).await?;

            self.state.transition(ConnectionState::Idle)?;
            tracing::info!("startup complete");
            Ok(())
        }
        .instrument(tracing::info_span!(
            "startup",
            user = %config.user,
            database = %config.database
        ))
        .await
    }

    /// Drive the authentication loop until ReadyForQuery
    async fn authenticate(&mut self, config: &ConnectionConfig) -> Result<()> {
        // An ErrorResponse after AuthenticationOk is retained and raised once
        // the terminating ReadyForQuery arrives; before Ok it is fatal
        // immediately.
        let mut authenticated = false;
        let mut deferred_err: Option<ErrorFields> = None;

        loop {
            let msg = self.receive_message().await?;

            match msg {
                BackendMessage::Authentication(auth) => match auth {
                    AuthenticationMessage::Ok => {
                        tracing::debug!("authentication successful");
                        authenticated = true;
                        // Keep reading until ReadyForQuery
                    }
                    AuthenticationMessage::CleartextPassword => {
                        let password = config
                            .password
                            .as_ref()
                            .ok_or_else(|| Error::Authentication("password required".into()))?;
                        self.send_message(&FrontendMessage::Password(password.clone()))
                            .await?;
                    }
                    AuthenticationMessage::Md5Password { salt } => {
                        let password = config
                            .password
                            .as_ref()
                            .ok_or_else(|| Error::Authentication("password required".into()))?;
                        let hash = md5_password(&config.user, password, &salt);
                        self.send_message(&FrontendMessage::Password(hash)).await?;
                    }
                    AuthenticationMessage::Sasl { mechanisms } => {
                        self.handle_sasl(&mechanisms, config).await?;
                    }
                    AuthenticationMessage::SaslContinue { .. } => {
                        return Err(Error::Protocol(
                            "unexpected SASLContinue outside of SASL flow".into(),
                        ));
                    }
                    AuthenticationMessage::SaslFinal { .. } => {
                        return Err(Error::Protocol(
                            "unexpected SASLFinal outside of SASL flow".into(),
                        ));
                    }
                    AuthenticationMessage::Other { code } => {
                        return Err(Error::Authentication(format!(
                            "unsupported authentication method (code {})",
                            code
                        )));
                    }
                },
                BackendMessage::BackendKeyData {
                    process_id,
                    secret_key,
                } => {
                    self.process_id = process_id;
                    self.secret_key = secret_key;
                }
                BackendMessage::NegotiateProtocolVersion { newest_minor } => {
                    return Err(Error::Protocol(format!(
                        "server too old: protocol 3.0 rejected (newest supported minor version {})",
                        newest_minor
                    )));
                }
                BackendMessage::ReadyForQuery { status } => {
                    self.transaction_status = status;
                    if let Some(fields) = deferred_err {
                        return Err(Error::Server(fields));
                    }
                    if !authenticated {
                        return Err(Error::Protocol(
                            "ReadyForQuery before authentication completed".into(),
                        ));
                    }
                    return Ok(());
                }
                BackendMessage::ErrorResponse(fields) => {
                    if authenticated {
                        deferred_err = Some(fields);
                    } else {
                        self.close_abrupt();
                        return Err(Error::Authentication(fields.to_string()));
                    }
                }
                BackendMessage::Unknown { tag } => {
                    tracing::debug!(tag, "skipping unknown message during startup");
                }
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected message during auth: {:?}",
                        other
                    )));
                }
            }
        }
    }

    /// Handle SASL authentication (SCRAM-SHA-256)
    async fn handle_sasl(
        &mut self,
        mechanisms: &[String],
        config: &ConnectionConfig,
    ) -> Result<()> {
        if !mechanisms.iter().any(|m| m == "SCRAM-SHA-256") {
            return Err(Error::Authentication(format!(
                "server does not support SCRAM-SHA-256; available: {}",
                mechanisms.join(", ")
            )));
        }

        let password = config.password.as_ref().ok_or_else(|| {
            Error::Authentication("password required for SCRAM authentication".into())
        })?;

        let mut scram = ScramClient::new(config.user.clone(), password.clone());
        tracing::debug!("initiating SCRAM-SHA-256 authentication");

        // Client first message
        let client_first = scram.client_first();
        self.send_message(&FrontendMessage::SaslInitialResponse {
            mechanism: "SCRAM-SHA-256".to_string(),
            data: client_first.into_bytes(),
        })
        .await?;

        // Server first message
        let server_first_data = match self.receive_message().await? {
            BackendMessage::Authentication(AuthenticationMessage::SaslContinue { data }) => data,
            BackendMessage::ErrorResponse(fields) => {
                self.close_abrupt();
                return Err(Error::Authentication(fields.to_string()));
            }
            _ => {
                return Err(Error::Protocol(
                    "expected SASLContinue during SASL authentication".into(),
                ));
            }
        };
        let server_first = String::from_utf8(server_first_data).map_err(|e| {
            Error::Authentication(format!("invalid UTF-8 in server first message: {}", e))
        })?;

        // Client final message
        let (client_final, scram_state) = scram
            .client_final(&server_first)
            .map_err(|e| Error::Authentication(format!("SCRAM error: {}", e)))?;
        self.send_message(&FrontendMessage::SaslResponse {
            data: client_final.into_bytes(),
        })
        .await?;

        // Server final message: verify the server signature
        let server_final_data = match self.receive_message().await? {
            BackendMessage::Authentication(AuthenticationMessage::SaslFinal { data }) => data,
            BackendMessage::ErrorResponse(fields) => {
                self.close_abrupt();
                return Err(Error::Authentication(fields.to_string()));
            }
            _ => {
                return Err(Error::Protocol(
                    "expected SASLFinal during SASL authentication".into(),
                ));
            }
        };
        let server_final = String::from_utf8(server_final_data).map_err(|e| {
            Error::Authentication(format!("invalid UTF-8 in server final message: {}", e))
        })?;

        scram
            .verify_server_final(&server_final, &scram_state)
            .map_err(|e| Error::Authentication(format!("SCRAM verification failed: {}", e)))?;

        tracing::debug!("SCRAM-SHA-256 authentication successful");
        Ok(())
    }

    /// Prepare a statement, or return the cached one for identical SQL.
    ///
    /// Two round trips: Parse/Sync establishes the statement, Describe/Sync
    /// retrieves its parameter count and column descriptors.
    pub async fn prepare(&mut self, sql: &str) -> Result<Statement> {
        if let Some(stmt) = self.statements.get(sql) {
            return Ok(stmt);
        }

        let name = next_statement_name();

        // Round trip 1: Parse
        self.state.transition(ConnectionState::InQuery)?;
        self.send_batch(&[
            FrontendMessage::Parse {
                name: name.clone(),
                sql: sql.to_string(),
                param_types: Vec::new(),
            },
            FrontendMessage::Sync,
        ])
        .await?;

        let mut pending_err: Option<ErrorFields> = None;
        loop {
            match self.receive_message().await? {
                BackendMessage::ParseComplete => {}
                BackendMessage::ErrorResponse(fields) => {
                    pending_err.get_or_insert(fields);
                }
                BackendMessage::ReadyForQuery { status } => {
                    self.transaction_status = status;
                    break;
                }
                other => return self.abort_protocol(&other),
            }
        }
        self.state.transition(ConnectionState::Idle)?;
        if let Some(fields) = pending_err {
            return Err(Error::Server(fields));
        }

        // Round trip 2: Describe
        self.state.transition(ConnectionState::InQuery)?;
        self.send_batch(&[
            FrontendMessage::Describe {
                kind: b'S',
                name: name.clone(),
            },
            FrontendMessage::Sync,
        ])
        .await?;

        let mut param_count = 0usize;
        let mut columns: Vec<Column> = Vec::new();
        let mut pending_err: Option<ErrorFields> = None;
        loop {
            match self.receive_message().await? {
                BackendMessage::ParameterDescription(oids) => {
                    param_count = oids.len();
                }
                BackendMessage::NoData => {
                    columns.clear();
                }
                BackendMessage::RowDescription(fields) => {
                    columns = fields
                        .into_iter()
                        .map(|f| Column::new(f.name, f.type_oid))
                        .collect();
                }
                BackendMessage::ErrorResponse(fields) => {
                    pending_err.get_or_insert(fields);
                }
                BackendMessage::ReadyForQuery { status } => {
                    self.transaction_status = status;
                    break;
                }
                other => return self.abort_protocol(&other),
            }
        }
        self.state.transition(ConnectionState::Idle)?;
        if let Some(fields) = pending_err {
            return Err(Error::Server(fields));
        }

        let stmt = Statement::new(sql.to_string(), name, param_count, Arc::new(columns));
        self.statements.insert(stmt.clone());
        Ok(stmt)
    }

    /// Look up a cached statement by SQL text
    pub fn cached_statement(&self, sql: &str) -> Option<Statement> {
        self.statements.get(sql)
    }

    /// Execute a prepared statement through Bind/Execute/Sync.
    ///
    /// The parameter count is validated before anything is written to the
    /// socket. `max_rows` of zero means no limit.
    pub async fn execute_statement(
        &mut self,
        stmt: &Statement,
        params: &[Param],
        max_rows: i32,
    ) -> Result<QueryResult> {
        if params.len() != stmt.param_count() {
            return Err(Error::ParameterCount {
                expected: stmt.param_count(),
                got: params.len(),
            });
        }

        let values: Vec<Option<String>> = params.iter().map(|p| p.clone_text()).collect();

        // One flush for the whole batch
        self.state.transition(ConnectionState::InQuery)?;
        self.send_batch(&[
            FrontendMessage::Bind {
                portal: String::new(),
                statement: stmt.name().to_string(),
                params: values,
            },
            FrontendMessage::Execute {
                portal: String::new(),
                max_rows,
            },
            FrontendMessage::Sync,
        ])
        .await?;

        let columns = stmt.columns();
        let mut rows: Vec<Row> = Vec::new();
        let mut command_tag = String::new();
        let mut bound = false;
        let mut pending_err: Option<Error> = None;

        loop {
            match self.receive_message().await? {
                BackendMessage::BindComplete => {
                    bound = true;
                }
                BackendMessage::DataRow(values) => {
                    if !bound {
                        let msg = BackendMessage::DataRow(values);
                        return self.abort_protocol(&msg);
                    }
                    if pending_err.is_none() {
                        match Row::decode(Arc::clone(&columns), values) {
                            Ok(row) => rows.push(row),
                            Err(e) => {
                                // Finish draining to ReadyForQuery before
                                // surfacing, so the session stays usable.
                                pending_err = Some(e);
                            }
                        }
                    }
                }
                BackendMessage::CommandComplete(tag) => {
                    command_tag = tag;
                }
                BackendMessage::PortalSuspended => {
                    // Row limit reached; Sync still produces ReadyForQuery
                }
                BackendMessage::EmptyQueryResponse => {}
                BackendMessage::ErrorResponse(fields) => {
                    pending_err.get_or_insert(Error::Server(fields));
                }
                BackendMessage::ReadyForQuery { status } => {
                    self.transaction_status = status;
                    break;
                }
                other => return self.abort_protocol(&other),
            }
        }

        self.state.transition(ConnectionState::Idle)?;
        match pending_err {
            Some(err) => Err(err),
            None => Ok(QueryResult::new(columns, rows, command_tag)),
        }
    }

    /// Run SQL through the simple query protocol, discarding any results.
    ///
    /// This is the path for strings containing multiple `;`-separated
    /// statements, which the extended protocol rejects.
    pub async fn simple_query(&mut self, sql: &str) -> Result<()> {
        self.state.transition(ConnectionState::InQuery)?;
        self.send_message(&FrontendMessage::Query(sql.to_string()))
            .await?;

        let mut pending_err: Option<ErrorFields> = None;
        loop {
            match self.receive_message().await? {
                BackendMessage::RowDescription(_)
                | BackendMessage::DataRow(_)
                | BackendMessage::CommandComplete(_)
                | BackendMessage::EmptyQueryResponse => {}
                BackendMessage::ErrorResponse(fields) => {
                    pending_err.get_or_insert(fields);
                }
                BackendMessage::ReadyForQuery { status } => {
                    self.transaction_status = status;
                    break;
                }
                other => return self.abort_protocol(&other),
            }
        }

        self.state.transition(ConnectionState::Idle)?;
        match pending_err {
            Some(fields) => Err(Error::Server(fields)),
            None => Ok(()),
        }
    }

    /// Close the connection, sending Terminate best-effort.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let buf = encode_message(&FrontendMessage::Terminate);
            let _ = transport.write_all(&buf).await;
            let _ = transport.flush().await;
            let _ = transport.shutdown().await;
        }
        let _ = self.state.transition(ConnectionState::Closed);
    }

    /// Drop the socket without a Terminate handshake. Used on protocol
    /// violations and authentication failures, where the stream state is
    /// no longer trustworthy.
    fn close_abrupt(&mut self) {
        self.transport = None;
        let _ = self.state.transition(ConnectionState::Closed);
    }

    fn abort_protocol<T>(&mut self, msg: &BackendMessage) -> Result<T> {
        self.close_abrupt();
        Err(Error::Protocol(format!(
            "unexpected message for current state: {:?}",
            msg
        )))
    }

    /// Send a single frontend message
    async fn send_message(&mut self, msg: &FrontendMessage) -> Result<()> {
        let buf = encode_message(msg);
        if self.debug {
            tracing::debug!(bytes = buf.len(), "sending frontend message");
        }
        let transport = self
            .transport
            .as_mut()
            .ok_or(Error::ConnectionClosed)?;
        transport.write_all(&buf).await?;
        transport.flush().await?;
        Ok(())
    }

    /// Encode a batch of frontend messages and flush once
    async fn send_batch(&mut self, msgs: &[FrontendMessage]) -> Result<()> {
        let buf = encode_batch(msgs);
        if self.debug {
            tracing::debug!(
                messages = msgs.len(),
                bytes = buf.len(),
                "sending frontend batch"
            );
        }
        let transport = self
            .transport
            .as_mut()
            .ok_or(Error::ConnectionClosed)?;
        transport.write_all(&buf).await?;
        transport.flush().await?;
        Ok(())
    }

    /// Receive the next backend message.
    ///
    /// NoticeResponse is logged as a warning and ParameterStatus is recorded
    /// on the connection; neither is returned to callers.
    async fn receive_message(&mut self) -> Result<BackendMessage> {
        loop {
            match decode_message(&mut self.read_buf) {
                Ok((msg, consumed)) => {
                    self.read_buf.advance(consumed);
                    if self.debug {
                        tracing::debug!(bytes = consumed, "received backend message");
                    }
                    match msg {
                        BackendMessage::NoticeResponse(fields) => {
                            tracing::warn!(notice = %fields, "server notice");
                            continue;
                        }
                        BackendMessage::ParameterStatus { name, value } => {
                            tracing::debug!(%name, %value, "parameter status");
                            self.parameters.insert(name, value);
                            continue;
                        }
                        other => return Ok(other),
                    }
                }
                // The frame is incomplete; read more below
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {}
                // Malformed length header: the stream can't be resynchronized
                Err(e) => {
                    self.close_abrupt();
                    return Err(Error::Protocol(e.to_string()));
                }
            }

            let transport = self
                .transport
                .as_mut()
                .ok_or(Error::ConnectionClosed)?;
            let n = transport.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("process_id", &self.process_id)
            .field("cached_statements", &self.statements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config() {
        let config = ConnectionConfig::new("localhost", "testdb", "testuser")
            .password("testpass")
            .param("application_name", "cassis-wire");

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "testdb");
        assert_eq!(config.user, "testuser");
        assert_eq!(config.password, Some("testpass".to_string()));
        assert_eq!(
            config.params.get("application_name"),
            Some(&"cassis-wire".to_string())
        );
        assert!(!config.debug);
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::builder("db.internal", "mydb", "myuser")
            .port(5433)
            .password("secret")
            .application_name("my_app")
            .sslmode(SslMode::Require)
            .debug(true)
            .build();

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5433);
        assert_eq!(config.password, Some("secret".to_string()));
        assert_eq!(config.application_name, Some("my_app".to_string()));
        assert_eq!(config.sslmode, SslMode::Require);
        assert!(config.debug);
    }

    #[test]
    fn test_connection_config_unix_socket() {
        let config = ConnectionConfig::builder("", "mydb", "myuser")
            .unix_socket("/run/postgresql/.s.PGSQL.5432")
            .build();
        assert!(config.unix_socket.is_some());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let config = ConnectionConfig::builder("localhost", "postgres", "postgres")
            .port(1) // nothing listens here
            .build();
        let result = Connection::connect(&config, None).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
