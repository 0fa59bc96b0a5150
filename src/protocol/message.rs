//! Protocol message types

use bytes::Bytes;

/// Frontend message (client → server)
#[derive(Debug, Clone)]
pub enum FrontendMessage {
    /// Startup message
    Startup {
        /// Protocol version
        version: i32,
        /// Connection parameters
        params: Vec<(String, String)>,
    },

    /// Password message (also carries SASL client-final and MD5 responses)
    Password(String),

    /// Simple query message
    Query(String),

    /// Parse: create a named prepared statement
    Parse {
        /// Statement name (empty = unnamed statement)
        name: String,
        /// SQL text with `$n` placeholders
        sql: String,
        /// Pre-specified parameter type OIDs (usually empty — server infers)
        param_types: Vec<u32>,
    },

    /// Bind: bind parameter values to a statement, producing a portal
    Bind {
        /// Portal name (empty = unnamed portal)
        portal: String,
        /// Source prepared statement name
        statement: String,
        /// Parameter values in text format; `None` is SQL null (wire length `-1`)
        params: Vec<Option<String>>,
    },

    /// Describe a prepared statement (`S`) or portal (`P`)
    Describe {
        /// `b'S'` or `b'P'`
        kind: u8,
        /// Statement or portal name
        name: String,
    },

    /// Execute a bound portal
    Execute {
        /// Portal name (empty = unnamed portal)
        portal: String,
        /// Maximum rows to return; zero means no limit
        max_rows: i32,
    },

    /// Sync: end the extended-protocol batch, request ReadyForQuery
    Sync,

    /// Terminate message
    Terminate,

    /// SASL initial response message
    SaslInitialResponse {
        /// SASL mechanism name (e.g., "SCRAM-SHA-256")
        mechanism: String,
        /// SASL client first message data
        data: Vec<u8>,
    },

    /// SASL response message; raw mechanism data, not NUL-terminated
    SaslResponse {
        /// SASL client final message data
        data: Vec<u8>,
    },

    /// SSLRequest message (TLS negotiation)
    SslRequest,
}

/// Backend message (server → client)
#[derive(Debug, Clone)]
pub enum BackendMessage {
    /// Authentication request
    Authentication(AuthenticationMessage),

    /// Backend key data (for cancellation)
    BackendKeyData {
        /// Process ID
        process_id: i32,
        /// Secret key
        secret_key: i32,
    },

    /// Bind complete
    BindComplete,

    /// Command complete
    CommandComplete(String),

    /// Data row
    DataRow(Vec<Option<Bytes>>),

    /// Empty query response (query string was empty)
    EmptyQueryResponse,

    /// Error response
    ErrorResponse(ErrorFields),

    /// Server rejects protocol 3.x minor version
    NegotiateProtocolVersion {
        /// Newest minor protocol version the server supports
        newest_minor: i32,
    },

    /// Statement returns no rows (Describe response)
    NoData,

    /// Notice response
    NoticeResponse(ErrorFields),

    /// Parameter description (Describe response)
    ParameterDescription(Vec<u32>),

    /// Parameter status
    ParameterStatus {
        /// Parameter name
        name: String,
        /// Parameter value
        value: String,
    },

    /// Parse complete
    ParseComplete,

    /// Portal suspended (Execute row limit reached)
    PortalSuspended,

    /// Ready for query
    ReadyForQuery {
        /// Transaction status
        status: u8,
    },

    /// Row description
    RowDescription(Vec<FieldDescription>),

    /// A tag this client does not interpret; the body was consumed by its
    /// advertised length. Skippable during startup, fatal mid-query.
    Unknown {
        /// The unrecognized tag byte
        tag: u8,
    },
}

/// Authentication message types
#[derive(Debug, Clone)]
pub enum AuthenticationMessage {
    /// Authentication OK
    Ok,

    /// Cleartext password required
    CleartextPassword,

    /// MD5 password required
    Md5Password {
        /// Salt for MD5 hash
        salt: [u8; 4],
    },

    /// SASL authentication mechanisms available (Postgres 10+)
    Sasl {
        /// List of SASL mechanism names (e.g., ["SCRAM-SHA-256"])
        mechanisms: Vec<String>,
    },

    /// SASL continuation message (server challenge)
    SaslContinue {
        /// SASL server first/continue message data
        data: Vec<u8>,
    },

    /// SASL final message (server verification)
    SaslFinal {
        /// SASL server final message data
        data: Vec<u8>,
    },

    /// A sub-code this client does not implement (Kerberos, GSSAPI, SSPI, ...)
    Other {
        /// The raw authentication sub-code
        code: i32,
    },
}

/// Field description (column metadata)
#[derive(Debug, Clone)]
pub struct FieldDescription {
    /// Column name
    pub name: String,
    /// Table OID (0 if not a table column)
    pub table_oid: i32,
    /// Column attribute number (0 if not a table column)
    pub column_attr: i16,
    /// Data type OID
    pub type_oid: u32,
    /// Data type size
    pub type_size: i16,
    /// Type modifier
    pub type_modifier: i32,
    /// Format code (0 = text, 1 = binary)
    pub format_code: i16,
}

/// Error/notice fields
///
/// Holds the fields surfaced to users. The wire body carries more codes
/// (`V`, `C`, `P`, `p`, `q`, `F`, `L`, `R`); those are consumed by the
/// decoder but not retained.
#[derive(Debug, Clone, Default)]
pub struct ErrorFields {
    /// Severity (ERROR, WARNING, etc.)
    pub severity: Option<String>,
    /// Human-readable message
    pub message: Option<String>,
    /// Additional detail
    pub detail: Option<String>,
    /// Hint
    pub hint: Option<String>,
    /// Context in which the error occurred
    pub where_: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Data type name
    pub data_type: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        if let Some(ref severity) = self.severity {
            write!(f, "{}", severity)?;
            wrote = true;
        }
        if let Some(ref msg) = self.message {
            if wrote {
                write!(f, ": ")?;
            }
            write!(f, "{}", msg)?;
            wrote = true;
        }
        for (label, value) in [
            ("detail", &self.detail),
            ("hint", &self.hint),
            ("where", &self.where_),
            ("schema", &self.schema),
            ("table", &self.table),
            ("column", &self.column),
            ("type", &self.data_type),
            ("constraint", &self.constraint),
        ] {
            if let Some(v) = value {
                if wrote {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", label, v)?;
                wrote = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_fields_display_severity_and_message() {
        let fields = ErrorFields {
            severity: Some("ERROR".to_string()),
            message: Some("syntax error at or near \"SELEC\"".to_string()),
            ..Default::default()
        };
        assert_eq!(
            fields.to_string(),
            "ERROR: syntax error at or near \"SELEC\""
        );
    }

    #[test]
    fn test_error_fields_display_with_hint() {
        let fields = ErrorFields {
            message: Some("column \"x\" does not exist".to_string()),
            hint: Some("Perhaps you meant \"y\".".to_string()),
            ..Default::default()
        };
        let s = fields.to_string();
        assert!(s.contains("does not exist"));
        assert!(s.contains("hint: Perhaps"));
    }
}
