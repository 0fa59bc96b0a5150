//! Postgres protocol constants

/// Protocol version 3.0
pub const PROTOCOL_VERSION: i32 = 0x0003_0000;

/// SSLRequest code (80877103 = 1234 << 16 | 5679)
pub const SSL_REQUEST_CODE: i32 = 0x04D2_162F;

/// Message type tags
pub mod tags {
    /// Authentication request
    pub const AUTHENTICATION: u8 = b'R';

    /// Backend key data
    pub const BACKEND_KEY_DATA: u8 = b'K';

    /// Bind complete
    pub const BIND_COMPLETE: u8 = b'2';

    /// Command complete
    pub const COMMAND_COMPLETE: u8 = b'C';

    /// Data row
    pub const DATA_ROW: u8 = b'D';

    /// Empty query response
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';

    /// Error response
    pub const ERROR_RESPONSE: u8 = b'E';

    /// Negotiate protocol version (server rejects our minor version)
    pub const NEGOTIATE_PROTOCOL_VERSION: u8 = b'v';

    /// No data (statement returns no rows)
    pub const NO_DATA: u8 = b'n';

    /// Notice response
    pub const NOTICE_RESPONSE: u8 = b'N';

    /// Parameter description
    pub const PARAMETER_DESCRIPTION: u8 = b't';

    /// Parameter status
    pub const PARAMETER_STATUS: u8 = b'S';

    /// Parse complete
    pub const PARSE_COMPLETE: u8 = b'1';

    /// Portal suspended (row limit reached)
    pub const PORTAL_SUSPENDED: u8 = b's';

    /// Ready for query
    pub const READY_FOR_QUERY: u8 = b'Z';

    /// Row description
    pub const ROW_DESCRIPTION: u8 = b'T';
}

/// Authentication sub-codes carried by the `R` message
pub mod auth {
    /// Authentication successful
    pub const OK: i32 = 0;

    /// Kerberos V5 (unsupported)
    pub const KERBEROS_V5: i32 = 2;

    /// Cleartext password required
    pub const CLEARTEXT_PASSWORD: i32 = 3;

    /// MD5 password required
    pub const MD5_PASSWORD: i32 = 5;

    /// GSSAPI (unsupported)
    pub const GSS: i32 = 7;

    /// GSSAPI continuation (unsupported)
    pub const GSS_CONTINUE: i32 = 8;

    /// SSPI (unsupported)
    pub const SSPI: i32 = 9;

    /// SASL mechanisms available (Postgres 10+)
    pub const SASL: i32 = 10;

    /// SASL server challenge
    pub const SASL_CONTINUE: i32 = 11;

    /// SASL server final message
    pub const SASL_FINAL: i32 = 12;
}

/// Transaction status carried by ReadyForQuery
pub mod tx_status {
    /// Idle (not in transaction)
    pub const IDLE: u8 = b'I';

    /// In transaction block
    pub const IN_TRANSACTION: u8 = b'T';

    /// Failed transaction (queries will be rejected until END)
    pub const FAILED: u8 = b'E';
}
