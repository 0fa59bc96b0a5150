//! TLS configuration for secure connections to Postgres.
//!
//! TLS is negotiated through the SSLRequest protocol: the connection starts
//! as plain TCP and upgrades if the server answers `S`.

use crate::{Error, Result};
use rustls::{ClientConfig, RootCertStore};
use rustls_pemfile::Item;
use std::fs;
use std::sync::Arc;

/// SSL/TLS connection mode matching PostgreSQL `sslmode` parameter.
///
/// Controls whether TLS is negotiated with the server. Certificate and
/// hostname verification always run when TLS is active; `verify-ca` and
/// `verify-full` differ from `require` only in intent, which matters when
/// a custom CA bundle is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// No TLS (plaintext connection)
    #[default]
    Disable,
    /// TLS required
    Require,
    /// TLS required, server certificate must be signed by a trusted CA
    VerifyCa,
    /// TLS required, trusted CA plus hostname match
    VerifyFull,
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disable => write!(f, "disable"),
            Self::Require => write!(f, "require"),
            Self::VerifyCa => write!(f, "verify-ca"),
            Self::VerifyFull => write!(f, "verify-full"),
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "disable" => Ok(Self::Disable),
            "require" => Ok(Self::Require),
            "verify-ca" => Ok(Self::VerifyCa),
            "verify-full" => Ok(Self::VerifyFull),
            _ => Err(Error::Config(format!(
                "invalid sslmode '{}': expected disable, require, verify-ca, or verify-full",
                s
            ))),
        }
    }
}

/// TLS configuration for secure Postgres connections.
///
/// Built from system root certificates by default, or a custom CA bundle
/// via [`TlsConfigBuilder::ca_cert_path`].
#[derive(Clone)]
pub struct TlsConfig {
    /// Path to CA certificate file (None = system roots)
    ca_cert_path: Option<String>,
    /// Compiled rustls ClientConfig
    client_config: Arc<ClientConfig>,
}

impl TlsConfig {
    /// Create a new TLS configuration builder.
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Get the rustls ClientConfig for this TLS configuration.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client_config.clone()
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("client_config", &"<ClientConfig>")
            .finish()
    }
}

/// Builder for TLS configuration.
#[derive(Default)]
pub struct TlsConfigBuilder {
    ca_cert_path: Option<String>,
}

impl TlsConfigBuilder {
    /// Set the path to a custom CA certificate file (PEM format).
    ///
    /// If not set, system root certificates are used.
    pub fn ca_cert_path(mut self, path: impl Into<String>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Build the TLS configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA certificate file cannot be read or parsed,
    /// or no root certificates could be loaded at all.
    pub fn build(self) -> Result<TlsConfig> {
        let root_store = match &self.ca_cert_path {
            Some(ca_path) => load_custom_ca(ca_path)?,
            None => {
                let result = rustls_native_certs::load_native_certs();

                let mut store = RootCertStore::empty();
                for cert in result.certs {
                    let _ = store.add_parsable_certificates(std::iter::once(cert));
                }

                if store.is_empty() {
                    return Err(Error::Config(
                        "failed to load any system root certificates".to_string(),
                    ));
                }

                store
            }
        };

        let client_config = Arc::new(
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );

        Ok(TlsConfig {
            ca_cert_path: self.ca_cert_path,
            client_config,
        })
    }
}

/// Load a custom CA certificate bundle from a PEM file.
fn load_custom_ca(ca_path: &str) -> Result<RootCertStore> {
    let ca_cert_data = fs::read(ca_path).map_err(|e| {
        Error::Config(format!(
            "failed to read CA certificate file '{}': {}",
            ca_path, e
        ))
    })?;

    let mut reader = std::io::Cursor::new(&ca_cert_data);
    let mut root_store = RootCertStore::empty();
    let mut found_certs = 0;

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(Item::X509Certificate(cert))) => {
                let _ = root_store.add_parsable_certificates(std::iter::once(cert));
                found_certs += 1;
            }
            Ok(Some(_)) => {
                // Skip non-certificate items (private keys, etc.)
            }
            Ok(None) => break,
            Err(_) => {
                return Err(Error::Config(format!(
                    "failed to parse CA certificate from '{}'",
                    ca_path
                )));
            }
        }
    }

    if found_certs == 0 {
        return Err(Error::Config(format!(
            "no valid certificates found in '{}'",
            ca_path
        )));
    }

    Ok(root_store)
}

/// Normalize a hostname for TLS SNI (Server Name Indication).
pub fn parse_server_name(hostname: &str) -> Result<String> {
    let hostname = hostname.trim_end_matches('.');

    if hostname.is_empty() || hostname.len() > 253 {
        return Err(Error::Config(format!(
            "invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    if !hostname
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '.')
    {
        return Err(Error::Config(format!(
            "invalid hostname for TLS: '{}'",
            hostname
        )));
    }

    Ok(hostname.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_name_valid() {
        assert!(parse_server_name("localhost").is_ok());
        assert!(parse_server_name("example.com").is_ok());
        assert!(parse_server_name("db.internal.example.com").is_ok());
    }

    #[test]
    fn test_parse_server_name_trailing_dot() {
        assert_eq!(parse_server_name("example.com.").unwrap(), "example.com");
    }

    #[test]
    fn test_parse_server_name_rejects_port() {
        assert!(parse_server_name("example.com:5432").is_err());
    }

    #[test]
    fn test_parse_server_name_rejects_empty() {
        assert!(parse_server_name("").is_err());
        assert!(parse_server_name(".").is_err());
    }

    #[test]
    fn test_ssl_mode_from_str() {
        assert_eq!("disable".parse::<SslMode>().unwrap(), SslMode::Disable);
        assert_eq!("require".parse::<SslMode>().unwrap(), SslMode::Require);
        assert_eq!("verify-ca".parse::<SslMode>().unwrap(), SslMode::VerifyCa);
        assert_eq!(
            "verify-full".parse::<SslMode>().unwrap(),
            SslMode::VerifyFull
        );
    }

    #[test]
    fn test_ssl_mode_from_str_invalid() {
        assert!("invalid".parse::<SslMode>().is_err());
        assert!("prefer".parse::<SslMode>().is_err());
    }

    #[test]
    fn test_ssl_mode_display_round_trip() {
        for mode in [
            SslMode::Disable,
            SslMode::Require,
            SslMode::VerifyCa,
            SslMode::VerifyFull,
        ] {
            assert_eq!(mode.to_string().parse::<SslMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_ssl_mode_default() {
        assert_eq!(SslMode::default(), SslMode::Disable);
    }
}
