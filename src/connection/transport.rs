//! Transport abstraction (TCP with optional TLS vs Unix socket)

use crate::Result;
use bytes::BytesMut;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

/// TCP stream variant: plain or TLS-encrypted
#[allow(clippy::large_enum_variant)]
pub enum TcpVariant {
    /// Plain TCP connection
    Plain(TcpStream),
    /// TLS-encrypted TCP connection
    Tls(tokio_rustls::client::TlsStream<TcpStream>),
}

impl std::fmt::Debug for TcpVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TcpVariant::Plain(_) => f.write_str("TcpVariant::Plain(TcpStream)"),
            TcpVariant::Tls(_) => f.write_str("TcpVariant::Tls(TlsStream)"),
        }
    }
}

/// Transport layer abstraction
#[derive(Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// TCP socket (plain or TLS)
    Tcp(TcpVariant),
    /// Unix domain socket
    Unix(UnixStream),
}

impl Transport {
    /// Connect via plain TCP
    pub async fn connect_tcp(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(Transport::Tcp(TcpVariant::Plain(stream)))
    }

    /// Connect via Unix socket
    pub async fn connect_unix(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        Ok(Transport::Unix(stream))
    }

    /// Write all bytes to the transport
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Transport::Tcp(TcpVariant::Plain(stream)) => stream.write_all(buf).await?,
            Transport::Tcp(TcpVariant::Tls(stream)) => stream.write_all(buf).await?,
            Transport::Unix(stream) => stream.write_all(buf).await?,
        }
        Ok(())
    }

    /// Flush the transport
    pub async fn flush(&mut self) -> Result<()> {
        match self {
            Transport::Tcp(TcpVariant::Plain(stream)) => stream.flush().await?,
            Transport::Tcp(TcpVariant::Tls(stream)) => stream.flush().await?,
            Transport::Unix(stream) => stream.flush().await?,
        }
        Ok(())
    }

    /// Read bytes into buffer; returns the number of bytes read (0 = EOF)
    pub async fn read_buf(&mut self, buf: &mut BytesMut) -> Result<usize> {
        let n = match self {
            Transport::Tcp(TcpVariant::Plain(stream)) => stream.read_buf(buf).await?,
            Transport::Tcp(TcpVariant::Tls(stream)) => stream.read_buf(buf).await?,
            Transport::Unix(stream) => stream.read_buf(buf).await?,
        };
        Ok(n)
    }

    /// Upgrade a plain TCP transport to TLS after SSLRequest negotiation.
    ///
    /// Consumes `self` and returns a new `Transport` with a TLS-encrypted
    /// stream. Fails for Unix sockets and already-encrypted transports.
    pub async fn upgrade_to_tls(
        self,
        tls_config: &super::TlsConfig,
        hostname: &str,
    ) -> Result<Self> {
        match self {
            Transport::Tcp(TcpVariant::Plain(tcp_stream)) => {
                let server_name = super::parse_server_name(hostname)?;
                let server_name =
                    rustls_pki_types::ServerName::try_from(server_name).map_err(|_| {
                        crate::Error::Config(format!("invalid hostname for TLS: {}", hostname))
                    })?;

                let client_config = tls_config.client_config();
                let tls_connector = tokio_rustls::TlsConnector::from(client_config);
                let tls_stream = tls_connector
                    .connect(server_name, tcp_stream)
                    .await
                    .map_err(|e| crate::Error::Config(format!("TLS handshake failed: {}", e)))?;

                Ok(Transport::Tcp(TcpVariant::Tls(tls_stream)))
            }
            Transport::Tcp(TcpVariant::Tls(_)) => Err(crate::Error::Config(
                "transport is already TLS-encrypted".into(),
            )),
            Transport::Unix(_) => Err(crate::Error::Config(
                "cannot upgrade Unix socket to TLS".into(),
            )),
        }
    }

    /// Shutdown the transport
    pub async fn shutdown(&mut self) -> Result<()> {
        match self {
            Transport::Tcp(TcpVariant::Plain(stream)) => stream.shutdown().await?,
            Transport::Tcp(TcpVariant::Tls(stream)) => stream.shutdown().await?,
            Transport::Unix(stream) => stream.shutdown().await?,
        }
        Ok(())
    }
}
