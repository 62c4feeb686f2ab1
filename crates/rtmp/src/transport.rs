//! Transport connectors.
//!
//! Sessions are generic over any `AsyncRead + AsyncWrite` stream, so a
//! transport is just whatever produces one: a TCP socket, a TLS stream on
//! top of one, or a caller-supplied HTTP tunnel. What the transport kind
//! does change is handshake strictness: tunneled relays rewrite the
//! handshake echo and must be validated relaxed (see
//! [`SimpleHandshakeClient`](crate::handshake::SimpleHandshakeClient)).

use std::io;

use tokio::net::TcpStream;

use crate::url::RtmpUrl;

/// How the byte stream reaches the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// A plain TCP socket.
    #[default]
    Tcp,
    /// TLS above a TCP socket.
    Tls,
    /// Logical reads/writes relayed through HTTP POST exchanges.
    Tunneled,
}

impl TransportKind {
    /// The transport kind a URL scheme implies.
    pub fn from_url(url: &RtmpUrl) -> Self {
        if url.scheme.is_tunneled() {
            Self::Tunneled
        } else if url.scheme.is_tls() {
            Self::Tls
        } else {
            Self::Tcp
        }
    }

    /// Whether the RTMP handshake echo validation is relaxed on this
    /// transport.
    pub fn relaxed_handshake(&self) -> bool {
        matches!(self, Self::Tunneled)
    }
}

/// Opens a plain TCP connection to the URL's host and port.
pub async fn connect(url: &RtmpUrl) -> io::Result<TcpStream> {
    let stream = TcpStream::connect((url.host.as_str(), url.port)).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Opens a TLS connection to the URL's host and port.
///
/// The rustls client configuration (root store, ALPN) is the caller's; TLS
/// termination policy is out of this crate's scope.
#[cfg(feature = "tls-rustls")]
pub async fn connect_tls(
    url: &RtmpUrl,
    tls_config: std::sync::Arc<rustls::ClientConfig>,
) -> io::Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let stream = connect(url).await?;

    let server_name = rustls::pki_types::ServerName::try_from(url.host.clone())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let connector = tokio_rustls::TlsConnector::from(tls_config);
    connector.connect(server_name, stream).await
}
