//! RTMP URL parsing.
//!
//! `rtmp[s|t|ts|e|te]://host[:port]/app[/subapp]/streamKey[?query]`

use std::fmt;

/// Errors raised while parsing an RTMP URL.
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    /// The URL is not parseable at all.
    #[error("invalid url: {0}")]
    Invalid(#[from] url::ParseError),
    /// The scheme is not an RTMP scheme.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// The URL has no host.
    #[error("missing host")]
    MissingHost,
    /// The path carries no app and stream key.
    #[error("missing app or stream key in path: {0}")]
    MissingPath(String),
}

/// The RTMP scheme family. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtmpScheme {
    /// Plain RTMP over TCP.
    Rtmp,
    /// RTMP over TLS.
    Rtmps,
    /// RTMP tunneled through HTTP.
    Rtmpt,
    /// RTMP tunneled through HTTPS.
    Rtmpts,
    /// RTMP with the legacy Adobe obfuscation (transported like plain RTMP).
    Rtmpe,
    /// Tunneled RTMP with the legacy Adobe obfuscation.
    Rtmpte,
}

impl RtmpScheme {
    fn parse(scheme: &str) -> Option<Self> {
        // url::Url lowercases the scheme already, but accept anything
        match scheme.to_ascii_lowercase().as_str() {
            "rtmp" => Some(Self::Rtmp),
            "rtmps" => Some(Self::Rtmps),
            "rtmpt" => Some(Self::Rtmpt),
            "rtmpts" => Some(Self::Rtmpts),
            "rtmpe" => Some(Self::Rtmpe),
            "rtmpte" => Some(Self::Rtmpte),
            _ => None,
        }
    }

    /// The default port of this scheme.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Rtmp | Self::Rtmpe => 1935,
            Self::Rtmps | Self::Rtmpts => 443,
            Self::Rtmpt | Self::Rtmpte => 80,
        }
    }

    /// Whether this scheme tunnels through HTTP, which relaxes the handshake
    /// echo validation.
    pub fn is_tunneled(&self) -> bool {
        matches!(self, Self::Rtmpt | Self::Rtmpts | Self::Rtmpte)
    }

    /// Whether this scheme runs over TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Rtmps | Self::Rtmpts)
    }
}

impl fmt::Display for RtmpScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self {
            Self::Rtmp => "rtmp",
            Self::Rtmps => "rtmps",
            Self::Rtmpt => "rtmpt",
            Self::Rtmpts => "rtmpts",
            Self::Rtmpe => "rtmpe",
            Self::Rtmpte => "rtmpte",
        };
        f.write_str(scheme)
    }
}

/// A parsed RTMP URL, split the way the `connect` command wants it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpUrl {
    /// The scheme.
    pub scheme: RtmpScheme,
    /// The host.
    pub host: String,
    /// The port, with the scheme default filled in.
    pub port: u16,
    /// The application name: every path segment except the last.
    pub app: String,
    /// The stream key: the last path segment plus any query string.
    pub stream_key: String,
    /// The URL up to but not including the stream key.
    pub tc_url: String,
}

impl RtmpUrl {
    /// Parses an RTMP URL.
    pub fn parse(input: &str) -> Result<Self, UrlError> {
        let url = url::Url::parse(input)?;

        let scheme = RtmpScheme::parse(url.scheme()).ok_or_else(|| UrlError::UnsupportedScheme(url.scheme().to_string()))?;

        let host = url.host_str().ok_or(UrlError::MissingHost)?.to_string();
        let port = url.port().unwrap_or_else(|| scheme.default_port());

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        // at least an app and a stream key
        if segments.len() < 2 {
            return Err(UrlError::MissingPath(url.path().to_string()));
        }

        let app = segments[..segments.len() - 1].join("/");

        let mut stream_key = segments[segments.len() - 1].to_string();
        if let Some(query) = url.query() {
            stream_key.push('?');
            stream_key.push_str(query);
        }

        let tc_url = if port == scheme.default_port() {
            format!("{scheme}://{host}/{app}")
        } else {
            format!("{scheme}://{host}:{port}/{app}")
        };

        Ok(Self {
            scheme,
            host,
            port,
            app,
            stream_key,
            tc_url,
        })
    }

    /// The `host:port` pair for the socket connect.
    pub fn socket_addr(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}
