//! Error types for sluice-wire.

use thiserror::Error;

/// Reasons an origin URL is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    #[error("invalid url: {0}")]
    Malformed(String),

    #[error("invalid url: unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("invalid url: missing host")]
    MissingHost,

    #[error("invalid url: origin must not carry a path, query or fragment")]
    NotAnOrigin,

    #[error("invalid url: origin must not carry credentials")]
    Credentials,
}

/// Reasons a request head is rejected before anything reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("invalid method")]
    InvalidMethod,

    #[error("invalid method: CONNECT is not supported")]
    Connect,

    #[error("path must be an absolute URL or start with a slash")]
    RelativePath,

    #[error("invalid request path")]
    InvalidPath,
}

/// Failures of the incremental response parser.
///
/// Every variant is fatal for the connection that produced the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed response head: {0}")]
    Head(String),

    #[error("response head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("response carries more than {limit} headers")]
    TooManyHeaders { limit: usize },

    #[error("invalid content-length")]
    InvalidContentLength,

    #[error("invalid chunk size")]
    InvalidChunkSize,

    #[error("missing CRLF after chunk data")]
    ChunkTerminator,

    #[error("malformed trailers: {0}")]
    Trailers(String),

    #[error("protocol upgrades are not supported")]
    Upgrade,

    #[error("connection closed before the response was complete")]
    Incomplete,
}
