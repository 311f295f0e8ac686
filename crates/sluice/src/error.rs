//! Error types for sluice.

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use sluice_wire::{OriginError, ParseError, RequestError};
use thiserror::Error;

/// Boxed error produced by a request body stream.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors surfaced by the client engine.
///
/// `Error` is `Clone`: one connection failure is delivered to every request
/// that was in flight on that connection.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    InvalidOrigin(#[from] OriginError),

    #[error("request aborted: {}", .reason.as_deref().unwrap_or("the operation was aborted"))]
    Aborted { reason: Option<String> },

    #[error("socket closed: {0}")]
    SocketClosed(String),

    #[error("idle timeout elapsed with requests outstanding")]
    Timeout,

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("response parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("i/o error: {0}")]
    Io(#[source] Arc<io::Error>),

    #[error("client is closed")]
    Closed,

    #[error("client is destroyed")]
    Destroyed,

    #[error("{0}")]
    Informational(String),

    #[error("request body error: {0}")]
    RequestBody(#[source] Arc<dyn StdError + Send + Sync>),

    #[error("request body length mismatch: declared {expected} bytes, produced {actual}")]
    ContentLengthMismatch { expected: u64, actual: u64 },

    #[error("invalid json body: {0}")]
    Json(#[source] Arc<serde_json::Error>),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected synchronously; nothing touched the socket.
    Argument,
    Aborted,
    /// The connection failed; every in-flight request shares the error.
    Connection,
    Closed,
    Destroyed,
    /// A diagnostic teardown, such as discarding too much of an unread body.
    Informational,
    /// The request body could not be produced or framed.
    Body,
    Config,
    Runtime,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) | Error::InvalidOrigin(_) => ErrorKind::Argument,
            Error::Aborted { .. } => ErrorKind::Aborted,
            Error::SocketClosed(_)
            | Error::Timeout
            | Error::ConnectTimeout
            | Error::Parse(_)
            | Error::Io(_) => ErrorKind::Connection,
            Error::Closed => ErrorKind::Closed,
            Error::Destroyed => ErrorKind::Destroyed,
            Error::Informational(_) => ErrorKind::Informational,
            Error::RequestBody(_) | Error::ContentLengthMismatch { .. } | Error::Json(_) => {
                ErrorKind::Body
            }
            Error::Config(_) => ErrorKind::Config,
            Error::NoRuntime => ErrorKind::Runtime,
        }
    }

    pub fn is_aborted(&self) -> bool { matches!(self, Error::Aborted { .. }) }

    pub(crate) fn aborted(reason: Option<String>) -> Self { Error::Aborted { reason } }

    pub(crate) fn other_side_closed() -> Self { Error::SocketClosed("other side closed".to_string()) }

    pub(crate) fn request_body(source: BoxError) -> Self { Error::RequestBody(Arc::from(source)) }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self { Error::Io(Arc::new(e)) }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self { Error::InvalidArgument(e.to_string()) }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self { Error::Json(Arc::new(e)) }
}

pub type Result<T> = std::result::Result<T, Error>;
