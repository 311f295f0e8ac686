use std::fmt;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use sluice_wire::{HeaderValue, Headers};

use crate::abort::AbortSignal;
use crate::data::response::Opaque;
use crate::effects::BoxStream;
use crate::error::BoxError;

/// Stream type accepted as a request body.
pub type BodyStream = BoxStream<'static, Result<Bytes, BoxError>>;

/// Request payload, decided once when the request is built.
pub enum RequestBody {
    Empty,
    /// In-memory payload. Sent with a `content-length` unless the request
    /// already declares one.
    Bytes(Bytes),
    /// Produced on demand. Sent with chunked transfer coding unless the
    /// request declares a `content-length`, which the stream must then match.
    Stream(BodyStream),
}

impl RequestBody {
    /// Wrap any fallible byte stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures_util::stream;
    /// use sluice::RequestBody;
    ///
    /// let chunks = stream::iter(vec![Ok::<_, std::io::Error>("a"), Ok("b")]);
    /// let body = RequestBody::stream(chunks);
    /// assert!(!body.is_empty());
    /// ```
    pub fn stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes> + 'static,
        E: Into<BoxError> + 'static,
    {
        let stream = stream.map_ok(Into::<Bytes>::into).map_err(Into::<BoxError>::into);
        RequestBody::Stream(stream.boxed())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Bytes(bytes) => bytes.is_empty(),
            RequestBody::Stream(_) => false,
        }
    }
}

impl Default for RequestBody {
    fn default() -> Self { RequestBody::Empty }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self { RequestBody::Bytes(bytes) }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self { RequestBody::Bytes(bytes.into()) }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self { RequestBody::Bytes(text.into()) }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self { RequestBody::Bytes(Bytes::from_static(text.as_bytes())) }
}

impl From<&'static [u8]> for RequestBody {
    fn from(bytes: &'static [u8]) -> Self { RequestBody::Bytes(Bytes::from_static(bytes)) }
}

/// One request to dispatch.
///
/// # Examples
///
/// ```
/// use sluice::RequestOptions;
///
/// let request = RequestOptions::post("/items")
///     .header("content-type", "application/json")
///     .body(r#"{"name":"widget"}"#);
/// assert_eq!(request.method, "POST");
/// ```
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub method:          String,
    /// Origin-form path (`/a?b`), `*`, or an absolute URL.
    pub path:            String,
    pub headers:         Headers,
    pub body:            RequestBody,
    pub signal:          Option<AbortSignal>,
    /// Response body high-water mark. Falls back to
    /// [`ClientOptions::body_high_water_mark`](crate::ClientOptions::body_high_water_mark).
    pub high_water_mark: Option<usize>,
    /// Correlation token handed back on the response.
    pub opaque:          Option<Opaque>,
}

impl RequestOptions {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into(), path: path.into(), ..Default::default() }
    }

    pub fn get(path: impl Into<String>) -> Self { Self::new("GET", path) }

    pub fn head(path: impl Into<String>) -> Self { Self::new("HEAD", path) }

    pub fn post(path: impl Into<String>) -> Self { Self::new("POST", path) }

    pub fn put(path: impl Into<String>) -> Self { Self::new("PUT", path) }

    pub fn delete(path: impl Into<String>) -> Self { Self::new("DELETE", path) }

    /// Set a header, replacing any previous value for the name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    #[must_use]
    pub fn high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = Some(bytes);
        self
    }

    #[must_use]
    pub fn opaque(mut self, opaque: Opaque) -> Self {
        self.opaque = Some(opaque);
        self
    }
}
