use bytes::{Buf, Bytes, BytesMut};

use crate::data::Headers;
use crate::error::ParseError;

/// Size limits applied while parsing response heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Largest accepted status line plus header section, in bytes.
    pub max_head_size: usize,
    /// Largest accepted number of header lines.
    pub max_headers:   usize,
}

impl Default for ParserLimits {
    fn default() -> Self { Self { max_head_size: 16 * 1024, max_headers: 100 } }
}

/// Status line and headers of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status:         u16,
    pub reason:         String,
    /// Minor HTTP version: `1` for HTTP/1.1, `0` for HTTP/1.0.
    pub version:        u8,
    /// Header names are lowercased; repeated names are folded into lists.
    pub headers:        Headers,
    /// Whether the connection may carry another request after this response,
    /// judged from the HTTP version and the `Connection` header.
    pub keep_alive:     bool,
    /// Declared body length when the body is length-delimited.
    pub content_length: Option<u64>,
    /// The framing headers leave the body delimited by connection close.
    /// Ignored when the handler skips the body.
    pub until_close:    bool,
}

/// Receiver of parser events.
///
/// Events for one response always arrive in the order
/// `on_headers_complete`, zero or more `on_body`, `on_message_complete`.
/// Interim 1xx responses are reported through `on_informational` and never
/// produce the other events.
pub trait ResponseHandler {
    fn on_informational(&mut self, _head: &ResponseHead) {}

    /// Returns `true` when the response carries no body regardless of its
    /// headers, as for a reply to `HEAD`.
    fn on_headers_complete(&mut self, head: ResponseHead) -> bool;

    fn on_body(&mut self, chunk: Bytes);

    /// `trailers` is empty unless a chunked body ended with a trailer section.
    fn on_message_complete(&mut self, trailers: Headers);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Length(u64),
    UntilClose,
    ChunkSize,
    ChunkData(u64),
    ChunkEnd,
    Trailers,
}

enum Framing {
    Empty,
    Length(u64),
    Chunked,
    UntilClose,
}

/// Incremental HTTP/1.1 response parser.
///
/// Bytes may be fed in arbitrary pieces; a single call to
/// [`ResponseParser::execute`] can complete several pipelined responses.
/// Any error is fatal: the connection that produced the bytes must be
/// discarded and the parser [reset](ResponseParser::reset).
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use sluice_wire::{Headers, ResponseHandler, ResponseHead, ResponseParser};
///
/// #[derive(Default)]
/// struct Collect {
///     status: u16,
///     body:   Vec<u8>,
///     done:   bool,
/// }
///
/// impl ResponseHandler for Collect {
///     fn on_headers_complete(&mut self, head: ResponseHead) -> bool {
///         self.status = head.status;
///         false
///     }
///
///     fn on_body(&mut self, chunk: Bytes) { self.body.extend_from_slice(&chunk); }
///
///     fn on_message_complete(&mut self, _trailers: Headers) { self.done = true; }
/// }
///
/// let mut parser = ResponseParser::default();
/// let mut collect = Collect::default();
/// parser
///     .execute(b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\nhel", &mut collect)
///     .unwrap();
/// parser.execute(b"lo", &mut collect).unwrap();
///
/// assert_eq!(collect.status, 200);
/// assert_eq!(collect.body, b"hello");
/// assert!(collect.done);
/// ```
#[derive(Debug)]
pub struct ResponseParser {
    limits: ParserLimits,
    state:  State,
    buf:    BytesMut,
}

impl Default for ResponseParser {
    fn default() -> Self { Self::new(ParserLimits::default()) }
}

impl ResponseParser {
    pub fn new(limits: ParserLimits) -> Self {
        Self { limits, state: State::Head, buf: BytesMut::new() }
    }

    /// Discard all state, ready for a fresh connection.
    pub fn reset(&mut self) {
        self.state = State::Head;
        self.buf.clear();
    }

    /// Whether the parser sits between messages with nothing buffered.
    pub fn is_idle(&self) -> bool { self.state == State::Head && self.buf.is_empty() }

    /// Feed inbound bytes, emitting events to `handler`.
    pub fn execute<H: ResponseHandler>(
        &mut self,
        data: &[u8],
        handler: &mut H,
    ) -> Result<(), ParseError> {
        self.buf.extend_from_slice(data);
        while self.step(handler)? {}
        Ok(())
    }

    /// Signal end of input.
    ///
    /// A body delimited by connection close completes cleanly. Anything else
    /// left mid-message is [`ParseError::Incomplete`].
    pub fn finish<H: ResponseHandler>(&mut self, handler: &mut H) -> Result<(), ParseError> {
        match self.state {
            State::UntilClose => {
                self.state = State::Head;
                handler.on_message_complete(Headers::new());
                Ok(())
            }
            State::Head if self.buf.is_empty() => Ok(()),
            _ => Err(ParseError::Incomplete),
        }
    }

    /// Advance by one unit of work. Returns `false` when more input is needed.
    fn step<H: ResponseHandler>(&mut self, handler: &mut H) -> Result<bool, ParseError> {
        match self.state {
            State::Head => self.parse_head(handler),
            State::Length(remaining) => {
                if self.emit_body(remaining, handler) == 0 {
                    return Ok(false);
                }
                Ok(true)
            }
            State::UntilClose => {
                if self.buf.is_empty() {
                    return Ok(false);
                }
                let chunk = self.buf.split().freeze();
                handler.on_body(chunk);
                Ok(false)
            }
            State::ChunkSize => match httparse::parse_chunk_size(&self.buf) {
                Ok(httparse::Status::Complete((consumed, size))) => {
                    self.buf.advance(consumed);
                    self.state = if size == 0 { State::Trailers } else { State::ChunkData(size) };
                    Ok(true)
                }
                Ok(httparse::Status::Partial) => {
                    if self.buf.len() > self.limits.max_head_size {
                        return Err(ParseError::InvalidChunkSize);
                    }
                    Ok(false)
                }
                Err(_) => Err(ParseError::InvalidChunkSize),
            },
            State::ChunkData(remaining) => Ok(self.emit_body(remaining, handler) > 0),
            State::ChunkEnd => {
                if self.buf.len() < 2 {
                    return Ok(false);
                }
                if &self.buf[..2] != b"\r\n" {
                    return Err(ParseError::ChunkTerminator);
                }
                self.buf.advance(2);
                self.state = State::ChunkSize;
                Ok(true)
            }
            State::Trailers => self.parse_trailers(handler),
        }
    }

    /// Hand up to `remaining` buffered body bytes to the handler.
    fn emit_body<H: ResponseHandler>(&mut self, remaining: u64, handler: &mut H) -> usize {
        let take = (self.buf.len() as u64).min(remaining) as usize;
        if take == 0 {
            return 0;
        }
        let chunk = self.buf.split_to(take).freeze();
        handler.on_body(chunk);

        let left = remaining - take as u64;
        match self.state {
            State::Length(_) if left == 0 => self.complete(Headers::new(), handler),
            State::Length(_) => self.state = State::Length(left),
            _ if left == 0 => self.state = State::ChunkEnd,
            _ => self.state = State::ChunkData(left),
        }
        take
    }

    fn complete<H: ResponseHandler>(&mut self, trailers: Headers, handler: &mut H) {
        self.state = State::Head;
        handler.on_message_complete(trailers);
    }

    fn parse_head<H: ResponseHandler>(&mut self, handler: &mut H) -> Result<bool, ParseError> {
        if self.buf.is_empty() {
            return Ok(false);
        }

        let (consumed, head) = {
            let mut raw = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
            let mut response = httparse::Response::new(&mut raw);
            let consumed = match response.parse(&self.buf) {
                Ok(httparse::Status::Complete(consumed)) => consumed,
                Ok(httparse::Status::Partial) => {
                    if self.buf.len() > self.limits.max_head_size {
                        return Err(ParseError::HeadTooLarge { limit: self.limits.max_head_size });
                    }
                    return Ok(false);
                }
                Err(httparse::Error::TooManyHeaders) => {
                    return Err(ParseError::TooManyHeaders { limit: self.limits.max_headers });
                }
                Err(e) => return Err(ParseError::Head(e.to_string())),
            };
            if consumed > self.limits.max_head_size {
                return Err(ParseError::HeadTooLarge { limit: self.limits.max_head_size });
            }

            let status = response
                .code
                .ok_or_else(|| ParseError::Head("missing status code".to_string()))?;
            let headers: Headers = response
                .headers
                .iter()
                .map(|h| (h.name.to_ascii_lowercase(), String::from_utf8_lossy(h.value).into_owned()))
                .collect();
            let version = response.version.unwrap_or(1);

            let head = ResponseHead {
                status,
                reason: response.reason.unwrap_or_default().to_string(),
                version,
                keep_alive: keep_alive(version, &headers),
                headers,
                content_length: None,
                until_close: false,
            };
            (consumed, head)
        };
        self.buf.advance(consumed);

        match head.status {
            101 => return Err(ParseError::Upgrade),
            100..=199 => {
                handler.on_informational(&head);
                return Ok(true);
            }
            _ => {}
        }

        let mut head = head;
        let framing = if matches!(head.status, 204 | 304) {
            Framing::Empty
        } else {
            body_framing(&head.headers)?
        };
        match framing {
            Framing::Length(len) => head.content_length = Some(len),
            Framing::UntilClose => head.until_close = true,
            Framing::Empty | Framing::Chunked => {}
        }

        let skip_body = handler.on_headers_complete(head);
        match framing {
            _ if skip_body => self.complete(Headers::new(), handler),
            Framing::Empty | Framing::Length(0) => self.complete(Headers::new(), handler),
            Framing::Length(len) => self.state = State::Length(len),
            Framing::Chunked => self.state = State::ChunkSize,
            Framing::UntilClose => self.state = State::UntilClose,
        }
        Ok(true)
    }

    fn parse_trailers<H: ResponseHandler>(&mut self, handler: &mut H) -> Result<bool, ParseError> {
        if self.buf.len() < 2 {
            return Ok(false);
        }
        if &self.buf[..2] == b"\r\n" {
            self.buf.advance(2);
            self.complete(Headers::new(), handler);
            return Ok(true);
        }

        let (consumed, trailers) = {
            let mut raw = vec![httparse::EMPTY_HEADER; self.limits.max_headers];
            match httparse::parse_headers(&self.buf, &mut raw) {
                Ok(httparse::Status::Complete((consumed, parsed))) => {
                    let trailers: Headers = parsed
                        .iter()
                        .map(|h| {
                            (h.name.to_ascii_lowercase(), String::from_utf8_lossy(h.value).into_owned())
                        })
                        .collect();
                    (consumed, trailers)
                }
                Ok(httparse::Status::Partial) => {
                    if self.buf.len() > self.limits.max_head_size {
                        return Err(ParseError::HeadTooLarge { limit: self.limits.max_head_size });
                    }
                    return Ok(false);
                }
                Err(e) => return Err(ParseError::Trailers(e.to_string())),
            }
        };
        self.buf.advance(consumed);
        self.complete(trailers, handler);
        Ok(true)
    }
}

fn tokens(headers: &Headers, name: &str) -> impl Iterator<Item = String> {
    headers
        .get(name)
        .into_iter()
        .flat_map(|value| value.iter())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .into_iter()
}

fn keep_alive(version: u8, headers: &Headers) -> bool {
    let mut connection = tokens(headers, "connection");
    if version == 0 {
        connection.any(|token| token == "keep-alive")
    } else {
        !connection.any(|token| token == "close")
    }
}

fn body_framing(headers: &Headers) -> Result<Framing, ParseError> {
    if headers.contains("transfer-encoding") {
        let last = tokens(headers, "transfer-encoding").last();
        return Ok(match last.as_deref() {
            Some("chunked") => Framing::Chunked,
            _ => Framing::UntilClose,
        });
    }

    let Some(value) = headers.get("content-length") else {
        return Ok(Framing::UntilClose);
    };
    let mut declared: Option<u64> = None;
    for raw in value.iter().flat_map(|v| v.split(',')) {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidContentLength);
        }
        let len: u64 = raw.parse().map_err(|_| ParseError::InvalidContentLength)?;
        match declared {
            Some(existing) if existing != len => return Err(ParseError::InvalidContentLength),
            _ => declared = Some(len),
        }
    }
    declared.map(Framing::Length).ok_or(ParseError::InvalidContentLength)
}
