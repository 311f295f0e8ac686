use bytes::{BufMut, BytesMut};

use crate::data::{Headers, RequestHead};

/// How the body section of a request is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body. The head ends with the blank line.
    None,
    /// Length known up front and absent from the caller's headers, so a
    /// `content-length` is synthesized.
    AutoLength(u64),
    /// The caller supplied `content-length` and it is trusted as is.
    Declared,
    /// Streamed body of unknown length, sent with chunked transfer coding.
    Chunked,
}

impl BodyFraming {
    /// Framing for an in-memory body of `len` bytes.
    pub fn for_bytes(headers: &Headers, len: usize) -> Self {
        if headers.contains("content-length") {
            BodyFraming::Declared
        } else {
            BodyFraming::AutoLength(len as u64)
        }
    }

    /// Framing for a streamed body.
    pub fn for_stream(headers: &Headers) -> Self {
        if headers.contains("content-length") {
            BodyFraming::Declared
        } else {
            BodyFraming::Chunked
        }
    }

    pub fn is_chunked(&self) -> bool { matches!(self, BodyFraming::Chunked) }
}

/// Serialize the request line, headers and the blank line that ends the head.
///
/// A `Host` header is synthesized from `host` unless the request carries one.
/// List-valued headers produce one line per value.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use sluice_wire::{BodyFraming, Headers, RequestHead, encode_head};
///
/// let head = RequestHead::new("POST", "/submit", Headers::new()).unwrap();
/// let mut buf = BytesMut::new();
/// encode_head(&mut buf, &head, "localhost:3000", BodyFraming::AutoLength(5));
///
/// assert_eq!(
///     &buf[..],
///     b"POST /submit HTTP/1.1\r\nConnection: keep-alive\r\nHost: localhost:3000\r\n\
///       content-length: 5\r\n\r\n"
/// );
/// ```
pub fn encode_head(dst: &mut BytesMut, head: &RequestHead, host: &str, framing: BodyFraming) {
    dst.reserve(128 + head.path().len());

    dst.put_slice(head.method().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(head.path().as_bytes());
    dst.put_slice(b" HTTP/1.1\r\nConnection: keep-alive\r\n");

    let headers = head.headers();
    if !headers.contains("host") {
        dst.put_slice(b"Host: ");
        dst.put_slice(host.as_bytes());
        dst.put_slice(b"\r\n");
    }

    for (name, value) in headers.iter() {
        for v in value.iter() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(v.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }

    match framing {
        BodyFraming::None | BodyFraming::Declared => {}
        BodyFraming::AutoLength(len) => {
            dst.put_slice(b"content-length: ");
            dst.put_slice(len.to_string().as_bytes());
            dst.put_slice(b"\r\n");
        }
        BodyFraming::Chunked => {
            if !declares_chunked(headers) {
                dst.put_slice(b"transfer-encoding: chunked\r\n");
            }
        }
    }

    dst.put_slice(b"\r\n");
}

fn declares_chunked(headers: &Headers) -> bool {
    headers.get("transfer-encoding").is_some_and(|value| {
        value
            .iter()
            .any(|v| v.split(',').any(|coding| coding.trim().eq_ignore_ascii_case("chunked")))
    })
}

/// Append one chunk in chunked transfer coding.
///
/// Empty chunks are skipped: a zero-length chunk is the body terminator.
pub fn encode_chunk(dst: &mut BytesMut, chunk: &[u8]) {
    if chunk.is_empty() {
        return;
    }
    dst.reserve(chunk.len() + 20);
    dst.put_slice(format!("{:x}", chunk.len()).as_bytes());
    dst.put_slice(b"\r\n");
    dst.put_slice(chunk);
    dst.put_slice(b"\r\n");
}

/// Append the zero-length chunk and the empty trailer section.
pub fn encode_chunked_end(dst: &mut BytesMut) { dst.put_slice(b"0\r\n\r\n"); }
