use std::io;

use bytes::{Buf, Bytes};
use sluice_wire::{BodyFraming, Headers, encode_chunk, encode_chunked_end, encode_head};
use tracing::{debug, warn};

use super::demux::InFlight;
use super::{Engine, Pending};
use crate::data::{BodyStream, RequestBody};
use crate::effects::socket::Written;
use crate::error::{BoxError, Error};

/// A streamed request body being copied onto the socket.
///
/// Only one exists at a time; the next request is not framed until the
/// stream ends.
pub(crate) struct WriteJob {
    pub(super) id:     u64,
    pub(super) stream: BodyStream,
    chunked:           bool,
    /// Declared `content-length` the stream must produce exactly.
    expected:          Option<u64>,
    written:           u64,
}

/// Parse a declared `content-length`, if any.
pub(crate) fn declared_length(headers: &Headers) -> Result<Option<u64>, Error> {
    match headers.get_str("content-length") {
        None => Ok(None),
        Some(value) => value.trim().parse::<u64>().map(Some).map_err(|_| {
            Error::InvalidArgument(format!("invalid content-length header: {value:?}"))
        }),
    }
}

impl Engine {
    /// Frame `pending` into the outbound buffer and track it as in flight.
    pub(super) fn write_request(&mut self, pending: Pending) {
        let Pending { id, head, body, signal, high_water_mark, opaque, callback, guard } = pending;
        debug!(id, method = head.method(), path = head.path(), "sending request");

        match body {
            RequestBody::Empty => {
                encode_head(&mut self.write_buf, &head, &self.host_header, BodyFraming::None);
                self.framed = true;
            }
            RequestBody::Bytes(bytes) => {
                let framing = BodyFraming::for_bytes(head.headers(), bytes.len());
                encode_head(&mut self.write_buf, &head, &self.host_header, framing);
                self.write_buf.extend_from_slice(&bytes);
                self.framed = true;
            }
            RequestBody::Stream(stream) => {
                let framing = BodyFraming::for_stream(head.headers());
                encode_head(&mut self.write_buf, &head, &self.host_header, framing);
                self.job = Some(WriteJob {
                    id,
                    stream,
                    chunked: framing.is_chunked(),
                    // validated at dispatch
                    expected: declared_length(head.headers()).ok().flatten(),
                    written: 0,
                });
            }
        }

        self.demux.inflight.push_back(InFlight {
            id,
            is_head: head.is_head(),
            callback: Some(callback),
            signal,
            high_water_mark,
            opaque,
            guard,
        });
        self.touch_idle();
    }

    /// Next item from the streaming body, `None` once it ended.
    pub(super) fn on_body_chunk(&mut self, chunk: Option<Result<Bytes, BoxError>>) {
        let Some(job) = self.job.as_mut() else {
            return;
        };

        match chunk {
            Some(Ok(chunk)) => {
                job.written += chunk.len() as u64;
                if let Some(expected) = job.expected
                    && job.written > expected
                {
                    let actual = job.written;
                    self.body_error(Error::ContentLengthMismatch { expected, actual });
                    return;
                }
                if job.chunked {
                    encode_chunk(&mut self.write_buf, &chunk);
                } else {
                    self.write_buf.extend_from_slice(&chunk);
                }
            }
            Some(Err(e)) => self.body_error(Error::request_body(e)),
            None => {
                if let Some(expected) = job.expected
                    && job.written != expected
                {
                    let actual = job.written;
                    self.body_error(Error::ContentLengthMismatch { expected, actual });
                    return;
                }
                if job.chunked {
                    encode_chunked_end(&mut self.write_buf);
                }
                self.job = None;
                self.framed = true;
                self.admit_next();
                self.check_drain();
            }
        }
    }

    /// The streaming body failed: fail its request and drop the connection.
    pub(super) fn body_error(&mut self, err: Error) {
        let Some(job) = self.job.take() else {
            return;
        };
        warn!(id = job.id, error = %err, "request body failed");
        if let Some(entry) = self.demux.find_inflight(job.id) {
            entry.fail(err.clone());
        }
        self.teardown(Some(err));
    }

    pub(super) fn on_written(&mut self, res: io::Result<Written>) {
        match res {
            Ok(Written::Bytes(n)) => {
                self.write_buf.advance(n);
                self.socket.needs_flush = true;
                self.touch_idle();
                self.admit_next();
                self.check_drain();
            }
            Ok(Written::Flushed) => self.socket.needs_flush = false,
            Err(e) => self.teardown(Some(e.into())),
        }
    }
}
