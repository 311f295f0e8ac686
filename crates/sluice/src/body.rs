//! Backpressure-aware response bodies.
//!
//! The engine pushes chunks through a [`BodySender`]; the application pulls
//! them from the paired [`Body`] stream. The two share a small buffer behind a
//! mutex. Once the buffer reaches its high-water mark the engine stops
//! reading the socket until the consumer signals demand again.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::Notify;

use crate::abort::AbortSignal;
use crate::error::{Error, Result};

/// Default cap for [`Body::dump`].
pub const DEFAULT_DUMP_LIMIT: usize = 128 * 1024;

enum Status {
    Open,
    Ended,
    /// An error waiting to be yielded to the consumer.
    Errored(Error),
    /// Terminal: the stream yields nothing more.
    Closed,
}

struct BodyState {
    chunks:          VecDeque<Bytes>,
    buffered:        usize,
    high_water_mark: usize,
    status:          Status,
    destroyed:       bool,
    waker:           Option<Waker>,
}

impl BodyState {
    fn below_high_water(&self) -> bool {
        self.buffered == 0 || self.buffered < self.high_water_mark
    }

    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }

    fn discard(&mut self) {
        self.chunks.clear();
        self.buffered = 0;
    }
}

struct BodyShared {
    state:  Mutex<BodyState>,
    demand: Notify,
}

impl BodyShared {
    fn lock(&self) -> MutexGuard<'_, BodyState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Outcome of [`BodySender::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Push {
    /// Buffered. `backpressure` is set once the high-water mark is reached.
    Accepted { backpressure: bool },
    /// The consumer destroyed the stream; the chunk was dropped.
    Destroyed,
}

/// Engine side of a response body.
pub(crate) struct BodySender {
    shared: Arc<BodyShared>,
}

impl BodySender {
    pub(crate) fn push(&self, chunk: Bytes) -> Push {
        let mut state = self.shared.lock();
        if state.destroyed || !matches!(state.status, Status::Open) {
            return Push::Destroyed;
        }
        if !chunk.is_empty() {
            state.buffered += chunk.len();
            state.chunks.push_back(chunk);
            state.wake();
        }
        Push::Accepted { backpressure: state.buffered >= state.high_water_mark }
    }

    /// Mark the end of the body. Buffered chunks remain readable.
    pub(crate) fn finish(&self) {
        let mut state = self.shared.lock();
        if matches!(state.status, Status::Open) {
            state.status = Status::Ended;
            state.wake();
        }
    }

    /// Fail the stream, discarding anything not yet read.
    pub(crate) fn fail(&self, err: Error) {
        let mut state = self.shared.lock();
        if matches!(state.status, Status::Open | Status::Ended) {
            state.discard();
            state.status = Status::Errored(err);
            state.destroyed = true;
            state.wake();
        }
    }

    pub(crate) fn is_destroyed(&self) -> bool { self.shared.lock().destroyed }

    /// Whether socket reads may proceed for this body.
    pub(crate) fn wants_more(&self) -> bool {
        let state = self.shared.lock();
        state.destroyed || state.below_high_water()
    }

    /// Resolves after the consumer pulled or destroyed the stream.
    pub(crate) async fn demand(&self) { self.shared.demand.notified().await }
}

/// A response body: a finite, pull-based stream of byte chunks.
///
/// Dropping a `Body` before its end destroys it: buffered bytes are
/// discarded and the engine skips the remainder of the response.
///
/// # Examples
///
/// ```no_run
/// # async fn run(client: sluice::Client) -> sluice::Result<()> {
/// use futures_util::StreamExt;
/// use sluice::RequestOptions;
///
/// let response = client.request(RequestOptions::get("/large")).await?;
/// let mut body = response.body.expect("GET responses carry a body");
/// while let Some(chunk) = body.next().await {
///     let chunk = chunk?;
///     println!("{} bytes", chunk.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Body {
    shared:         Arc<BodyShared>,
    signal:         Option<AbortSignal>,
    content_length: Option<u64>,
}

impl Body {
    pub(crate) fn channel(
        high_water_mark: usize,
        content_length: Option<u64>,
        signal: Option<AbortSignal>,
    ) -> (BodySender, Body) {
        let shared = Arc::new(BodyShared {
            state:  Mutex::new(BodyState {
                chunks: VecDeque::new(),
                buffered: 0,
                high_water_mark,
                status: Status::Open,
                destroyed: false,
                waker: None,
            }),
            demand: Notify::new(),
        });
        let sender = BodySender { shared: shared.clone() };
        (sender, Body { shared, signal, content_length })
    }

    /// Length declared by the response's `content-length` header.
    pub fn content_length(&self) -> Option<u64> { self.content_length }

    pub fn is_destroyed(&self) -> bool { self.shared.lock().destroyed }

    /// Discard the body.
    ///
    /// Buffered data is dropped, the next pull yields [`Error::Aborted`] and
    /// the engine resumes reading, discarding the rest of the response.
    pub fn destroy(&mut self) { self.destroy_with(Error::aborted(None)); }

    fn destroy_with(&mut self, err: Error) {
        {
            let mut state = self.shared.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.discard();
            if !matches!(state.status, Status::Closed) {
                state.status = Status::Errored(err);
            }
        }
        self.shared.demand.notify_one();
    }

    /// Collect the whole body.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Collect the body as UTF-8, replacing invalid sequences.
    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Collect the body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read and discard the body so the connection can be reused.
    ///
    /// The stream is destroyed early when the declared length or the bytes
    /// seen so far exceed `opts.limit`.
    pub async fn dump(mut self, opts: DumpOptions) -> Result<()> {
        if self.content_length.is_some_and(|len| len > opts.limit as u64) {
            self.destroy();
            return Ok(());
        }

        let mut total = 0usize;
        loop {
            let next = match &opts.signal {
                Some(signal) => {
                    tokio::select! {
                        biased;
                        reason = signal.aborted() => Err(reason),
                        next = self.next() => Ok(next),
                    }
                }
                None => Ok(self.next().await),
            };

            match next {
                Err(reason) => {
                    self.destroy();
                    return Err(Error::aborted(reason));
                }
                Ok(None) => return Ok(()),
                Ok(Some(chunk)) => {
                    total += chunk?.len();
                    if total > opts.limit {
                        self.destroy();
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl Stream for Body {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let aborted = match &self.signal {
            Some(signal) if signal.is_aborted() => Some(signal.reason()),
            _ => None,
        };
        if let Some(reason) = aborted {
            self.signal = None;
            self.destroy_with(Error::aborted(reason));
        }

        let mut state = self.shared.lock();
        if let Some(chunk) = state.chunks.pop_front() {
            state.buffered -= chunk.len();
            let demand = state.below_high_water();
            drop(state);
            if demand {
                self.shared.demand.notify_one();
            }
            return Poll::Ready(Some(Ok(chunk)));
        }

        match std::mem::replace(&mut state.status, Status::Closed) {
            Status::Open => {
                state.status = Status::Open;
                state.waker = Some(cx.waker().clone());
                drop(state);
                self.shared.demand.notify_one();
                Poll::Pending
            }
            Status::Errored(err) => Poll::Ready(Some(Err(err))),
            Status::Ended | Status::Closed => Poll::Ready(None),
        }
    }
}

impl Drop for Body {
    fn drop(&mut self) {
        let open = matches!(self.shared.lock().status, Status::Open);
        if open {
            self.destroy();
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("content_length", &self.content_length)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Options for [`Body::dump`].
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Bytes to read before giving up and destroying the stream.
    ///
    /// Default: 128 KiB
    pub limit:  usize,
    pub signal: Option<AbortSignal>,
}

impl Default for DumpOptions {
    fn default() -> Self { Self { limit: DEFAULT_DUMP_LIMIT, signal: None } }
}

impl DumpOptions {
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}
