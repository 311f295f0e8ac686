use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use sluice_wire::{Headers, ResponseHandler, ResponseHead};
use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::{Callback, ClientState};
use crate::abort::AbortSignal;
use crate::body::{Body, BodySender, Push};
use crate::data::{Opaque, Response, Trailers};
use crate::error::Error;

/// A request whose bytes were handed to the socket, awaiting its response.
pub(crate) struct InFlight {
    pub(crate) id:              u64,
    pub(crate) is_head:         bool,
    /// Taken when the request is answered early, e.g. by an abort. The entry
    /// itself stays until its response arrives so correlation is preserved.
    pub(crate) callback:        Option<Callback>,
    pub(crate) signal:          Option<AbortSignal>,
    pub(crate) high_water_mark: Option<usize>,
    pub(crate) opaque:          Option<Opaque>,
    pub(crate) guard:           Option<oneshot::Sender<()>>,
}

impl InFlight {
    pub(crate) fn fail(&mut self, err: Error) {
        if let Some(callback) = self.callback.take() {
            callback(Err(err));
        }
    }
}

/// The response whose body is currently arriving.
pub(crate) struct ActiveResponse {
    pub(crate) id:   u64,
    pub(crate) body: Option<BodySender>,
    trailers:        Trailers,
    keep_alive:      bool,
    discarded:       usize,
    _guard:          Option<oneshot::Sender<()>>,
}

/// Parser-event side of the engine.
///
/// Events are applied to the FIFO in-flight list; conditions the engine must
/// act on once the parser returns are left in the public flags.
pub(crate) struct Demux {
    state:               Arc<ClientState>,
    default_hwm:         usize,
    max_discard:         usize,
    pub(crate) inflight: VecDeque<InFlight>,
    pub(crate) active:   Option<ActiveResponse>,
    /// Socket reads are suspended until the active body signals demand.
    pub(crate) paused:   bool,
    /// Connection-fatal condition raised by a callback.
    pub(crate) fault:    Option<Error>,
    /// A response said the connection must not carry further requests.
    pub(crate) retire:   bool,
    /// An in-flight slot or the active body was released.
    pub(crate) progress: bool,
}

impl Demux {
    pub(crate) fn new(state: Arc<ClientState>, default_hwm: usize, max_discard: usize) -> Self {
        Self {
            state,
            default_hwm,
            max_discard,
            inflight: VecDeque::new(),
            active: None,
            paused: false,
            fault: None,
            retire: false,
            progress: false,
        }
    }

    pub(crate) fn active_body(&self) -> Option<&BodySender> {
        self.active.as_ref().and_then(|active| active.body.as_ref())
    }

    /// Whether a body is still streaming to a consumer that wants it.
    pub(crate) fn has_open_body(&self) -> bool {
        self.active_body().is_some_and(|body| !body.is_destroyed())
    }

    pub(crate) fn is_idle(&self) -> bool { self.inflight.is_empty() && self.active.is_none() }

    pub(crate) fn find_inflight(&mut self, id: u64) -> Option<&mut InFlight> {
        self.inflight.iter_mut().find(|entry| entry.id == id)
    }

    /// Forget per-connection state after the socket is gone.
    pub(crate) fn reset(&mut self) {
        self.active = None;
        self.paused = false;
        self.fault = None;
        self.retire = false;
    }
}

impl ResponseHandler for Demux {
    fn on_informational(&mut self, head: &ResponseHead) {
        trace!(status = head.status, "informational response ignored");
    }

    fn on_headers_complete(&mut self, head: ResponseHead) -> bool {
        if self.fault.is_some() {
            return true;
        }
        let Some(mut entry) = self.inflight.pop_front() else {
            self.fault = Some(Error::Informational(format!(
                "unexpected {} response with no request in flight",
                head.status
            )));
            return true;
        };
        self.state.release();
        self.progress = true;

        let skip_body = entry.is_head;
        // a close-delimited body owns the rest of the connection
        let keep_alive = head.keep_alive && (skip_body || !head.until_close);
        if !keep_alive {
            self.retire = true;
        }
        let hwm = entry.high_water_mark.unwrap_or(self.default_hwm);
        let trailers = Trailers::default();

        let (sender, body) = if skip_body {
            (None, None)
        } else {
            let (sender, body) = Body::channel(hwm, head.content_length, entry.signal.clone());
            (Some(sender), Some(body))
        };

        match entry.callback.take() {
            Some(callback) => {
                debug!(id = entry.id, status = head.status, "received response");
                callback(Ok(Response {
                    status: head.status,
                    reason: head.reason,
                    headers: head.headers,
                    trailers: trailers.clone(),
                    body,
                    opaque: entry.opaque.take(),
                }));
            }
            // answered already; dropping the body marks it destroyed so its bytes are discarded
            None => drop(body),
        }

        self.active = Some(ActiveResponse {
            id: entry.id,
            body: sender,
            trailers,
            keep_alive,
            discarded: 0,
            _guard: entry.guard.take(),
        });
        skip_body
    }

    fn on_body(&mut self, chunk: Bytes) {
        if self.fault.is_some() {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let len = chunk.len();
        match active.body.as_ref().map(|body| body.push(chunk)) {
            Some(Push::Accepted { backpressure }) => {
                if backpressure {
                    self.paused = true;
                }
            }
            Some(Push::Destroyed) | None => {
                active.discarded += len;
                if active.discarded > self.max_discard {
                    self.fault = Some(Error::Informational(format!(
                        "discarded more than {} bytes of a destroyed response body",
                        self.max_discard
                    )));
                }
            }
        }
    }

    fn on_message_complete(&mut self, trailers: Headers) {
        if self.fault.is_some() {
            return;
        }
        let Some(active) = self.active.take() else {
            return;
        };

        if !trailers.is_empty() {
            trace!(id = active.id, count = trailers.len(), "trailers received");
        }
        active.trailers.set(trailers);
        if let Some(body) = &active.body {
            body.finish();
        }
        if !active.keep_alive {
            self.retire = true;
        }
        self.paused = false;
        self.progress = true;
    }
}
