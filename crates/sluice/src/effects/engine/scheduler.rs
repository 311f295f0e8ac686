use std::sync::atomic::Ordering;

use tracing::{debug, trace};

use super::{Engine, Pending};
use crate::abort::AbortSignal;
use crate::data::ClientEvent;
use crate::error::Error;

impl Engine {
    pub(super) fn enqueue(&mut self, pending: Pending) {
        self.queue.push_back(pending);
        self.drained = false;
        self.admit_next();
        self.check_drain();
    }

    /// Move queued requests onto the socket while the pipeline has room.
    pub(super) fn admit_next(&mut self) {
        loop {
            if self.destroyed || self.job.is_some() {
                return;
            }
            let Some(head) = self.queue.front() else {
                return;
            };

            if head.signal.as_ref().is_some_and(AbortSignal::is_aborted) {
                if let Some(pending) = self.queue.pop_front() {
                    let reason = pending.signal.as_ref().and_then(AbortSignal::reason);
                    debug!(id = pending.id, "request aborted while queued");
                    self.state.release();
                    pending.fail(Error::aborted(reason));
                }
                continue;
            }

            if self.demux.inflight.len() >= self.state.pipelining() || self.demux.has_open_body() {
                return;
            }
            if !self.socket.is_reusable() {
                self.connect();
                return;
            }
            if self.write_buf.len() >= self.options.write_high_water_mark {
                return;
            }

            if let Some(pending) = self.queue.pop_front() {
                self.write_request(pending);
            }
        }
    }

    /// Cancel one request wherever it currently is.
    pub(super) fn abort(&mut self, id: u64, reason: Option<String>) {
        let err = Error::aborted(reason);

        if let Some(pos) = self.queue.iter().position(|pending| pending.id == id) {
            if let Some(pending) = self.queue.remove(pos) {
                debug!(id, "request aborted while queued");
                self.state.release();
                pending.fail(err);
            }
        } else if self.job.as_ref().is_some_and(|job| job.id == id) {
            // a partially written body cannot be resumed
            debug!(id, "request aborted while writing its body");
            self.body_error(err);
        } else if let Some(entry) = self.demux.find_inflight(id) {
            debug!(id, "request aborted while awaiting its response");
            entry.fail(err);
        } else if let Some(active) = self.demux.active.as_ref().filter(|active| active.id == id) {
            debug!(id, "request aborted while receiving its body");
            if let Some(body) = &active.body {
                body.fail(err);
            }
            self.demux.paused = false;
        }

        self.check_drain();
        self.maybe_finish_close();
    }

    /// Emit `Drain` when producers may feed more requests.
    ///
    /// That is after a request finished framing, once the queue and the
    /// in-flight list ran empty, or once a caller that saw the client full
    /// can dispatch again. Several of these in one step yield one event.
    pub(super) fn check_drain(&mut self) {
        if self.closed || self.state.is_full() {
            return;
        }
        let emptied = !self.drained
            && self.queue.is_empty()
            && self.demux.inflight.is_empty()
            && self.job.is_none();
        if emptied {
            self.drained = true;
        }
        let framed = std::mem::take(&mut self.framed);
        let wanted = self.state.need_drain.swap(false, Ordering::AcqRel);
        if framed || emptied || wanted {
            trace!(framed, emptied, wanted, "drain");
            self.state.emit(ClientEvent::Drain);
        }
    }
}
