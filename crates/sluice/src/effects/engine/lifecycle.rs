use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::FutureExt;
use sluice_wire::next_retry_delay;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep, sleep_until, timeout};
use tracing::{debug, warn};

use super::Engine;
use crate::body::BodySender;
use crate::data::ClientEvent;
use crate::effects::connector::BoxIo;
use crate::error::{Error, Result};

impl Engine {
    /// Ensure a socket is on its way. Waits out a pending backoff delay.
    pub(super) fn connect(&mut self) {
        if self.destroyed
            || self.socket.is_attached()
            || self.connecting.is_some()
            || self.retry_timer.is_some()
        {
            return;
        }
        if self.retry_delay.is_zero() {
            self.start_connect();
        } else {
            debug!(
                origin = %self.origin,
                delay_ms = self.retry_delay.as_millis() as u64,
                "reconnect scheduled"
            );
            self.retry_timer = Some(Box::pin(sleep(self.retry_delay)));
        }
    }

    fn start_connect(&mut self) {
        debug!(origin = %self.origin, "connecting");
        let connect = self.connector.connect(&self.origin);
        let limit = self.options.connect_timeout;
        self.connecting = Some(
            async move {
                match timeout(limit, connect).await {
                    Ok(res) => res.map_err(Error::from),
                    Err(_) => Err(Error::ConnectTimeout),
                }
            }
            .boxed(),
        );
    }

    pub(super) fn on_connect_result(&mut self, res: Result<BoxIo>) {
        self.connecting = None;
        match res {
            Ok(io) => {
                self.retry_delay = Duration::ZERO;
                self.failed_attempts = 0;
                self.socket.attach(io);
                self.state.connected.store(true, Ordering::Release);
                debug!(origin = %self.origin, "connected");
                self.state.emit(ClientEvent::Connected);

                self.touch_idle();
                self.admit_next();
                self.check_drain();
                self.maybe_finish_close();
            }
            Err(err) => {
                self.failed_attempts += 1;
                warn!(
                    origin = %self.origin,
                    attempt = self.failed_attempts,
                    error = %err,
                    "connect failed"
                );
                self.state.emit(ClientEvent::ConnectFailed { error: err.clone() });
                self.retry_delay = next_retry_delay(
                    self.retry_delay,
                    self.options.retry_base,
                    self.options.idle_timeout,
                );

                if self.failed_attempts >= self.options.max_connect_attempts {
                    self.failed_attempts = 0;
                    self.fail_queued(err);
                } else if !self.queue.is_empty() {
                    self.connect();
                }
                self.check_drain();
                self.maybe_finish_close();
            }
        }
    }

    pub(super) fn on_retry_timer(&mut self) {
        self.retry_timer = None;
        if !self.queue.is_empty() {
            self.start_connect();
        }
    }

    pub(super) fn on_read(&mut self, res: io::Result<usize>) {
        let n = match res {
            Ok(0) => return self.teardown(None),
            Ok(n) => n,
            Err(e) => return self.teardown(Some(e.into())),
        };
        self.touch_idle();

        let data = self.read_buf.split_to(n);
        let parsed = self.parser.execute(&data, &mut self.demux);

        if let Some(fault) = self.demux.fault.take() {
            return self.teardown(Some(fault));
        }
        if let Err(e) = parsed {
            return self.teardown(Some(e.into()));
        }

        if self.demux.retire {
            self.socket.reusable = false;
            if self.demux.is_idle() && self.job.is_none() {
                return self.teardown(Some(Error::Informational("reset".to_string())));
            }
        }
        if std::mem::take(&mut self.demux.progress) {
            self.admit_next();
            self.check_drain();
        }
        self.maybe_finish_close();
    }

    /// The consumer pulled from or destroyed the active body.
    pub(super) fn on_demand(&mut self) {
        if self.demux.active_body().is_none_or(BodySender::wants_more) {
            self.demux.paused = false;
            self.admit_next();
            self.check_drain();
            self.maybe_finish_close();
        }
    }

    pub(super) fn on_idle_timeout(&mut self) {
        let busy = !self.demux.inflight.is_empty()
            || (self.demux.active.is_some() && !self.demux.paused);
        if busy {
            debug!(origin = %self.origin, "idle timeout with requests outstanding");
            self.teardown(Some(Error::Timeout));
        } else {
            self.idle = None;
        }
    }

    /// Arm the idle timer, or push its deadline out.
    pub(super) fn touch_idle(&mut self) {
        if !self.socket.is_attached() {
            return;
        }
        let deadline = Instant::now() + self.options.idle_timeout;
        match self.idle.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.idle = Some(Box::pin(sleep_until(deadline))),
        }
    }

    /// Drop the socket and settle everything that depended on it.
    ///
    /// `None` means the peer closed the connection.
    pub(super) fn teardown(&mut self, err: Option<Error>) {
        if !self.socket.is_attached() {
            return;
        }
        if err.is_none() {
            // a body delimited by connection close ends here
            let _ = self.parser.finish(&mut self.demux);
        }
        let err = err.unwrap_or_else(Error::other_side_closed);

        self.socket.detach();
        self.read_buf.clear();
        self.write_buf.clear();
        self.job = None;

        for mut entry in self.demux.inflight.drain(..) {
            self.state.release();
            if entry.callback.is_some() {
                debug!(id = entry.id, error = %err, "request errored");
                entry.fail(err.clone());
            }
        }
        if let Some(body) = self.demux.active.take().and_then(|active| active.body) {
            body.fail(err.clone());
        }
        self.demux.reset();
        self.parser.reset();
        self.idle = None;
        self.state.connected.store(false, Ordering::Release);

        debug!(origin = %self.origin, error = %err, "disconnected");
        self.state.emit(ClientEvent::Disconnected { error: err });

        if self.destroyed {
            self.fail_queued(Error::Destroyed);
        } else if !self.queue.is_empty() {
            debug!(origin = %self.origin, queued = self.queue.len(), "reconnecting");
            self.state.emit(ClientEvent::Reconnecting);
            self.connect();
        }
        self.check_drain();
        self.maybe_finish_close();
    }

    fn fail_queued(&mut self, err: Error) {
        for pending in self.queue.drain(..) {
            self.state.release();
            pending.fail(err.clone());
        }
    }

    pub(super) fn close(&mut self, done: oneshot::Sender<()>) {
        self.closed = true;
        self.state.closed.store(true, Ordering::Release);
        if self.destroyed {
            let _ = done.send(());
            return;
        }
        self.close_waiters.push(done);
        self.maybe_finish_close();
    }

    /// Destroy a closed engine once nothing is left to deliver.
    pub(super) fn maybe_finish_close(&mut self) {
        if self.closed
            && !self.destroyed
            && self.queue.is_empty()
            && self.demux.is_idle()
            && self.job.is_none()
        {
            self.destroy(None);
        }
    }

    pub(super) fn destroy(&mut self, err: Option<Error>) {
        if self.destroyed {
            return;
        }
        debug!(origin = %self.origin, "destroying client");
        self.destroyed = true;
        self.closed = true;
        self.state.destroyed.store(true, Ordering::Release);
        self.state.closed.store(true, Ordering::Release);

        self.connecting = None;
        self.retry_timer = None;
        self.idle = None;

        if self.socket.is_attached() {
            self.teardown(Some(err.unwrap_or(Error::Destroyed)));
        } else {
            self.fail_queued(Error::Destroyed);
        }
        for done in self.close_waiters.drain(..) {
            let _ = done.send(());
        }
    }
}
