//! The per-origin engine task.
//!
//! One task owns the socket, the request queue, the in-flight list and every
//! timer. It reacts to a single `select!` over its inputs and hands each
//! wake-up to a transition method:
//!
//! - [`scheduler`]: queueing, admission under the pipelining limit, aborts
//! - [`writer`]: request framing onto the socket's outbound buffer
//! - [`demux`]: correlating parsed responses with in-flight requests
//! - [`lifecycle`]: connect, backoff, idle timeout, disconnect, close, destroy

use std::collections::VecDeque;
use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use sluice_wire::{Origin, RequestHead, ResponseParser};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Sleep;
use tracing::trace;

use crate::abort::AbortSignal;
use crate::body::BodySender;
use crate::data::{ClientEvent, ClientOptions, Opaque, RequestBody, Response};
use crate::effects::connector::{BoxIo, Connect};
use crate::effects::socket::{Socket, Written, read_some, write_some};
use crate::error::{BoxError, Error, Result};

mod demux;
mod lifecycle;
mod scheduler;
mod writer;

use demux::Demux;
pub(crate) use writer::declared_length;
use writer::WriteJob;

/// Completion callback of one request.
pub(crate) type Callback = Box<dyn FnOnce(Result<Response>) + Send>;

/// State shared between client handles and the engine task.
pub(crate) struct ClientState {
    /// Queued plus in-flight requests, including dispatches still in transit
    /// to the engine.
    pub(crate) size:       AtomicUsize,
    pub(crate) pipelining: AtomicUsize,
    pub(crate) closed:     AtomicBool,
    pub(crate) destroyed:  AtomicBool,
    pub(crate) connected:  AtomicBool,
    /// A dispatch reported the client full; emit `Drain` once it is not,
    /// even while work is still outstanding.
    pub(crate) need_drain: AtomicBool,
    pub(crate) events:     broadcast::Sender<ClientEvent>,
}

impl ClientState {
    pub(crate) fn new(pipelining: usize) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            size: AtomicUsize::new(0),
            pipelining: AtomicUsize::new(pipelining),
            closed: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            need_drain: AtomicBool::new(false),
            events,
        }
    }

    pub(crate) fn size(&self) -> usize { self.size.load(Ordering::Acquire) }

    pub(crate) fn pipelining(&self) -> usize { self.pipelining.load(Ordering::Acquire) }

    pub(crate) fn is_full(&self) -> bool { self.size() > self.pipelining() }

    /// One request left the queue or the in-flight list for good.
    pub(crate) fn release(&self) { self.size.fetch_sub(1, Ordering::AcqRel); }

    pub(crate) fn emit(&self, event: ClientEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// A validated request waiting in the queue.
pub(crate) struct Pending {
    pub(crate) id:              u64,
    pub(crate) head:            RequestHead,
    pub(crate) body:            RequestBody,
    pub(crate) signal:          Option<AbortSignal>,
    pub(crate) high_water_mark: Option<usize>,
    pub(crate) opaque:          Option<Opaque>,
    pub(crate) callback:        Callback,
    /// Dropping this stops the request's abort watcher.
    pub(crate) guard:           Option<oneshot::Sender<()>>,
}

impl Pending {
    pub(crate) fn fail(self, err: Error) { (self.callback)(Err(err)); }
}

pub(crate) enum Command {
    Dispatch(Pending),
    Abort { id: u64, reason: Option<String> },
    Close { done: oneshot::Sender<()> },
    Destroy { error: Option<Error>, done: oneshot::Sender<()> },
    /// Re-run admission, e.g. after the pipelining limit changed.
    Wake,
}

enum Wake {
    Command(Option<Command>),
    Connected(Result<BoxIo>),
    RetryTimer,
    Read(std::io::Result<usize>),
    Written(std::io::Result<Written>),
    Chunk(Option<std::result::Result<Bytes, BoxError>>),
    Demand,
    Idle,
}

pub(crate) struct Engine {
    origin:      Origin,
    host_header: String,
    options:     ClientOptions,
    connector:   Arc<dyn Connect>,
    state:       Arc<ClientState>,
    commands:    mpsc::UnboundedReceiver<Command>,
    /// Every client handle is gone; behave as if closed.
    orphaned:    bool,

    queue: VecDeque<Pending>,

    socket:    Socket,
    read_buf:  BytesMut,
    write_buf: BytesMut,
    job:       Option<WriteJob>,

    parser: ResponseParser,
    demux:  Demux,

    connecting:      Option<BoxFuture<'static, Result<BoxIo>>>,
    retry_timer:     Option<Pin<Box<Sleep>>>,
    retry_delay:     Duration,
    failed_attempts: u32,
    idle:            Option<Pin<Box<Sleep>>>,

    /// A request finished framing since the last drain check.
    framed:        bool,
    /// `Drain` was already emitted for the current empty stretch.
    drained:       bool,
    closed:        bool,
    destroyed:     bool,
    close_waiters: Vec<oneshot::Sender<()>>,
}

impl Engine {
    pub(crate) fn new(
        origin: Origin,
        options: ClientOptions,
        connector: Arc<dyn Connect>,
        state: Arc<ClientState>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let demux = Demux::new(state.clone(), options.body_high_water_mark, options.max_discard);
        Self {
            host_header: origin.host_header(),
            parser: ResponseParser::new(options.parser_limits()),
            origin,
            options,
            connector,
            state,
            commands,
            orphaned: false,
            queue: VecDeque::new(),
            socket: Socket::default(),
            read_buf: BytesMut::new(),
            write_buf: BytesMut::new(),
            job: None,
            demux,
            connecting: None,
            retry_timer: None,
            retry_delay: Duration::ZERO,
            failed_attempts: 0,
            idle: None,
            framed: false,
            drained: true,
            closed: false,
            destroyed: false,
            close_waiters: Vec::new(),
        }
    }

    /// Drive the engine until it is destroyed.
    pub(crate) async fn run(mut self) {
        while !self.destroyed {
            let wake = self.next_wake().await;
            self.handle(wake);
        }
        self.shutdown();
    }

    async fn next_wake(&mut self) -> Wake {
        let produce = self.job.is_some()
            && self.socket.is_attached()
            && self.write_buf.len() < self.options.write_high_water_mark;
        let write = self.socket.is_attached() && (!self.write_buf.is_empty() || self.socket.needs_flush);
        let read = !self.demux.paused;
        let demand = self.demux.paused;
        let active_body = self.demux.active_body();

        tokio::select! {
            cmd = self.commands.recv(), if !self.orphaned => Wake::Command(cmd),
            res = until(self.connecting.as_mut()) => Wake::Connected(res),
            _ = until(self.retry_timer.as_mut()) => Wake::RetryTimer,
            res = write_some(self.socket.writer.as_mut(), &self.write_buf), if write => Wake::Written(res),
            chunk = next_chunk(self.job.as_mut()), if produce => Wake::Chunk(chunk),
            res = read_some(self.socket.reader.as_mut(), &mut self.read_buf), if read => Wake::Read(res),
            _ = demand_of(active_body), if demand => Wake::Demand,
            _ = until(self.idle.as_mut()) => Wake::Idle,
        }
    }

    fn handle(&mut self, wake: Wake) {
        match wake {
            Wake::Command(Some(cmd)) => self.on_command(cmd),
            Wake::Command(None) => {
                trace!(origin = %self.origin, "all client handles dropped");
                self.orphaned = true;
                self.closed = true;
                self.state.closed.store(true, Ordering::Release);
                self.maybe_finish_close();
            }
            Wake::Connected(res) => self.on_connect_result(res),
            Wake::RetryTimer => self.on_retry_timer(),
            Wake::Read(res) => self.on_read(res),
            Wake::Written(res) => self.on_written(res),
            Wake::Chunk(chunk) => self.on_body_chunk(chunk),
            Wake::Demand => self.on_demand(),
            Wake::Idle => self.on_idle_timeout(),
        }
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Dispatch(pending) => self.enqueue(pending),
            Command::Abort { id, reason } => self.abort(id, reason),
            Command::Close { done } => self.close(done),
            Command::Destroy { error, done } => {
                self.destroy(error);
                let _ = done.send(());
            }
            Command::Wake => {
                self.admit_next();
                self.check_drain();
            }
        }
    }

    /// Settle whatever is still in the command channel once destroyed.
    fn shutdown(&mut self) {
        self.commands.close();
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                Command::Dispatch(pending) => {
                    self.state.release();
                    pending.fail(Error::Destroyed);
                }
                Command::Close { done } | Command::Destroy { done, .. } => {
                    let _ = done.send(());
                }
                Command::Abort { .. } | Command::Wake => {}
            }
        }
    }
}

/// Await an optional future, pending forever when absent.
async fn until<F: Future + Unpin>(fut: Option<&mut F>) -> F::Output {
    match fut {
        Some(fut) => fut.await,
        None => pending().await,
    }
}

async fn next_chunk(
    job: Option<&mut WriteJob>,
) -> Option<std::result::Result<Bytes, BoxError>> {
    match job {
        Some(job) => job.stream.next().await,
        None => pending().await,
    }
}

async fn demand_of(body: Option<&BodySender>) {
    match body {
        Some(body) => body.demand().await,
        None => pending().await,
    }
}
