//! The public handle over one origin's engine task.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use sluice_wire::{Origin, RequestHead};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::abort::AbortSignal;
use crate::data::{ClientEvent, ClientOptions, RequestBody, RequestOptions, Response};
use crate::effects::TcpConnector;
use crate::effects::engine::{ClientState, Command, Engine, Pending, declared_length};
use crate::error::{Error, Result};

/// A pipelining HTTP/1.1 client bound to a single origin.
///
/// Cloning is cheap; clones share the same connection and queue. Requests go
/// out in call order and their responses are delivered in the same order.
/// The engine task shuts down after [`close`](Client::close),
/// [`destroy`](Client::destroy), or once every handle is dropped and the
/// queue has drained.
///
/// # Examples
///
/// ```no_run
/// # async fn run() -> sluice::Result<()> {
/// use sluice::{Client, ClientOptions, RequestOptions};
///
/// let client = Client::new("http://localhost:3000", ClientOptions::default().pipelining(4))?;
/// let response = client.request(RequestOptions::get("/health")).await?;
/// assert_eq!(response.status, 200);
/// client.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    origin:   Origin,
    commands: mpsc::UnboundedSender<Command>,
    state:    Arc<ClientState>,
    next_id:  AtomicU64,
    runtime:  Handle,
}

impl Client {
    /// Create a client for `origin` (`http://host:port` or `https://host`).
    ///
    /// Must be called inside a tokio runtime. No connection is made until the
    /// first request.
    pub fn new(origin: &str, options: ClientOptions) -> Result<Self> {
        Self::with_origin(Origin::parse(origin)?, options)
    }

    pub fn with_origin(origin: Origin, options: ClientOptions) -> Result<Self> {
        options.validate()?;
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let connector = options.connector.clone().unwrap_or_else(|| Arc::new(TcpConnector::new()));
        let state = Arc::new(ClientState::new(options.pipelining));
        let (commands, rx) = mpsc::unbounded_channel();

        let engine = Engine::new(origin.clone(), options, connector, state.clone(), rx);
        runtime.spawn(engine.run());
        debug!(origin = %origin, "client created");

        Ok(Self {
            inner: Arc::new(ClientInner { origin, commands, state, next_id: AtomicU64::new(0), runtime }),
        })
    }

    /// Queue a request; `callback` receives its response or error exactly
    /// once.
    ///
    /// Returns whether the client is now full, i.e. more requests are queued
    /// or in flight than the pipelining limit. A caller that sees `true`
    /// should wait for [`ClientEvent::Drain`] before dispatching more.
    ///
    /// Invalid requests fail here without touching the socket. A request
    /// whose signal already fired never reaches the engine; its callback
    /// receives [`Error::Aborted`] from a task spawned on the client's
    /// runtime, never from inside this call.
    pub fn dispatch<F>(&self, opts: RequestOptions, callback: F) -> Result<bool>
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        let state = &self.inner.state;
        if state.destroyed.load(Ordering::Acquire) {
            return Err(Error::Destroyed);
        }
        if state.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        let RequestOptions { method, path, headers, body, signal, high_water_mark, opaque } = opts;
        let head = RequestHead::new(method, path, headers)?;
        if matches!(body, RequestBody::Stream(_)) {
            declared_length(head.headers())?;
        }

        if let Some(signal) = &signal
            && signal.is_aborted()
        {
            let err = Error::aborted(signal.reason());
            self.inner.runtime.spawn(async move { callback(Err(err)) });
            return Ok(state.is_full());
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = signal.as_ref().map(|signal| self.watch_abort(id, signal.clone()));
        let pending = Pending {
            id,
            head,
            body,
            signal,
            high_water_mark,
            opaque,
            callback: Box::new(callback),
            guard,
        };

        state.size.fetch_add(1, Ordering::AcqRel);
        let full = state.is_full();
        if full {
            state.need_drain.store(true, Ordering::Release);
        }
        if self.inner.commands.send(Command::Dispatch(pending)).is_err() {
            state.release();
            return Err(Error::Destroyed);
        }
        Ok(full)
    }

    /// Queue a request and await its response.
    ///
    /// The request is queued by this call, not on first poll, so several
    /// futures created in a row hit the wire in that order.
    pub fn request(&self, opts: RequestOptions) -> ResponseFuture {
        let (tx, rx) = oneshot::channel();
        let state = match self.dispatch(opts, move |res| {
            let _ = tx.send(res);
        }) {
            Ok(_) => ResponseState::Waiting(rx),
            Err(err) => ResponseState::Failed(Some(err)),
        };
        ResponseFuture { state }
    }

    /// Stop accepting requests and wait until the queued ones have been
    /// answered and the connection is closed.
    pub async fn close(&self) {
        let state = &self.inner.state;
        if state.destroyed.load(Ordering::Acquire) {
            return;
        }
        state.closed.store(true, Ordering::Release);

        let (done, wait) = oneshot::channel();
        if self.inner.commands.send(Command::Close { done }).is_ok() {
            let _ = wait.await;
        }
    }

    /// Tear everything down now.
    ///
    /// In-flight requests fail with `error` (default [`Error::Destroyed`]);
    /// queued requests fail with [`Error::Destroyed`].
    pub async fn destroy(&self, error: Option<Error>) {
        let state = &self.inner.state;
        state.closed.store(true, Ordering::Release);
        state.destroyed.store(true, Ordering::Release);

        let (done, wait) = oneshot::channel();
        if self.inner.commands.send(Command::Destroy { error, done }).is_ok() {
            let _ = wait.await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> { self.inner.state.events.subscribe() }

    /// Queued plus in-flight requests.
    pub fn size(&self) -> usize { self.inner.state.size() }

    pub fn is_full(&self) -> bool { self.inner.state.is_full() }

    pub fn pipelining(&self) -> usize { self.inner.state.pipelining() }

    /// Change the pipelining limit. Takes effect for the next admission.
    pub fn set_pipelining(&self, pipelining: usize) -> Result<()> {
        if pipelining == 0 {
            return Err(Error::InvalidArgument("pipelining must be at least 1".into()));
        }
        self.inner.state.pipelining.store(pipelining, Ordering::Release);
        let _ = self.inner.commands.send(Command::Wake);
        Ok(())
    }

    pub fn is_closed(&self) -> bool { self.inner.state.closed.load(Ordering::Acquire) }

    pub fn is_destroyed(&self) -> bool { self.inner.state.destroyed.load(Ordering::Acquire) }

    pub fn is_connected(&self) -> bool { self.inner.state.connected.load(Ordering::Acquire) }

    pub fn origin(&self) -> &Origin { &self.inner.origin }

    /// Forward `signal` to the engine as an abort command. The watcher ends
    /// when the returned guard is dropped with the request.
    fn watch_abort(&self, id: u64, signal: AbortSignal) -> oneshot::Sender<()> {
        let (guard, released) = oneshot::channel::<()>();
        let commands = self.inner.commands.downgrade();
        self.inner.runtime.spawn(async move {
            tokio::select! {
                reason = signal.aborted() => {
                    if let Some(commands) = commands.upgrade() {
                        let _ = commands.send(Command::Abort { id, reason });
                    }
                }
                _ = released => {}
            }
        });
        guard
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("origin", &self.inner.origin)
            .field("size", &self.size())
            .field("pipelining", &self.pipelining())
            .field("closed", &self.is_closed())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Response of [`Client::request`].
#[must_use = "futures do nothing unless polled, though the request is already queued"]
pub struct ResponseFuture {
    state: ResponseState,
}

enum ResponseState {
    Waiting(oneshot::Receiver<Result<Response>>),
    Failed(Option<Error>),
}

impl Future for ResponseFuture {
    type Output = Result<Response>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            ResponseState::Waiting(rx) => {
                Pin::new(rx).poll(cx).map(|res| res.unwrap_or_else(|_| Err(Error::Destroyed)))
            }
            ResponseState::Failed(err) => Poll::Ready(Err(err.take().unwrap_or(Error::Destroyed))),
        }
    }
}

impl fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture").finish_non_exhaustive()
    }
}
