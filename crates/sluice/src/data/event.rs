use crate::error::Error;

/// Connection-level notifications, delivered to every
/// [`Client::subscribe`](crate::Client::subscribe) receiver.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connected,
    ConnectFailed { error: Error },
    Disconnected { error: Error },
    /// The socket went away with requests still queued; a new one is coming.
    Reconnecting,
    /// Producers may feed more requests: a request finished framing, the
    /// queue and the in-flight list ran empty, or a client that a dispatch
    /// reported full can accept more.
    Drain,
}
