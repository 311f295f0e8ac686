//! I/O: sockets, timers and the engine task that owns them.
//!
//! Everything with a side effect lives here. The engine drives the pure
//! framing and parsing from `sluice-wire` over a socket produced by a
//! [`Connect`] implementation.

use std::pin::Pin;

use futures_util::Stream;

mod connector;
pub(crate) mod engine;
mod socket;

pub use connector::{AsyncIo, BoxIo, Connect, TcpConnector};

/// A boxed, sendable stream.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;
