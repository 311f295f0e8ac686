//! Pipelined HTTP/1.1 client for a single origin.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Immutable configuration and value types
//! - `sluice-wire` - Pure request framing and response parsing
//! - `effects` - Sockets, timers and the engine task
//!
//! # Key Features
//!
//! - **Pipelining**: up to `pipelining` requests written ahead of their
//!   responses, answered strictly in wire order
//! - **Backpressure**: response bodies are pull-based streams; a full buffer
//!   pauses socket reads until the consumer catches up
//! - **Streaming uploads**: request bodies from any `Stream`, framed chunked
//!   or against a declared `content-length`
//! - **Cancellation**: an [`AbortSignal`] cancels a request at any stage
//! - **Self-healing**: lost connections are re-established with exponential
//!   backoff while requests are queued
//!
//! # Examples
//!
//! ```no_run
//! # async fn run() -> sluice::Result<()> {
//! use sluice::{Client, ClientOptions, RequestOptions};
//!
//! let client = Client::new("http://localhost:3000", ClientOptions::default())?;
//!
//! let response = client.request(RequestOptions::post("/echo").body("ping")).await?;
//! let text = response.body.expect("POST responses carry a body").text().await?;
//! assert_eq!(text, "ping");
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod abort;
mod body;
mod client;
mod data;
mod effects;
mod error;

pub use abort::{AbortController, AbortSignal};
pub use body::{Body, DEFAULT_DUMP_LIMIT, DumpOptions};
pub use client::{Client, ResponseFuture};
pub use data::{
    BodyStream, ClientConfig, ClientEvent, ClientOptions, Opaque, RequestBody, RequestOptions,
    Response, Trailers,
};
pub use effects::{AsyncIo, BoxIo, BoxStream, Connect, TcpConnector};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use sluice_wire::{HeaderValue, Headers, Origin, OriginError, ParseError, Scheme};
