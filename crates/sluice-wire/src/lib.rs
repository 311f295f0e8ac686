//! Sans-IO HTTP/1.1 client framing.
//!
//! # Architecture
//!
//! This crate follows the two pure layers of the sluice workspace:
//! - [`data`] - Immutable value types (origins, headers, request heads)
//! - [`core`] - Pure transformations (request framing, response parsing, backoff)
//!
//! Nothing here touches a socket. The `sluice` engine owns the I/O and drives
//! [`ResponseParser`] through the [`ResponseHandler`] callbacks.

pub mod core;
pub mod data;
mod error;

pub use core::{
    BodyFraming, ParserLimits, ResponseHandler, ResponseHead, ResponseParser, encode_chunk,
    encode_chunked_end, encode_head, next_retry_delay,
};
pub use data::{HeaderValue, Headers, Origin, RequestHead, Scheme};
pub use error::{OriginError, ParseError, RequestError};
