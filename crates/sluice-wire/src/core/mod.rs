//! Pure transformations for HTTP/1.1 client framing.
//!
//! Nothing in this module performs I/O: encoders append to a caller-owned
//! buffer and the parser consumes caller-provided bytes.

mod backoff;
mod encode;
mod parse;

pub use backoff::next_retry_delay;
pub use encode::{BodyFraming, encode_chunk, encode_chunked_end, encode_head};
pub use parse::{ParserLimits, ResponseHandler, ResponseHead, ResponseParser};
