//! Immutable data types shared by the framing layer and the engine.
//!
//! These values are validated once at construction and never mutated
//! afterwards, so they can be handed across the engine boundary freely.

pub mod headers;
pub mod origin;
pub mod request;

pub use headers::{HeaderValue, Headers};
pub use origin::{Origin, Scheme};
pub use request::RequestHead;
