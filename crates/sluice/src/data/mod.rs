//! Immutable configuration and value types.

mod event;
mod options;
mod request;
mod response;

pub use event::ClientEvent;
pub use options::{ClientConfig, ClientOptions};
pub use request::{BodyStream, RequestBody, RequestOptions};
pub use response::{Opaque, Response, Trailers};
