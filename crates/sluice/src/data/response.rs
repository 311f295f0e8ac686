use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use sluice_wire::Headers;

use crate::body::Body;

/// Caller-supplied correlation token, returned untouched on the response.
///
/// # Examples
///
/// ```
/// use sluice::Opaque;
///
/// let token = Opaque::new(42u32);
/// assert_eq!(token.downcast_ref::<u32>(), Some(&42));
/// assert_eq!(token.downcast_ref::<String>(), None);
/// ```
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self { Self(Arc::new(value)) }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.0.downcast_ref() }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("Opaque { .. }") }
}

/// Trailer section of a response, available once its body completes.
///
/// The cell is shared with the engine and written exactly once. Responses
/// without a chunked trailer section complete with an empty set.
#[derive(Clone, Default)]
pub struct Trailers(Arc<OnceLock<Headers>>);

impl Trailers {
    /// `None` until the message is complete.
    pub fn get(&self) -> Option<&Headers> { self.0.get() }

    pub fn is_complete(&self) -> bool { self.0.get().is_some() }

    pub(crate) fn set(&self, trailers: Headers) { let _ = self.0.set(trailers); }
}

impl fmt::Debug for Trailers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Trailers").field(&self.0.get()).finish()
    }
}

/// Status, headers and body of a completed response head.
#[derive(Debug)]
pub struct Response {
    pub status:   u16,
    pub reason:   String,
    /// Lowercased names; repeated headers folded into lists.
    pub headers:  Headers,
    pub trailers: Trailers,
    /// `None` for responses to `HEAD`.
    pub body:     Option<Body>,
    pub opaque:   Option<Opaque>,
}
