use crate::data::headers::Headers;
use crate::error::RequestError;

/// Validated request line and headers.
///
/// Construction is the only validation point. A `RequestHead` that exists is
/// safe to serialize: the method is an HTTP token other than `CONNECT` and
/// the path cannot smuggle whitespace or line breaks onto the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    method:  String,
    path:    String,
    headers: Headers,
}

impl RequestHead {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        headers: Headers,
    ) -> Result<Self, RequestError> {
        let method = method.into();
        let path = path.into();

        if method.is_empty() || !method.bytes().all(is_token) {
            return Err(RequestError::InvalidMethod);
        }
        if method == "CONNECT" {
            return Err(RequestError::Connect);
        }

        if !(path.starts_with('/')
            || path == "*"
            || path.starts_with("http://")
            || path.starts_with("https://"))
        {
            return Err(RequestError::RelativePath);
        }
        if path.bytes().any(|b| b < 0x21) || path.contains('\u{7f}') {
            return Err(RequestError::InvalidPath);
        }

        Ok(Self { method, path, headers })
    }

    pub fn method(&self) -> &str { &self.method }

    pub fn path(&self) -> &str { &self.path }

    pub fn headers(&self) -> &Headers { &self.headers }

    pub fn is_head(&self) -> bool { self.method == "HEAD" }
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_heads() {
        let head = RequestHead::new("GET", "/", Headers::new()).unwrap();
        assert_eq!(head.method(), "GET");
        assert_eq!(head.path(), "/");
        assert!(!head.is_head());

        assert!(RequestHead::new("OPTIONS", "*", Headers::new()).is_ok());
        assert!(RequestHead::new("GET", "http://proxy.example/x", Headers::new()).is_ok());
        assert!(RequestHead::new("PURGE", "/cache?key=1", Headers::new()).is_ok());
    }

    #[test]
    fn test_rejects_connect() {
        assert_eq!(
            RequestHead::new("CONNECT", "/", Headers::new()),
            Err(RequestError::Connect)
        );
    }

    #[test]
    fn test_rejects_bad_method() {
        assert_eq!(RequestHead::new("", "/", Headers::new()), Err(RequestError::InvalidMethod));
        assert_eq!(
            RequestHead::new("GE T", "/", Headers::new()),
            Err(RequestError::InvalidMethod)
        );
        assert_eq!(
            RequestHead::new("GET\r\n", "/", Headers::new()),
            Err(RequestError::InvalidMethod)
        );
    }

    #[test]
    fn test_rejects_bad_path() {
        assert_eq!(
            RequestHead::new("GET", "index.html", Headers::new()),
            Err(RequestError::RelativePath)
        );
        assert_eq!(RequestHead::new("GET", "", Headers::new()), Err(RequestError::RelativePath));
        assert_eq!(
            RequestHead::new("GET", "/a b", Headers::new()),
            Err(RequestError::InvalidPath)
        );
        assert_eq!(
            RequestHead::new("GET", "/a\r\nHost: evil", Headers::new()),
            Err(RequestError::InvalidPath)
        );
    }
}
