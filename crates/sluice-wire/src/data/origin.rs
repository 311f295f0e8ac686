use std::fmt;
use std::str::FromStr;

use url::{Host, Url};

use crate::error::OriginError;

/// URL scheme of an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// The remote endpoint an engine talks to: scheme, host and port.
///
/// An origin never carries a path, query, fragment or credentials. Those
/// belong to individual requests.
///
/// # Examples
///
/// ```
/// use sluice_wire::Origin;
///
/// let origin = Origin::parse("http://localhost:3000").unwrap();
/// assert_eq!(origin.host_header(), "localhost:3000");
///
/// assert!(Origin::parse("http://localhost/api").is_err());
/// assert!(Origin::parse("ftp://localhost").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: Scheme,
    host:   String,
    port:   u16,
}

impl Origin {
    /// Parse and validate an origin URL.
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let url = Url::parse(input).map_err(|e| OriginError::Malformed(e.to_string()))?;
        Self::from_url(&url)
    }

    /// Validate an already parsed URL as an origin.
    pub fn from_url(url: &Url) -> Result<Self, OriginError> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => return Err(OriginError::UnsupportedScheme(other.to_string())),
        };

        if !url.username().is_empty() || url.password().is_some() {
            return Err(OriginError::Credentials);
        }

        let path = url.path();
        if !(path.is_empty() || path == "/") || url.query().is_some() || url.fragment().is_some() {
            return Err(OriginError::NotAnOrigin);
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => format!("[{addr}]"),
            _ => return Err(OriginError::MissingHost),
        };

        let port = url.port().unwrap_or_else(|| scheme.default_port());

        Ok(Self { scheme, host, port })
    }

    pub fn scheme(&self) -> Scheme { self.scheme }

    /// Host as written in a URL (IPv6 addresses keep their brackets).
    pub fn host(&self) -> &str { &self.host }

    pub fn port(&self) -> u16 { self.port }

    pub fn is_tls(&self) -> bool { self.scheme == Scheme::Https }

    /// Host name suitable for a socket connect or a TLS server name.
    pub fn connect_host(&self) -> &str {
        self.host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(&self.host)
    }

    /// Value of the synthesized `Host` header.
    ///
    /// The port is omitted when it is the scheme's default.
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host_header())
    }
}

impl FromStr for Origin {
    type Err = OriginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<&str> for Origin {
    type Error = OriginError;

    fn try_from(value: &str) -> Result<Self, Self::Error> { Self::parse(value) }
}
