use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sluice_wire::ParserLimits;

use crate::effects::Connect;
use crate::error::{Error, Result};

/// Configuration for a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use sluice::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::default()
///     .pipelining(4)
///     .idle_timeout(Duration::from_secs(10));
/// assert_eq!(options.pipelining, 4);
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// Maximum number of requests written but not yet answered.
    ///
    /// Default: 1
    pub pipelining: usize,

    /// Inactivity limit while requests are outstanding. Also caps the
    /// reconnect backoff.
    ///
    /// Default: 30s
    pub idle_timeout: Duration,

    /// Bound on establishing a connection.
    ///
    /// Default: 10s
    pub connect_timeout: Duration,

    /// First reconnect delay after a failed connection. Doubles on each
    /// consecutive failure.
    ///
    /// Default: 1s
    pub retry_base: Duration,

    /// Consecutive connect failures tolerated before queued requests fail.
    ///
    /// Default: 3
    pub max_connect_attempts: u32,

    /// Largest accepted response head, in bytes.
    ///
    /// Default: 16 KiB
    pub max_header_size: usize,

    /// Largest accepted number of response headers.
    ///
    /// Default: 100
    pub max_headers: usize,

    /// Buffered response bytes at which socket reads pause, unless a request
    /// overrides it.
    ///
    /// Default: 64 KiB
    pub body_high_water_mark: usize,

    /// Unflushed request bytes above which no more request data is produced.
    ///
    /// Default: 16 KiB
    pub write_high_water_mark: usize,

    /// Bytes of a destroyed response body that are read and dropped before the
    /// connection is torn down instead.
    ///
    /// Default: 128 KiB
    pub max_discard: usize,

    /// Socket factory. `None` uses [`TcpConnector`](crate::TcpConnector).
    pub connector: Option<Arc<dyn Connect>>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("pipelining", &self.pipelining)
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("retry_base", &self.retry_base)
            .field("max_connect_attempts", &self.max_connect_attempts)
            .field("max_header_size", &self.max_header_size)
            .field("max_headers", &self.max_headers)
            .field("body_high_water_mark", &self.body_high_water_mark)
            .field("write_high_water_mark", &self.write_high_water_mark)
            .field("max_discard", &self.max_discard)
            .field("connector", &self.connector.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            pipelining: 1,
            idle_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry_base: Duration::from_millis(1000),
            max_connect_attempts: 3,
            max_header_size: 16 * 1024,
            max_headers: 100,
            body_high_water_mark: 64 * 1024,
            write_high_water_mark: 16 * 1024,
            max_discard: 128 * 1024,
            connector: None,
        }
    }
}

impl ClientOptions {
    #[must_use]
    pub fn pipelining(mut self, pipelining: usize) -> Self {
        self.pipelining = pipelining;
        self
    }

    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub fn retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    #[must_use]
    pub fn max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn max_header_size(mut self, bytes: usize) -> Self {
        self.max_header_size = bytes;
        self
    }

    #[must_use]
    pub fn max_headers(mut self, count: usize) -> Self {
        self.max_headers = count;
        self
    }

    #[must_use]
    pub fn body_high_water_mark(mut self, bytes: usize) -> Self {
        self.body_high_water_mark = bytes;
        self
    }

    #[must_use]
    pub fn write_high_water_mark(mut self, bytes: usize) -> Self {
        self.write_high_water_mark = bytes;
        self
    }

    #[must_use]
    pub fn max_discard(mut self, bytes: usize) -> Self {
        self.max_discard = bytes;
        self
    }

    /// Use a custom socket factory.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use sluice::{ClientOptions, TcpConnector};
    ///
    /// let options = ClientOptions::default().connector(Arc::new(TcpConnector::new()));
    /// ```
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Apply the fields present in `config` on top of the defaults.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut options = Self::default();
        let ms = Duration::from_millis;

        if let Some(v) = config.pipelining {
            options.pipelining = v;
        }
        if let Some(v) = config.idle_timeout_ms {
            options.idle_timeout = ms(v);
        }
        if let Some(v) = config.connect_timeout_ms {
            options.connect_timeout = ms(v);
        }
        if let Some(v) = config.retry_base_ms {
            options.retry_base = ms(v);
        }
        if let Some(v) = config.max_connect_attempts {
            options.max_connect_attempts = v;
        }
        if let Some(v) = config.max_header_size {
            options.max_header_size = v;
        }
        if let Some(v) = config.max_headers {
            options.max_headers = v;
        }
        if let Some(v) = config.body_high_water_mark {
            options.body_high_water_mark = v;
        }
        if let Some(v) = config.write_high_water_mark {
            options.write_high_water_mark = v;
        }
        if let Some(v) = config.max_discard {
            options.max_discard = v;
        }

        options.validate()?;
        Ok(options)
    }

    /// Parse options from a TOML document.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::ClientOptions;
    ///
    /// let options = ClientOptions::from_toml_str(
    ///     r#"
    ///     pipelining = 8
    ///     idle_timeout_ms = 5000
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(options.pipelining, 8);
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(input).map_err(|e| Error::Config(e.to_string()))?;
        Self::from_config(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let input = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&input)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.pipelining == 0 {
            return Err(Error::Config("pipelining must be at least 1".into()));
        }
        if self.idle_timeout.is_zero() {
            return Err(Error::Config("idle_timeout must be positive".into()));
        }
        if self.connect_timeout.is_zero() {
            return Err(Error::Config("connect_timeout must be positive".into()));
        }
        if self.max_connect_attempts == 0 {
            return Err(Error::Config("max_connect_attempts must be at least 1".into()));
        }
        if self.max_headers == 0 || self.max_header_size == 0 {
            return Err(Error::Config("header limits must be positive".into()));
        }
        Ok(())
    }

    pub(crate) fn parser_limits(&self) -> ParserLimits {
        ParserLimits { max_head_size: self.max_header_size, max_headers: self.max_headers }
    }
}

/// Serializable form of [`ClientOptions`]. Durations are in milliseconds and
/// every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub pipelining:            Option<usize>,
    pub idle_timeout_ms:       Option<u64>,
    pub connect_timeout_ms:    Option<u64>,
    pub retry_base_ms:         Option<u64>,
    pub max_connect_attempts:  Option<u32>,
    pub max_header_size:       Option<usize>,
    pub max_headers:           Option<usize>,
    pub body_high_water_mark:  Option<usize>,
    pub write_high_water_mark: Option<usize>,
    pub max_discard:           Option<usize>,
}
