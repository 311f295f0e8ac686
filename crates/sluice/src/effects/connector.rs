use std::io;
#[cfg(feature = "rustls")]
use std::sync::{Arc, OnceLock};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use sluice_wire::Origin;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Duplex byte stream the engine can own.
pub trait AsyncIo: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> AsyncIo for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxIo = Box<dyn AsyncIo>;

/// Socket factory.
///
/// The engine calls `connect` lazily, at most once at a time, and applies its
/// own connect timeout around the returned future.
///
/// # Implementations
///
/// - [`TcpConnector`]: TCP, with TLS for `https` origins when the `rustls`
///   feature is enabled
/// - In-memory duplex streams for testing
pub trait Connect: Send + Sync + 'static {
    fn connect(&self, origin: &Origin) -> BoxFuture<'static, io::Result<BoxIo>>;
}

/// Default connector: TCP with `TCP_NODELAY`, wrapped in TLS for `https`.
#[derive(Default)]
pub struct TcpConnector {
    #[cfg(feature = "rustls")]
    tls: OnceLock<Arc<rustls::ClientConfig>>,
}

impl TcpConnector {
    pub fn new() -> Self { Self::default() }

    /// Use `config` for `https` origins instead of the built-in webpki roots.
    #[cfg(feature = "rustls")]
    pub fn with_tls_config(config: Arc<rustls::ClientConfig>) -> Self {
        let tls = OnceLock::new();
        let _ = tls.set(config);
        Self { tls }
    }

    #[cfg(feature = "rustls")]
    fn tls_config(&self) -> io::Result<Arc<rustls::ClientConfig>> {
        if let Some(config) = self.tls.get() {
            return Ok(config.clone());
        }
        let config = Arc::new(default_tls_config()?);
        Ok(self.tls.get_or_init(|| config).clone())
    }
}

impl Connect for TcpConnector {
    fn connect(&self, origin: &Origin) -> BoxFuture<'static, io::Result<BoxIo>> {
        let host = origin.connect_host().to_string();
        let port = origin.port();

        if !origin.is_tls() {
            return async move {
                let stream = tcp(&host, port).await?;
                Ok(Box::new(stream) as BoxIo)
            }
            .boxed();
        }

        self.connect_tls(host, port)
    }
}

impl TcpConnector {
    #[cfg(feature = "rustls")]
    fn connect_tls(&self, host: String, port: u16) -> BoxFuture<'static, io::Result<BoxIo>> {
        let config = match self.tls_config() {
            Ok(config) => config,
            Err(e) => return futures_util::future::ready(Err(e)).boxed(),
        };
        async move {
            let server_name = rustls::pki_types::ServerName::try_from(host.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let stream = tcp(&host, port).await?;
            let tls = tokio_rustls::TlsConnector::from(config)
                .connect(server_name, stream)
                .await?;
            Ok(Box::new(tls) as BoxIo)
        }
        .boxed()
    }

    #[cfg(not(feature = "rustls"))]
    fn connect_tls(&self, _host: String, _port: u16) -> BoxFuture<'static, io::Result<BoxIo>> {
        futures_util::future::ready(Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "https origins require the `rustls` feature",
        )))
        .boxed()
    }
}

async fn tcp(host: &str, port: u16) -> io::Result<TcpStream> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

#[cfg(feature = "rustls")]
fn default_tls_config() -> io::Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(io::Error::other)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn test_tcp_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let origin = Origin::parse(&format!("http://{addr}")).unwrap();
        let mut io = TcpConnector::new().connect(&origin).await.unwrap();
        io.write_all(b"ping").await.unwrap();

        assert_eq!(&server.await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let origin = Origin::parse(&format!("http://{addr}")).unwrap();
        assert!(TcpConnector::new().connect(&origin).await.is_err());
    }

    #[cfg(feature = "rustls")]
    #[test]
    fn test_default_tls_config() {
        let config = default_tls_config().unwrap();
        assert_eq!(config.alpn_protocols, vec![b"http/1.1".to_vec()]);
    }
}
