//! End-to-end tests against in-process HTTP/1.1 servers.
//!
//! Each test drives a raw `TcpListener` by hand so the exact bytes on the
//! wire and the order of requests and responses are under test control.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use sluice::{
    AbortController, BoxIo, Client, ClientEvent, ClientOptions, Connect, Error, ErrorKind, Origin,
    RequestBody, RequestOptions,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

struct Received {
    /// Request line and headers, lowercased.
    head: String,
    body: Vec<u8>,
}

impl Received {
    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == name).then(|| value.trim())
        })
    }

    fn request_line(&self) -> &str { self.head.lines().next().unwrap_or_default() }
}

/// Read one request, decoding a `content-length` or chunked body.
async fn read_request<R: AsyncBufRead + Unpin>(reader: &mut R) -> Option<Received> {
    let mut head = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let done = line == "\r\n";
        head.push_str(&line.to_ascii_lowercase());
        if done {
            break;
        }
    }

    let mut received = Received { head, body: Vec::new() };
    if let Some(len) = received.header("content-length") {
        let len: usize = len.parse().ok()?;
        received.body.resize(len, 0);
        reader.read_exact(&mut received.body).await.ok()?;
    } else if received.header("transfer-encoding") == Some("chunked") {
        loop {
            let mut size = String::new();
            reader.read_line(&mut size).await.ok()?;
            let size = usize::from_str_radix(size.trim(), 16).ok()?;
            let mut chunk = vec![0; size + 2];
            reader.read_exact(&mut chunk).await.ok()?;
            if size == 0 {
                break;
            }
            received.body.extend_from_slice(&chunk[..size]);
        }
    }
    Some(received)
}

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    (listener, origin)
}

async fn accept(listener: &TcpListener) -> BufReader<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    BufReader::new(stream)
}

async fn respond(conn: &mut BufReader<TcpStream>, raw: &str) {
    conn.get_mut().write_all(raw.as_bytes()).await.unwrap();
}

fn ok(body: &str) -> String {
    format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{body}", body.len())
}

async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut).await.expect("test timed out")
}

async fn text(client: &Client, opts: RequestOptions) -> sluice::Result<String> {
    let response = client.request(opts).await?;
    response.body.expect("body").text().await
}

#[tokio::test]
async fn test_reconnects_after_server_close() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        for body in ["hello", "again"] {
            let mut conn = accept(&listener).await;
            let req = read_request(&mut conn).await.unwrap();
            assert_eq!(req.request_line(), "get / http/1.1");
            respond(&mut conn, &ok(body)).await;
        }
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();

    within(async {
        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "hello");
        loop {
            if let ClientEvent::Disconnected { error } = events.recv().await.unwrap() {
                assert!(matches!(error, Error::SocketClosed(_)));
                break;
            }
        }
        assert!(!client.is_connected());

        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "again");
        client.close().await;
    })
    .await;

    server.await.unwrap();
    assert!(client.is_destroyed());
}

#[tokio::test]
async fn test_connection_close_response_retires_socket() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        respond(&mut conn, "HTTP/1.1 200 OK\r\nconnection: close\r\ncontent-length: 3\r\n\r\none").await;
        // the client hangs up by itself
        let mut sink = Vec::new();
        let _ = conn.read_to_end(&mut sink).await;

        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("two")).await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    within(async {
        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "one");
        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "two");
    })
    .await;

    within(server).await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_idle_timeout_fails_unanswered_request() {
    let (listener, origin) = listen().await;
    let (release, hold) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        let _ = hold.await;
    });

    let options = ClientOptions::default().idle_timeout(Duration::from_millis(200));
    let client = Client::new(&origin, options).unwrap();

    let err = within(client.request(RequestOptions::get("/slow"))).await.unwrap_err();
    assert!(matches!(err, Error::Timeout));
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(client.size(), 0);

    let _ = release.send(());
    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_pre_aborted_request_never_connects() {
    let (listener, origin) = listen().await;
    let client = Client::new(&origin, ClientOptions::default()).unwrap();

    let controller = AbortController::new();
    controller.abort();
    let err = client
        .request(RequestOptions::get("/").signal(controller.signal()))
        .await
        .unwrap_err();
    assert!(err.is_aborted());

    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "no connection expected");
    client.destroy(None).await;
}

#[tokio::test]
async fn test_pipelined_responses_keep_wire_order() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        let mut paths = Vec::new();
        for _ in 0..3 {
            let req = read_request(&mut conn).await.unwrap();
            paths.push(req.request_line().split(' ').nth(1).unwrap_or_default().to_string());
        }
        // all three answered in a single write
        let raw = format!(
            "{}{}HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n5\r\nthird\r\n0\r\n\r\n",
            ok("first"),
            ok("second, and longer"),
        );
        respond(&mut conn, &raw).await;
        paths
    });

    let client = Client::new(&origin, ClientOptions::default().pipelining(3)).unwrap();
    let (a, b, c) = within(async {
        tokio::join!(
            text(&client, RequestOptions::get("/1")),
            text(&client, RequestOptions::get("/2")),
            text(&client, RequestOptions::get("/3")),
        )
    })
    .await;

    assert_eq!(a.unwrap(), "first");
    assert_eq!(b.unwrap(), "second, and longer");
    assert_eq!(c.unwrap(), "third");
    assert_eq!(server.await.unwrap(), ["/1", "/2", "/3"]);
    client.destroy(None).await;
}

#[tokio::test]
async fn test_pipelining_limit_and_drain() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();

        // the second request must wait for the first response
        let early = tokio::time::timeout(Duration::from_millis(150), conn.fill_buf()).await;
        assert!(early.is_err(), "second request written too early");

        respond(&mut conn, &ok("one")).await;
        read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("two")).await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let tx1 = tx.clone();
    let full = client.dispatch(RequestOptions::get("/1"), move |res| {
        let _ = tx1.send(res.map(|r| r.status));
    });
    assert!(!full.unwrap());

    let full = client.dispatch(RequestOptions::get("/2"), move |res| {
        let _ = tx.send(res.map(|r| r.status));
    });
    assert!(full.unwrap());
    assert!(client.is_full());

    within(async {
        assert_eq!(rx.recv().await.unwrap().unwrap(), 200);
        assert_eq!(rx.recv().await.unwrap().unwrap(), 200);
        loop {
            if let ClientEvent::Drain = events.recv().await.unwrap() {
                break;
            }
        }
    })
    .await;

    server.await.unwrap();
    assert_eq!(client.size(), 0);
    client.destroy(None).await;
}

#[tokio::test]
async fn test_drain_after_ordinary_traffic() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        respond(&mut conn, "HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n").await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let mut events = client.subscribe();

    within(async {
        let response = client.request(RequestOptions::get("/")).await.unwrap();
        assert_eq!(response.status, 200);
        loop {
            if let ClientEvent::Drain = events.recv().await.unwrap() {
                break;
            }
        }
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_head_response_without_framing_keeps_socket() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        let head = read_request(&mut conn).await.unwrap();
        assert_eq!(head.request_line(), "head / http/1.1");
        respond(&mut conn, "HTTP/1.1 200 OK\r\nx-a: 1\r\n\r\n").await;

        let next = read_request(&mut conn).await.unwrap();
        assert_eq!(next.request_line(), "get / http/1.1");
        respond(&mut conn, &ok("same socket")).await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    within(async {
        let response = client.request(RequestOptions::head("/")).await.unwrap();
        assert!(response.body.is_none());
        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "same socket");
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_head_response_has_no_body() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        let req = read_request(&mut conn).await.unwrap();
        assert!(req.request_line().starts_with("head /"));
        respond(&mut conn, "HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n").await;

        read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("after head")).await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    within(async {
        let response = client.request(RequestOptions::head("/")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get_str("content-length"), Some("100"));
        assert!(response.body.is_none());

        // the connection is still in sync
        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "after head");
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_scalar_body_gets_content_length() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        let req = read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("")).await;
        req
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let response = within(
        client.request(RequestOptions::post("/submit").header("x-trace", "7").body("hello world")),
    )
    .await
    .unwrap();
    assert_eq!(response.status, 200);

    let req = server.await.unwrap();
    assert_eq!(req.request_line(), "post /submit http/1.1");
    assert_eq!(req.header("content-length"), Some("11"));
    assert_eq!(req.header("connection"), Some("keep-alive"));
    assert_eq!(req.header("host"), Some(&origin["http://".len()..]));
    assert_eq!(req.header("x-trace"), Some("7"));
    assert_eq!(req.body, b"hello world");
    client.destroy(None).await;
}

#[tokio::test]
async fn test_stream_body_is_chunked() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        let req = read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("stored")).await;
        req
    });

    let chunks = futures_util::stream::iter(vec![
        Ok::<_, io::Error>(Bytes::from_static(b"ab")),
        Ok(Bytes::new()),
        Ok(Bytes::from_static(b"cde")),
    ]);
    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let body = within(text(&client, RequestOptions::put("/blob").body(RequestBody::stream(chunks))))
        .await
        .unwrap();
    assert_eq!(body, "stored");

    let req = server.await.unwrap();
    assert_eq!(req.header("transfer-encoding"), Some("chunked"));
    assert_eq!(req.header("content-length"), None);
    assert_eq!(req.body, b"abcde");
    client.destroy(None).await;
}

#[tokio::test]
async fn test_stream_body_with_declared_length_mismatch() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        let mut sink = Vec::new();
        let _ = conn.read_to_end(&mut sink).await;
    });

    let chunks = futures_util::stream::iter(vec![Ok::<_, io::Error>("abc")]);
    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let err = within(client.request(
        RequestOptions::post("/")
            .header("content-length", "10")
            .body(RequestBody::stream(chunks)),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, Error::ContentLengthMismatch { expected: 10, actual: 3 }));

    within(server).await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_stream_error_destroys_socket() {
    let (listener, origin) = listen().await;
    let accepted = Arc::new(AtomicUsize::new(0));
    let count = accepted.clone();
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        count.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        let _ = conn.read_to_end(&mut sink).await;

        let mut conn = accept(&listener).await;
        count.fetch_add(1, Ordering::SeqCst);
        read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("recovered")).await;
    });

    let chunks = futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"ab")),
        Err(io::Error::other("producer failed")),
    ]);
    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    within(async {
        let err = client
            .request(RequestOptions::post("/upload").body(RequestBody::stream(chunks)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Body);
        assert!(err.to_string().contains("producer failed"));

        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "recovered");
    })
    .await;

    server.await.unwrap();
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
    client.destroy(None).await;
}

#[tokio::test]
async fn test_close_resolves_queued_requests_first() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        for i in 0..3 {
            read_request(&mut conn).await.unwrap();
            respond(&mut conn, &ok(&format!("r{i}"))).await;
        }
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let (a, b, c, ()) = within(async {
        tokio::join!(
            text(&client, RequestOptions::get("/")),
            text(&client, RequestOptions::get("/")),
            text(&client, RequestOptions::get("/")),
            client.close(),
        )
    })
    .await;

    assert_eq!([a.unwrap(), b.unwrap(), c.unwrap()], ["r0", "r1", "r2"]);
    assert!(client.is_destroyed());
    assert!(matches!(client.dispatch(RequestOptions::get("/"), |_| {}), Err(Error::Destroyed)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_destroy_fails_in_flight_and_queued() {
    let (listener, origin) = listen().await;
    let (seen, got_request) = oneshot::channel();
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        let _ = seen.send(());
        let mut sink = Vec::new();
        let _ = conn.read_to_end(&mut sink).await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let first = client.request(RequestOptions::get("/1"));
    let second = client.request(RequestOptions::get("/2"));

    within(async {
        got_request.await.unwrap();
        client.destroy(None).await;
        assert!(matches!(first.await, Err(Error::Destroyed)));
        assert!(matches!(second.await, Err(Error::Destroyed)));
    })
    .await;

    assert!(client.is_destroyed());
    assert_eq!(client.size(), 0);
    within(server).await.unwrap();
}

#[tokio::test]
async fn test_destroyed_body_resumes_reads() {
    const LARGE: usize = 64 * 1024;

    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        let head = format!("HTTP/1.1 200 OK\r\ncontent-length: {LARGE}\r\n\r\n");
        respond(&mut conn, &head).await;
        conn.get_mut().write_all(&vec![b'x'; LARGE]).await.unwrap();

        read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("next")).await;
    });

    let options = ClientOptions::default().body_high_water_mark(1024);
    let client = Client::new(&origin, options).unwrap();
    within(async {
        let response = client.request(RequestOptions::get("/large")).await.unwrap();
        let mut body = response.body.unwrap();
        assert_eq!(body.content_length(), Some(LARGE as u64));
        assert!(!body.next().await.unwrap().unwrap().is_empty());
        drop(body);

        // served on the same connection once the rest is discarded
        assert_eq!(text(&client, RequestOptions::get("/")).await.unwrap(), "next");
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_abort_while_queued_never_writes() {
    let (listener, origin) = listen().await;
    let (seen, got_request) = oneshot::channel();
    let (go, answer) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        let _ = seen.send(());
        answer.await.unwrap();
        respond(&mut conn, &ok("first")).await;

        let more = tokio::time::timeout(Duration::from_millis(150), conn.fill_buf()).await;
        assert!(more.is_err(), "aborted request reached the wire");
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let controller = AbortController::new();
    let first = client.request(RequestOptions::get("/1"));
    let second = client.request(RequestOptions::get("/2").signal(controller.signal()));

    within(async {
        got_request.await.unwrap();
        assert_eq!(client.size(), 2);
        controller.abort_with("changed my mind");

        let err = second.await.unwrap_err();
        assert_eq!(err.to_string(), "request aborted: changed my mind");
        assert_eq!(client.size(), 1);

        go.send(()).unwrap();
        let response = first.await.unwrap();
        assert_eq!(response.body.unwrap().text().await.unwrap(), "first");
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_abort_in_flight_keeps_correlation() {
    let (listener, origin) = listen().await;
    let (seen, got_request) = oneshot::channel();
    let (go, answer) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        let _ = seen.send(());
        answer.await.unwrap();
        respond(&mut conn, &ok("stale")).await;

        read_request(&mut conn).await.unwrap();
        respond(&mut conn, &ok("fresh")).await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    let controller = AbortController::new();
    let first = client.request(RequestOptions::get("/1").signal(controller.signal()));

    within(async {
        got_request.await.unwrap();
        controller.abort();
        assert!(first.await.unwrap_err().is_aborted());

        let second = client.request(RequestOptions::get("/2"));
        go.send(()).unwrap();
        let body = second.await.unwrap().body.unwrap().text().await.unwrap();
        assert_eq!(body, "fresh");
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

#[tokio::test]
async fn test_trailers_after_body() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        read_request(&mut conn).await.unwrap();
        respond(
            &mut conn,
            "HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\ntrailer: x-checksum\r\n\r\n\
             4\r\ndata\r\n0\r\nX-Checksum: abc\r\n\r\n",
        )
        .await;
    });

    let client = Client::new(&origin, ClientOptions::default()).unwrap();
    within(async {
        let mut response = client.request(RequestOptions::get("/")).await.unwrap();
        let body = response.body.take().unwrap().bytes().await.unwrap();
        assert_eq!(&body[..], b"data");

        let trailers = response.trailers.get().expect("complete");
        assert_eq!(trailers.get_str("x-checksum"), Some("abc"));
    })
    .await;

    server.await.unwrap();
    client.destroy(None).await;
}

struct Refusing {
    attempts: AtomicUsize,
}

impl Connect for Refusing {
    fn connect(&self, _origin: &Origin) -> BoxFuture<'static, io::Result<BoxIo>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err::<BoxIo, _>(io::Error::from(io::ErrorKind::ConnectionRefused)) })
    }
}

#[tokio::test]
async fn test_connect_failures_fail_queue_after_max_attempts() {
    let connector = Arc::new(Refusing { attempts: AtomicUsize::new(0) });
    let options = ClientOptions::default()
        .connector(connector.clone())
        .retry_base(Duration::from_millis(20))
        .max_connect_attempts(2);
    let client = Client::new("http://example.invalid", options).unwrap();
    let mut events = client.subscribe();

    let err = within(client.request(RequestOptions::get("/"))).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);

    for _ in 0..2 {
        let event = events.recv().await.unwrap();
        assert!(matches!(event, ClientEvent::ConnectFailed { .. }));
    }
    client.destroy(None).await;
}

#[tokio::test]
async fn test_client_from_toml_config() {
    let (listener, origin) = listen().await;
    let server = tokio::spawn(async move {
        let mut conn = accept(&listener).await;
        for _ in 0..2 {
            read_request(&mut conn).await.unwrap();
        }
        respond(&mut conn, &format!("{}{}", ok("a"), ok("b"))).await;
    });

    let options = ClientOptions::from_toml_str("pipelining = 2\nidle_timeout_ms = 2000\n").unwrap();
    let client = Client::new(&origin, options).unwrap();
    assert_eq!(client.pipelining(), 2);

    let (a, b) = within(async {
        tokio::join!(text(&client, RequestOptions::get("/a")), text(&client, RequestOptions::get("/b")))
    })
    .await;
    assert_eq!((a.unwrap(), b.unwrap()), ("a".to_string(), "b".to_string()));

    server.await.unwrap();
    client.destroy(None).await;
}
