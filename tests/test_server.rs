use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use plainhttp::handler::{Context, EchoHandler, FileServer, Logger, Recovery, RedirectToHttps};
use plainhttp::http::parser::ParserConfig;
use plainhttp::http::response::StatusCode;
use plainhttp::router::Router;
use plainhttp::server::listener::Incoming;
use plainhttp::server::{Server, ServerOptions, listener};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::io::DuplexStream;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

struct Reply {
    version: String,
    status: u16,
    reason: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Reply {
    fn parse(raw: &[u8]) -> Reply {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("no header terminator");
        let head = std::str::from_utf8(&raw[..split]).unwrap();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let mut status_line = lines.next().unwrap().splitn(3, ' ');
        let version = status_line.next().unwrap().to_string();
        let status = status_line.next().unwrap().parse().unwrap();
        let reason = status_line.next().unwrap_or_default().to_string();

        let headers = lines
            .map(|line| {
                let (k, v) = line.split_once(": ").unwrap();
                (k.to_string(), v.to_string())
            })
            .collect();

        Reply {
            version,
            status,
            reason,
            headers,
            body,
        }
    }

    fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }
}

async fn start(server: Server) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(listener::run(listener, Arc::new(server)));
    addr
}

async fn send(addr: SocketAddr, raw: &[u8]) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw).await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    Reply::parse(&buf)
}

async fn request(addr: SocketAddr, method: &str, target: &str) -> Reply {
    send(addr, format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes()).await
}

fn panics(_: &mut Context) {
    panic!("I'm panic!");
}

fn panics_quietly(_: &mut Context) {
    panic!("no recovery here");
}

fn demo_router() -> Router {
    let mut r = Router::new("/");
    r.use_middleware(Logger).use_middleware(Recovery::new(true));

    r.get("/hello", |c: &mut Context| c.response_text(StatusCode::Ok, "/hello"))
        .unwrap();
    r.post("/hello", |c: &mut Context| c.response_text(StatusCode::Ok, "POST"))
        .unwrap();
    r.get("/hello/", |c: &mut Context| c.response_text(StatusCode::Ok, "/hello/"))
        .unwrap();
    r.get("/hello/world/", |c: &mut Context| c.response_html(StatusCode::Ok, "/hello/world/"))
        .unwrap();
    r.any("/panic", panics).unwrap();
    r.get("/echo/", EchoHandler).unwrap();
    r
}

#[tokio::test]
async fn test_prefix_router_end_to_end() {
    let addr = start(Server::new(demo_router())).await;

    let cases = [
        ("GET", "/", 404, ""),
        ("GET", "/whatever", 404, ""),
        ("GET", "/hello", 200, "/hello"),
        ("GET", "/hello?x=1", 200, "/hello"),
        ("POST", "/hello", 200, "POST"),
        ("GET", "/hello/", 200, "/hello/"),
        ("GET", "/hello/?x=1", 200, "/hello/"),
        ("GET", "/hello/world", 200, "/hello/"),
        ("GET", "/hello/world/", 200, "/hello/world/"),
        ("GET", "/hello/world/?x=1", 200, "/hello/world/"),
        ("GET", "/hello/world/foo", 200, "/hello/world/"),
        ("GET", "/hello/world/foo/bar?x=1", 200, "/hello/world/"),
        ("DELETE", "/hello", 405, ""),
        ("GET", "/panic", 500, "panic: I'm panic!"),
    ];

    for (method, target, status, body) in cases {
        let reply = request(addr, method, target).await;
        assert_eq!(reply.status, status, "{method} {target}");
        assert_eq!(reply.text(), body, "{method} {target}");
        assert_eq!(reply.header("Content-Length"), Some(body.len().to_string().as_str()));
    }
}

#[tokio::test]
async fn test_response_echoes_request_version() {
    let addr = start(Server::new(demo_router())).await;

    let reply = send(addr, b"GET /hello HTTP/1.0\r\n\r\n").await;

    assert_eq!(reply.version, "HTTP/1.0");
    assert_eq!(reply.reason, "OK");
    assert_eq!(reply.header("Content-Type"), Some("text/plain; charset=utf-8"));
}

#[tokio::test]
async fn test_echo_handler() {
    let addr = start(Server::new(demo_router())).await;

    let reply = send(addr, b"POST /echo/x HTTP/1.1\r\nContent-Length: 4\r\n\r\nping").await;

    // the route is GET only
    assert_eq!(reply.status, 405);

    let req = b"GET /echo/x?y=1 HTTP/1.1\r\nX-Test: yes\r\nContent-Length: 4\r\n\r\nping";
    let reply = send(addr, req).await;
    assert_eq!(reply.status, 200);
    let text = reply.text();
    assert!(text.starts_with("GET /echo/x?y=1 HTTP/1.1\r\n"));
    assert!(text.contains("X-Test: yes\r\n"));
    assert!(text.ends_with("\r\n\r\nping"));
}

#[tokio::test]
async fn test_malformed_request_gets_400() {
    let addr = start(Server::new(demo_router())).await;

    let reply = send(addr, b"GET /hello\r\n\r\n").await;

    assert_eq!(reply.version, "HTTP/1.0");
    assert_eq!(reply.status, 400);
    assert_eq!(reply.header("Content-Length"), Some("0"));
}

#[tokio::test]
async fn test_stalled_headers_get_400_after_timeout() {
    let options = ServerOptions {
        parser: ParserConfig {
            line_timeout: Duration::from_millis(100),
            ..ParserConfig::default()
        },
        ..ServerOptions::default()
    };
    let addr = start(Server::new(demo_router()).with_options(options)).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /hello HTTP/1.1\r\nHost: x\r\n").await.unwrap();

    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("server did not give up on the stalled request")
        .unwrap();

    assert_eq!(Reply::parse(&buf).status, 400);
}

#[tokio::test]
async fn test_unrecovered_panic_is_contained() {
    let server = Arc::new(Server::new(panics_quietly));

    let (mut client, conn) = tokio::io::duplex(4096);
    let task = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.serve_connection(conn).await }
    });

    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();

    let reply = Reply::parse(&buf);
    assert_eq!(reply.status, 500);
    assert_eq!(reply.text(), "panic: no recovery here");

    let joined = task.await;
    assert!(joined.unwrap_err().is_panic());

    // the server keeps serving other connections
    let (mut client, conn) = tokio::io::duplex(4096);
    let task = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.serve_connection(conn).await }
    });
    client.write_all(b"GET /\r\n\r\n").await.unwrap();
    let mut buf = Vec::new();
    client.read_to_end(&mut buf).await.unwrap();

    assert_eq!(Reply::parse(&buf).status, 400);
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_unrecovered_panic_message_hidden_without_debug() {
    let options = ServerOptions {
        debug_panic_response: false,
        ..ServerOptions::default()
    };
    let addr = start(Server::new(panics_quietly).with_options(options)).await;

    let reply = request(addr, "GET", "/").await;

    assert_eq!(reply.status, 500);
    assert_eq!(reply.text(), "500 Internal Server Error");
    assert!(!reply.text().contains("no recovery here"));

    // the accept loop survived the panicking connection
    assert_eq!(request(addr, "GET", "/").await.status, 500);
}

#[tokio::test]
async fn test_redirect_to_https() {
    let mut router = Router::new("/");
    router.any("/", RedirectToHttps::new(8443)).unwrap();
    let addr = start(Server::new(router)).await;

    let reply = send(addr, b"GET /a/b?c=1 HTTP/1.1\r\nHost: example.com:8080\r\n\r\n").await;
    assert_eq!(reply.status, 301);
    assert_eq!(reply.header("Location"), Some("https://example.com:8443/a/b?c=1"));

    let reply = send(addr, b"GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status, 400);
}

/// Connections (or accept failures) handed in by the test.
struct Scripted(mpsc::Receiver<io::Result<(DuplexStream, SocketAddr)>>);

impl Incoming for Scripted {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<(DuplexStream, SocketAddr)> {
        match self.0.recv().await {
            Some(next) => next,
            None => std::future::pending().await,
        }
    }
}

#[tokio::test]
async fn test_accept_errors_do_not_stop_the_listener() {
    let (tx, rx) = mpsc::channel(8);
    let accept_loop = tokio::spawn(listener::serve_incoming(
        Scripted(rx),
        Arc::new(Server::new(demo_router())),
    ));
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

    // EMFILE, then a peer that hung up mid-handshake
    tx.send(Err(io::Error::from_raw_os_error(24))).await.unwrap();
    tx.send(Err(io::ErrorKind::ConnectionAborted.into())).await.unwrap();

    let (mut client, conn) = tokio::io::duplex(4096);
    tx.send(Ok((conn, peer))).await.unwrap();

    client.write_all(b"GET /hello HTTP/1.1\r\n\r\n").await.unwrap();
    let mut buf = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), client.read_to_end(&mut buf))
        .await
        .expect("listener stopped accepting after errors")
        .unwrap();

    let reply = Reply::parse(&buf);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.text(), "/hello");
    assert!(!accept_loop.is_finished());
    accept_loop.abort();
}

mod static_files {
    use super::*;

    struct Site {
        addr: SocketAddr,
        _dir: tempfile::TempDir,
    }

    async fn site() -> Site {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello world").unwrap();
        std::fs::write(dir.path().join("index.html"), b"<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("empty.bin"), b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut router = Router::new("/");
        router.get("/static/", FileServer::new(dir.path(), "/static/")).unwrap();
        let addr = start(Server::new(router)).await;

        Site { addr, _dir: dir }
    }

    async fn ranged(addr: SocketAddr, target: &str, range: &str) -> Reply {
        send(
            addr,
            format!("GET {target} HTTP/1.1\r\nRange: {range}\r\n\r\n").as_bytes(),
        )
        .await
    }

    #[tokio::test]
    async fn test_whole_file() {
        let site = site().await;

        let reply = request(site.addr, "GET", "/static/a.txt?v=2").await;

        assert_eq!(reply.status, 200);
        assert_eq!(reply.text(), "hello world");
        assert_eq!(reply.header("Content-Type"), Some("text/plain"));
        assert_eq!(reply.header("Content-Length"), Some("11"));
        assert_eq!(reply.header("Accept-Ranges"), None);
    }

    #[tokio::test]
    async fn test_index_file() {
        let site = site().await;

        let reply = request(site.addr, "GET", "/static/").await;

        assert_eq!(reply.status, 200);
        assert_eq!(reply.text(), "<h1>home</h1>");
        assert_eq!(reply.header("Content-Type"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_partial_content() {
        let site = site().await;

        let reply = ranged(site.addr, "/static/a.txt", "bytes=0-4").await;
        assert_eq!(reply.status, 206);
        assert_eq!(reply.text(), "hello");
        assert_eq!(reply.header("Content-Range"), Some("bytes 0-4/11"));
        assert_eq!(reply.header("Accept-Ranges"), Some("bytes"));

        let reply = ranged(site.addr, "/static/a.txt", "bytes=-5").await;
        assert_eq!(reply.status, 206);
        assert_eq!(reply.text(), "world");
        assert_eq!(reply.header("Content-Range"), Some("bytes 6-10/11"));

        let reply = ranged(site.addr, "/static/a.txt", "bytes=6-").await;
        assert_eq!(reply.text(), "world");
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let site = site().await;

        let reply = ranged(site.addr, "/static/a.txt", "bytes=20-30").await;

        assert_eq!(reply.status, 416);
        assert_eq!(reply.header("Content-Range"), Some("bytes */11"));
    }

    #[tokio::test]
    async fn test_malformed_range() {
        let site = site().await;

        let reply = ranged(site.addr, "/static/a.txt", "lines=1-2").await;

        assert_eq!(reply.status, 400);
    }

    #[tokio::test]
    async fn test_zero_length_range() {
        let site = site().await;

        let reply = ranged(site.addr, "/static/a.txt", "bytes=5-4").await;

        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Length"), Some("0"));
        assert!(reply.body.is_empty());
    }

    #[tokio::test]
    async fn test_empty_file() {
        let site = site().await;

        let reply = request(site.addr, "GET", "/static/empty.bin").await;

        assert_eq!(reply.status, 200);
        assert_eq!(reply.header("Content-Length"), Some("0"));
        assert_eq!(reply.header("Content-Type"), Some("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let site = site().await;

        assert_eq!(request(site.addr, "GET", "/static/nope.txt").await.status, 404);
    }

    #[tokio::test]
    async fn test_directory_is_not_a_file() {
        let site = site().await;

        let reply = request(site.addr, "GET", "/static/sub").await;

        assert_eq!(reply.status, 403);
        assert_eq!(reply.text(), "not a file");
    }

    #[tokio::test]
    async fn test_parent_segments_refused() {
        let site = site().await;

        let reply = request(site.addr, "GET", "/static/../a.txt").await;

        assert_eq!(reply.status, 403);
    }
}
