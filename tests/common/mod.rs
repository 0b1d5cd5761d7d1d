//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use nano_web::config::ServerConfig;
use nano_web::http::{EventStreamRegistry, HttpServer};
use nano_web::lifecycle::Shutdown;
use nano_web::net::Listener;
use nano_web::routing::Router;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub events: EventStreamRegistry,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

/// Start a server on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(config: ServerConfig, router: Router) -> TestServer {
    spawn_server(HttpServer::new(config, router)).await
}

/// Start `server` on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_server(server: HttpServer) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let events = server.events().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move {
        let _ = server.run(Listener::from(listener), server_shutdown).await;
    });

    TestServer {
        addr,
        events,
        shutdown,
        handle,
    }
}

/// Read until `needle` shows up or the peer closes.
#[allow(dead_code)]
pub async fn read_until<S: AsyncRead + Unpin>(stream: &mut S, needle: &str) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    tokio::time::timeout(IO_TIMEOUT, async {
        while !String::from_utf8_lossy(&buf).contains(needle) {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    })
    .await
    .expect("timed out waiting for server output");
    String::from_utf8_lossy(&buf).into_owned()
}

/// Read everything until the server closes the connection.
pub async fn read_to_close<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    tokio::time::timeout(IO_TIMEOUT, async {
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
    })
    .await
    .expect("timed out waiting for the server to close");
    String::from_utf8_lossy(&buf).into_owned()
}

/// Send raw bytes and collect the whole response.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    read_to_close(&mut stream).await
}

/// Split a response into head and body.
#[allow(dead_code)]
pub fn split_response(raw: &str) -> (&str, &str) {
    raw.split_once("\r\n\r\n").unwrap_or((raw, ""))
}
