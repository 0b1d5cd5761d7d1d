//! HTTP server: accept loop and per-connection supervisor.
//!
//! # Responsibilities
//! - Accept connections and spawn one task per connection
//! - Arm deadlines, complete the optional TLS handshake
//! - Parse, resolve, execute the handler chain, respond
//! - Hand event-stream responses to a dedicated streaming task
//! - Stop accepting on shutdown, close streams and drain connections
//!
//! # Design Decisions
//! - The route tree is immutable and shared through `Arc` without locking
//! - One response per connection; the connection is closed after it
//! - A malformed request line or header block drops the connection silently
//! - The supervisor is generic over the byte stream, so plain TCP and TLS
//!   connections share one code path

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::http::error::{HandlerError, HANDLER_FAILURE_STATUS};
use crate::http::event_stream::{EventStream, EventStreamRegistry};
use crate::http::parser::{parse_head, read_body};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{pump_events, write_response, write_stream_head};
use crate::net::{ConnectionGuard, ConnectionState, ConnectionTracker, Deadlines, Listener};
use crate::observability::metrics;
use crate::routing::{resolve, Router, Step};
use crate::security::headers;

struct Shared {
    root: Router,
    config: ServerConfig,
    events: EventStreamRegistry,
    tracker: ConnectionTracker,
}

/// Result of running a resolved chain.
enum ChainOutcome {
    Completed,
    Failed(HandlerError),
    /// The body was refused with a client error before the route ran.
    Rejected { status: u16, message: String },
    /// The body could not be read; drop the connection without a response.
    Dropped,
}

/// The HTTP server.
pub struct HttpServer {
    shared: Arc<Shared>,
    tls: Option<TlsAcceptor>,
}

impl HttpServer {
    /// Create a server for `router`, with a fresh event-stream registry.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let events = EventStreamRegistry::new(config.streams.channel_capacity);
        Self::with_events(config, router, events)
    }

    /// Create a server that shares an existing registry with application code.
    pub fn with_events(config: ServerConfig, router: Router, events: EventStreamRegistry) -> Self {
        Self {
            shared: Arc::new(Shared {
                root: router,
                config,
                events,
                tracker: ConnectionTracker::new(),
            }),
            tls: None,
        }
    }

    /// Terminate TLS on every accepted connection.
    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    pub fn events(&self) -> &EventStreamRegistry {
        &self.shared.events
    }

    pub fn config(&self) -> &ServerConfig {
        &self.shared.config
    }

    pub fn connections(&self) -> &ConnectionTracker {
        &self.shared.tracker
    }

    /// Run the accept loop until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, tls = self.tls.is_some(), "HTTP server starting");

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let shared = Arc::clone(&self.shared);
                        let tls = self.tls.clone();
                        tokio::spawn(serve_connection(shared, tls, stream, peer));
                    }
                    Err(e) => tracing::warn!(error = %e, "Accept failed"),
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        let closed = self.shared.events.close_all();
        let drain = Duration::from_secs(self.shared.config.timeouts.drain_secs);
        tracing::info!(
            streams_closed = closed,
            active_connections = self.shared.tracker.active_count(),
            "Draining connections"
        );
        if !self.shared.tracker.wait_for_drain(drain).await {
            tracing::warn!(
                active_connections = self.shared.tracker.active_count(),
                "Drain timed out"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn serve_connection(
    shared: Arc<Shared>,
    tls: Option<TlsAcceptor>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let mut guard = shared.tracker.track();
    let span = tracing::debug_span!("connection", id = %guard.id(), peer = %peer);

    async move {
        let deadlines = Deadlines::arm(&shared.config.timeouts);
        if deadlines.is_armed() {
            guard.transition(ConnectionState::TimeoutsArmed);
        }

        let Some(acceptor) = tls else {
            return supervise(shared, stream, peer, guard, deadlines).await;
        };
        match deadlines.read(acceptor.accept(stream)).await {
            Ok(Ok(stream)) => supervise(shared, stream, peer, guard, deadlines).await,
            Ok(Err(e)) => {
                guard.transition(ConnectionState::ParseFailed);
                tracing::debug!(error = %e, "TLS handshake failed");
            }
            Err(e) => {
                guard.transition(ConnectionState::ParseFailed);
                tracing::debug!(error = %e, "TLS handshake timed out");
            }
        }
    }
    .instrument(span)
    .await
}

async fn supervise<S>(
    shared: Arc<Shared>,
    stream: S,
    peer: SocketAddr,
    mut guard: ConnectionGuard,
    deadlines: Deadlines,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let config = &shared.config;

    let (read_half, mut writer) = tokio::io::split(stream);
    let cap = config.limits.max_request_size.unwrap_or(u64::MAX);
    let mut reader = BufReader::new(read_half.take(cap));

    let head_limits = config.limits.head_limits();
    let mut req = match deadlines.read(parse_head(&mut reader, head_limits)).await {
        Ok(Ok(req)) => req,
        Ok(Err(e)) => {
            guard.transition(ConnectionState::ParseFailed);
            tracing::debug!(error = %e, "Dropping connection");
            return;
        }
        Err(e) => {
            guard.transition(ConnectionState::ParseFailed);
            tracing::debug!(error = %e, "Dropping connection");
            return;
        }
    };
    req.peer_addr = Some(peer);
    guard.transition(ConnectionState::Parsed);

    let start = Instant::now();
    let mut res = Response::new();

    if let Some(cors) = &config.cors {
        cors.apply(&req, &mut res);
    }

    if req.method == "OPTIONS" {
        res.status = 204;
        res.body = None;
        guard.transition(ConnectionState::Executed);
        respond(config, &req, &mut res, &mut writer, &deadlines, start).await;
        return;
    }

    let Some(chain) = resolve(&shared.root, &mut req) else {
        guard.transition(ConnectionState::NotFound);
        tracing::debug!(method = %req.method, path = %req.path, "No route matched");
        res.api_error(404, "Unknown route.");
        respond(config, &req, &mut res, &mut writer, &deadlines, start).await;
        return;
    };
    guard.transition(ConnectionState::Resolved);

    let body_limit = config.limits.body_limit();
    match execute(&chain, &mut req, &mut res, &mut reader, &deadlines, body_limit).await {
        ChainOutcome::Completed => {}
        ChainOutcome::Failed(err) => {
            guard.transition(ConnectionState::Executed);
            log_failure(&req, &err);
            res.api_error(HANDLER_FAILURE_STATUS, err.message());
            respond(config, &req, &mut res, &mut writer, &deadlines, start).await;
            return;
        }
        ChainOutcome::Rejected { status, message } => {
            guard.transition(ConnectionState::Executed);
            res.api_error(status, &message);
            respond(config, &req, &mut res, &mut writer, &deadlines, start).await;
            return;
        }
        ChainOutcome::Dropped => {
            guard.transition(ConnectionState::ParseFailed);
            return;
        }
    }

    match res.take_event_stream() {
        Some(identifier) => {
            guard.transition(ConnectionState::Streaming);
            res.headers.add("X-Accel-Buffering", "no");
            metrics::record_request(&req.method, res.status, start);
            let registry = shared.events.clone();
            let stream = registry.open(&identifier);
            tracing::debug!(stream = %identifier, path = %req.path, "Event stream opened");

            let task = stream_task(registry, stream, res, writer, deadlines, guard);
            tokio::spawn(task.instrument(tracing::Span::current()));
        }
        None => {
            guard.transition(ConnectionState::Executed);
            respond(config, &req, &mut res, &mut writer, &deadlines, start).await;
        }
    }
}

/// Run the chain in order; the body is read right before the route runs.
async fn execute<R>(
    chain: &[Step<'_>],
    req: &mut Request,
    res: &mut Response,
    reader: &mut R,
    deadlines: &Deadlines,
    body_limit: u64,
) -> ChainOutcome
where
    R: AsyncBufRead + Unpin,
{
    for step in chain {
        match step {
            Step::Middleware(middleware) => {
                if let Err(err) = (middleware.handler)(req, res) {
                    return ChainOutcome::Failed(err);
                }
            }
            Step::Route(route) => {
                match deadlines.read(read_body(reader, &req.headers, body_limit)).await {
                    Ok(Ok(body)) => req.body = Some(body),
                    Ok(Err(e)) => match e.status() {
                        Some(status) => {
                            tracing::debug!(error = %e, "Rejecting request body");
                            return ChainOutcome::Rejected {
                                status,
                                message: e.to_string(),
                            };
                        }
                        None => {
                            tracing::debug!(error = %e, "Dropping connection");
                            return ChainOutcome::Dropped;
                        }
                    },
                    Err(e) => {
                        tracing::debug!(error = %e, "Dropping connection");
                        return ChainOutcome::Dropped;
                    }
                }

                return match (route.handler)(req, res) {
                    Ok(()) => ChainOutcome::Completed,
                    Err(err) => ChainOutcome::Failed(err),
                };
            }
        }
    }
    ChainOutcome::Completed
}

fn log_failure(req: &Request, err: &HandlerError) {
    let source = std::error::Error::source(err).map(ToString::to_string);
    tracing::warn!(
        method = %req.method,
        path = %req.path,
        error = %err,
        source = ?source,
        "Handler failed"
    );
}

/// Write a normal response and close the connection.
async fn respond<W>(
    config: &ServerConfig,
    req: &Request,
    res: &mut Response,
    writer: &mut W,
    deadlines: &Deadlines,
    start: Instant,
) where
    W: AsyncWrite + Unpin,
{
    if config.security.headers {
        headers::apply(res);
    }

    let written = deadlines
        .write(async {
            write_response(writer, res).await?;
            writer.shutdown().await?;
            Ok::<_, std::io::Error>(())
        })
        .await;

    match written {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Response write failed"),
        Err(e) => tracing::debug!(error = %e, "Response write failed"),
    }

    metrics::record_request(&req.method, res.status, start);
    tracing::debug!(
        method = %req.method,
        path = %req.path,
        status = res.status,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );
}

/// Hold the connection open and forward pushed messages until the stream
/// closes or a write fails.
async fn stream_task<W>(
    registry: EventStreamRegistry,
    mut stream: EventStream,
    res: Response,
    mut writer: W,
    deadlines: Deadlines,
    mut guard: ConnectionGuard,
) where
    W: AsyncWrite + Unpin,
{
    match deadlines.write(write_stream_head(&mut writer, &res)).await {
        Ok(Ok(())) => match pump_events(&mut writer, &mut stream).await {
            Ok(frames) => tracing::debug!(stream = %stream.identifier(), frames, "Event stream closed"),
            Err(e) => tracing::debug!(stream = %stream.identifier(), error = %e, "Event stream write failed"),
        },
        Ok(Err(e)) => tracing::debug!(error = %e, "Event stream head write failed"),
        Err(e) => tracing::debug!(error = %e, "Event stream head write failed"),
    }

    registry.release(&stream);
    let _ = writer.shutdown().await;
    guard.close();
}
