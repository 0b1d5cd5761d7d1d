use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;

use nano_web::config::{load_config, ServerConfig};
use nano_web::http::{EventStreamRegistry, HandlerError, HttpServer, PushOutcome};
use nano_web::lifecycle::{shutdown_on_signal, Shutdown};
use nano_web::net::{load_tls_acceptor, Listener};
use nano_web::observability::{logging, metrics};
use nano_web::routing::Router;
use nano_web::security::{rate_limit_middleware, RateLimiter};

#[derive(Parser)]
#[command(name = "nano-web")]
#[command(about = "Minimal HTTP/1.1 server with Server-Sent-Events streams", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

fn demo_routes(router: Router, events: EventStreamRegistry) -> Router {
    let health_events = events.clone();

    router
        .get("/health", move |_req, res| {
            res.json(200, &json!({ "status": "ok", "streams": health_events.len() }));
            Ok(())
        })
        .get("/hello/:name", |req, res| {
            let name = req.param("name").unwrap_or("stranger");
            res.text(200, &format!("Hello, {name}!"));
            Ok(())
        })
        .nest(
            "/events",
            Router::new()
                .get("/:id", |req, res| {
                    let id = req
                        .param("id")
                        .ok_or_else(|| HandlerError::new("missing stream id"))?;
                    res.stream_events(id);
                    Ok(())
                })
                .post("/:id", move |req, res| {
                    let id = req.param("id").unwrap_or_default();
                    let message = String::from_utf8_lossy(req.body()).into_owned();
                    let outcome = events.send(id, message);
                    let status = if outcome == PushOutcome::Unknown { 404 } else { 202 };
                    res.json(status, &json!({ "outcome": format!("{outcome:?}").to_lowercase() }));
                    Ok(())
                }),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(config.observability.log_format);
    tracing::info!("nano-web v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        read_timeout_secs = ?config.timeouts.read_secs,
        write_timeout_secs = ?config.timeouts.write_secs,
        max_request_size = ?config.limits.max_request_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let events = EventStreamRegistry::new(config.streams.channel_capacity);

    let mut app = Router::new();
    if config.rate_limit.enabled {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        limiter.spawn_cleanup(shutdown.subscribe());
        app = app.layer(rate_limit_middleware(limiter));
    }
    let app = demo_routes(app, events.clone());

    let acceptor = config.tls.as_ref().map(load_tls_acceptor).transpose()?;
    let listener = Listener::bind(&config.listener).await?;
    let mut server = HttpServer::with_events(config, app, events);
    if let Some(acceptor) = acceptor {
        server = server.with_tls(acceptor);
    }

    let signals = shutdown.clone();
    tokio::spawn(async move { shutdown_on_signal(&signals).await });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
