use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use clap::Parser;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use thinkbridge_rs::cli::Cli;
use thinkbridge_rs::config::{load_config, AppConfig};
use thinkbridge_rs::observability::init_tracing;
use thinkbridge_rs::routing::dispatch::dispatch_request;
use thinkbridge_rs::state::AppState;
use thinkbridge_rs::transport::HttpTransport;

fn main() {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config).unwrap_or_else(|e| {
        eprintln!("Failed to load configuration from '{}': {e}", cli.config);
        eprintln!("Please copy 'config.example.yaml' to 'config.yaml' and modify as needed.");
        std::process::exit(1);
    });
    cli.apply(&mut config);

    init_tracing(&config.features.log_level);
    let runtime = build_runtime(&config);

    runtime.block_on(async move {
        run(config).await;
    });
}

fn build_runtime(config: &AppConfig) -> tokio::runtime::Runtime {
    let worker_threads = config.server.runtime_worker_threads;
    let mut runtime_builder = if worker_threads == Some(1) {
        tokio::runtime::Builder::new_current_thread()
    } else {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        if let Some(threads) = worker_threads {
            builder.worker_threads(threads);
        }
        builder
    };
    runtime_builder.enable_io();
    runtime_builder.enable_time();
    runtime_builder.build().unwrap_or_else(|e| {
        eprintln!("Failed to initialize Tokio runtime: {e}");
        std::process::exit(1);
    })
}

async fn run(config: AppConfig) {
    let host = config.server.host.clone();
    let port = config.server.port;

    let transport = HttpTransport::new(&config.server);
    let state = match AppState::new(config, transport) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            eprintln!("Failed to initialize proxy: {err}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "thinkbridge starting on {}:{} -> {} (reasoning_mode={}, debug_exchanges={})",
        host,
        port,
        state.upstream.base_url(),
        state.config.features.reasoning_mode,
        state.config.features.debug_exchanges
    );

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}"))
        .await
        .unwrap_or_else(|err| {
            eprintln!("Failed to bind to {host}:{port}: {err}");
            std::process::exit(1);
        });

    tracing::info!("thinkbridge is ready to accept connections");
    serve_accept_loop(listener, AutoBuilder::new(TokioExecutor::new()), state).await;
}

async fn serve_accept_loop(
    listener: tokio::net::TcpListener,
    conn_builder: AutoBuilder<TokioExecutor>,
    dispatch_state: Arc<AppState>,
) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok((stream, remote_addr)) => (stream, remote_addr),
            Err(err) => {
                tracing::warn!("accept error: {err}");
                continue;
            }
        };

        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!("failed to enable TCP_NODELAY for {remote_addr}: {err}");
        }

        let io = TokioIo::new(stream);
        let conn_builder = conn_builder.clone();
        let request_state = Arc::clone(&dispatch_state);
        let hyper_service = service_fn(move |request: Request<Incoming>| {
            dispatch_request(Arc::clone(&request_state), request.map(Body::new))
        });

        tokio::spawn(async move {
            if let Err(err) = conn_builder.serve_connection(io, hyper_service).await {
                tracing::debug!("failed to serve connection from {remote_addr}: {err:#}");
            }
        });
    }
}
