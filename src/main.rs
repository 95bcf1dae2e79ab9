//! PdfPair server binary.
//!
//! Accepts PDF uploads over HTTP, stores each upload in one of two fixed
//! slots (`pdf_a.pdf`, `pdf_b.pdf`), forwards the stored file to an external
//! analysis service, and serves a listing of stored files. The main entry
//! point builds the Axum router and starts the HTTP listener.

mod analyze;
mod background;
mod config;
mod error;
mod files;
mod http;
mod logging;
mod slots;
mod storage;
mod upload;
mod version;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{get, post};
use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, info_span};

use crate::analyze::Analyzer;
use crate::background::spawn_background_tasks;
use crate::config::Args;
use crate::slots::SlotAllocator;
use crate::storage::Storage;

shadow!(build);

/// Starts the PdfPair server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(args.storage_dir.clone())));
    storage.ensure_root().await?;
    info!(root = ?storage.root_path(), "storage directory ready");
    let allocator = Arc::new(SlotAllocator::new(storage.clone()));
    let analyzer = Arc::new(Analyzer::new(args.analyzer_url.clone()));

    let mut app = Router::new()
        .route("/upload", post(upload::upload_file))
        .route("/files", get(files::list_files))
        .route("/version", get(version::get_version_info))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip());
                    let client_ip = http::resolve_client_ip(request.headers(), connect_ip)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(http::build_cors_layer(args.cors_origins.as_deref()))
        .layer(Extension(storage.clone()))
        .layer(Extension(allocator))
        .layer(Extension(analyzer));
    app = if args.upload_max_size > 0 {
        app.layer(DefaultBodyLimit::max(args.upload_max_size as usize))
    } else {
        app.layer(DefaultBodyLimit::disable())
    };

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!("🚀 Starting HTTP server at {}", addr);

    spawn_background_tasks(storage, Duration::from_secs(args.temp_ttl_secs));

    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => result?,
        _ = shutdown_signal(handle) => {}
    }

    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
