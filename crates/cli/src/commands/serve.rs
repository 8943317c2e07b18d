use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    handler::Handler,
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use sitekit_core::{SiteConfig, load_site_config};
use sitekit_generator::{BuildOptions, BuildReport, build_site};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Served when the built 404 page cannot be read
const FALLBACK_NOT_FOUND: &str = "<!doctype html><title>Not Found</title><h1>Not Found</h1>";

/// Quiet period after a change before rebuilding, so editor save bursts
/// trigger a single build
const REBUILD_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Clone)]
struct AppState {
    reload_tx: broadcast::Sender<()>,
    not_found: Arc<RwLock<String>>,
}

/// Start preview server with live reload for local development.
///
/// This command:
/// - Builds the site with the reload script injected
/// - Serves the output directory, answering unknown paths with the 404 page
/// - Watches the site for changes, rebuilds and notifies open pages
pub async fn run(path: PathBuf, port: Option<u16>) -> Result<()> {
    println!("🌐 Starting preview server...");
    println!("   Site: {}", path.display());

    // Validate site directory exists
    if !path.exists() {
        anyhow::bail!(
            "Site directory does not exist: {}\nRun 'sitekit init {}' first",
            path.display(),
            path.display()
        );
    }

    // Watcher events carry absolute paths
    let root = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let config = load_site_config(&root).context("Failed to load site.toml")?;

    let report = build_site(&root, &config, BuildOptions { preview: true })
        .context("Initial build failed")?;
    println!("   ✓ Pages: {}", report.pages);
    println!("   ✓ Tags: {}", report.tags.len());

    let output = config.output_dir(&root);
    let not_found = Arc::new(RwLock::new(read_not_found(&output, &config)));

    // Create broadcast channel for reload events
    let (reload_tx, _) = broadcast::channel::<()>(100);

    let state = AppState {
        reload_tx: reload_tx.clone(),
        not_found: not_found.clone(),
    };
    let app = router(&output, state);

    // Start file watcher
    let watch = SiteWatch {
        root,
        config: config.clone(),
        not_found,
        reload_tx,
    };
    tokio::spawn(async move {
        if let Err(e) = watch_files(watch).await {
            error!("File watcher error: {:#}", e);
        }
    });

    // Start server
    let port = port.unwrap_or(config.server.port);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("\n🚀 Preview ready at: http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to port")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn router(output: &Path, state: AppState) -> Router {
    let not_found = not_found_handler.with_state(state.clone());

    Router::new()
        .route("/_reload", get(sse_handler))
        .fallback_service(ServeDir::new(output).not_found_service(not_found))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn read_not_found(output: &Path, config: &SiteConfig) -> String {
    let path = output.join(&config.server.not_found_page);
    std::fs::read_to_string(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), "cannot read 404 page: {}", e);
        FALLBACK_NOT_FOUND.to_string()
    })
}

struct SiteWatch {
    root: PathBuf,
    config: SiteConfig,
    not_found: Arc<RwLock<String>>,
    reload_tx: broadcast::Sender<()>,
}

/// Whether a changed path should trigger a rebuild
fn is_source_change(path: &Path, output: &Path) -> bool {
    if path.starts_with(output) {
        return false;
    }
    let filename = path.file_name().unwrap_or_default().to_string_lossy();
    !filename.starts_with('.') && !filename.ends_with('~')
}

/// Preview build on the blocking pool, off the runtime workers
async fn rebuild(root: &Path, config: &SiteConfig) -> Result<BuildReport> {
    let root = root.to_path_buf();
    let config = config.clone();
    let report = tokio::task::spawn_blocking(move || {
        build_site(&root, &config, BuildOptions { preview: true })
    })
    .await
    .context("Rebuild task failed")??;
    Ok(report)
}

/// Watch for file changes, rebuild and trigger reload
async fn watch_files(watch: SiteWatch) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut watcher =
        notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        })?;

    // Watch site directory recursively
    watcher.watch(&watch.root, RecursiveMode::Recursive)?;

    let output = watch.config.output_dir(&watch.root);

    while let Some(event) = rx.recv().await {
        match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_) => {
                if !event.paths.iter().any(|p| is_source_change(p, &output)) {
                    continue;
                }

                tokio::time::sleep(REBUILD_DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                println!("   📝 File changed, rebuilding...");
                match rebuild(&watch.root, &watch.config).await {
                    Ok(report) => {
                        debug!(pages = report.pages, "rebuild complete");
                        *watch.not_found.write().await = read_not_found(&output, &watch.config);
                        let _ = watch.reload_tx.send(());
                    }
                    Err(e) => eprintln!("   ⚠ Rebuild failed: {:#}", e),
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// SSE endpoint for live reload
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let mut rx = state.reload_tx.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(()) => yield Ok(Event::default().data("reload")),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn not_found_handler(State(state): State<AppState>) -> Response {
    let body = state.not_found.read().await.clone();
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html; charset=UTF-8")],
        body,
    )
        .into_response()
}
