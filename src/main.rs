use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

mod config;
mod handlers;
mod middleware;
mod monitor;
mod ranking;
mod server;
mod store;

use config::{ConfigError, MonitorConfig};
use monitor::{HttpProber, Monitor};
use store::{JsonFilePersistence, ResultStore};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Latest committed round. Written by the monitor only.
    pub store: Arc<ResultStore>,
    /// Flips to `true` once; the monitor and open event streams watch it.
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(store: Arc<ResultStore>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self { store, shutdown }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Resolves once `request_shutdown` has been called.
    pub fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown.subscribe();
        async move {
            loop {
                let stop = *rx.borrow_and_update();
                if stop {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server I/O: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "cdn-monitor exited");
        std::process::exit(1);
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cdn_monitor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run() -> Result<(), StartupError> {
    // ── 1. Load config ───────────────────────────────────────────
    let config_path = config::config_path();
    let config = MonitorConfig::load(&config_path)?;
    let port = config::listen_port()?;
    info!(
        path = %config_path.display(),
        cdns = config.cdns.len(),
        test_file = %config.test_file,
        interval_ms = config.interval_ms,
        "config loaded"
    );

    // ── 2. Result store ──────────────────────────────────────────
    let store = Arc::new(ResultStore::with_persistence(JsonFilePersistence::new(
        &config.results_file,
    )));
    report_previous_results(Arc::clone(&store)).await;
    let state = Arc::new(AppState::new(store));

    // ── 3. Start the monitor ─────────────────────────────────────
    let prober = HttpProber::new()?;
    let monitor = Monitor::new(prober, config.probe_settings(), Arc::clone(&state.store));
    let monitor_handle = tokio::spawn(monitor.run(state.shutdown_receiver()));

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(Arc::clone(&state), &config.static_dir);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("CDN Monitor API running at http://localhost:{port}");
    info!("Best CDN        → http://localhost:{port}/best-cdn");
    info!("Metrics JSON    → http://localhost:{port}/metrics");
    info!("Metrics SSE     → http://localhost:{port}/metrics/stream");

    let signal_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Ends open event streams and the monitor loop together.
            signal_state.request_shutdown();
            tokio::spawn(force_exit_on_second_signal());
        })
        .await?;

    // ── 6. Wait for the monitor to finish its round ──────────────
    // A second Ctrl-C still exits if a round is stuck.
    if let Err(e) = monitor_handle.await {
        warn!(error = %e, "monitor task ended abnormally");
    }
    info!("shut down cleanly");
    Ok(())
}

/// Logs what a previous run left on disk. Returns the entry count when
/// there is anything readable.
async fn report_previous_results(store: Arc<ResultStore>) -> Option<usize> {
    match tokio::task::spawn_blocking(move || store.load_persisted()).await {
        Ok(Ok(previous)) if !previous.is_empty() => {
            info!(
                entries = previous.len(),
                since = ?previous.started_at,
                "found results from a previous run; serving them on /metrics until the first round"
            );
            Some(previous.len())
        }
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            warn!(error = %e, "previous results are unreadable; they will be overwritten");
            None
        }
        Err(e) => {
            warn!(error = %e, "reading previous results was aborted");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl-C");
        // Without a signal handler, keep serving until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn force_exit_on_second_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("second Ctrl-C, exiting without draining");
        std::process::exit(130);
    }
}
