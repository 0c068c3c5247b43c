//! HTTP front end for [`audiograb`].
//!
//! `POST /download` accepts `{"mediaUrl": "..."}` and answers with the job id,
//! the media duration and the 16 kHz mono WAV as base64. `GET /health` and
//! `GET /` are always open; `/download` requires the configured API key, if any.

pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod telemetry;

use audiograb::Pipeline;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use auth::AuthGate;
pub use config::Cli;
pub use error::ServerError;
pub use router::create_router;
pub use state::AppState;

/// Build state from `cli`, bind, and serve until ctrl-c or SIGTERM.
pub async fn serve(cli: Cli) -> Result<(), ServerError> {
    let options = cli.fetch_options()?;
    let pipeline = Pipeline::with_options(options);

    for tool in pipeline.check_tools().await {
        match (&tool.version, &tool.error) {
            (_, Some(error)) => warn!(program = %tool.program, %error, "tool check failed"),
            (version, None) => info!(
                program = %tool.program,
                version = version.as_deref().unwrap_or("unknown"),
                "tool available"
            ),
        }
    }

    let auth = AuthGate::new(cli.api_key());
    if !auth.is_enabled() {
        warn!("API_KEY is not set: /download is open to anyone who can reach this port");
    }

    let state = AppState::new(pipeline, auth);
    let app = create_router(state);

    let addr = cli.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining in-flight requests");
}
