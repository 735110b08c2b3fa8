mod create;
mod error;
mod listing;
mod paths;
mod prompt;
mod routes;
mod session;
mod state;
mod template;
mod transfer;

use anyhow::Context;
use clap::Parser;
use session::SessionGate;
use state::AppState;
use std::io::IsTerminal;
use std::path::PathBuf;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fileport", about = "Share one directory tree over HTTP on a trusted LAN")]
struct Args {
    /// Port to listen on. Asked interactively when unset.
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory to share; created if missing.
    /// Defaults to `Desktop/Myfiles` in the home directory.
    #[arg(long, env = "FILEPORT_ROOT")]
    root: Option<PathBuf>,

    /// Login password. Asked interactively when unset.
    #[arg(long, env = "FILEPORT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Never prompt on stdin; use defaults for anything not given.
    #[arg(long)]
    no_prompt: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fileport=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present (silently ignored if absent).
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let interactive = !args.no_prompt && std::io::stdin().is_terminal();

    let root = args.root.unwrap_or_else(default_root);
    tokio::fs::create_dir_all(&root)
        .await
        .with_context(|| format!("Cannot create root {}", root.display()))?;
    let root = tokio::fs::canonicalize(&root)
        .await
        .with_context(|| format!("Cannot resolve root {}", root.display()))?;

    let (port, password) = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        let port = match args.port {
            Some(p) => p,
            None if interactive => prompt::choose(
                &mut input,
                &mut output,
                "port",
                prompt::DEFAULT_PORT,
                prompt::parse_port,
            )
            .context("Cannot read port")?,
            None => prompt::DEFAULT_PORT,
        };
        let password = match args.password {
            Some(p) => p,
            None if interactive => prompt::choose(
                &mut input,
                &mut output,
                "password",
                prompt::DEFAULT_PASSWORD.to_string(),
                prompt::parse_password,
            )
            .context("Cannot read password")?,
            None => prompt::DEFAULT_PASSWORD.to_string(),
        };
        (port, password)
    };
    anyhow::ensure!(!password.is_empty(), "Password cannot be empty");

    // A new token per run invalidates every cookie issued by earlier runs.
    let state = AppState::new(root, SessionGate::new(password));
    tracing::info!("Root folder: {}", state.root.display());

    // CatchPanicLayer is outermost so it recovers from panics anywhere in the stack.
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new());

    let addr = format!("{}:{}", args.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;

    tracing::info!("Listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn default_root() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("Desktop"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Myfiles")
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Cannot register SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("Shutting down gracefully");
                return;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result { tracing::error!("ctrl-c error: {}", e); }
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    tracing::info!("Shutting down gracefully");
}
