//! Safario server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `SAFARIO__*` environment variables, opens the SQLite store and serves the
//! API, the proxy functions and uploaded files over HTTP.
//!
//! # Bootstrapping the first admin
//!
//! Sign up through the API, then:
//!
//! ```text
//! cargo run -p safario-server -- grant-admin --email you@example.com
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use safario_api::AppState;
use safario_functions::Functions;
use safario_server::{ServerConfig, build_app, grant_admin};
use safario_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Safario tourist-safety server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve HTTP (the default).
  Serve,
  /// Approve an existing account as admin and exit.
  GrantAdmin {
    #[arg(long)]
    email: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SAFARIO").separator("__"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize::<ServerConfig>()
    .context("failed to deserialise ServerConfig")?
    .expand_paths();
  server_cfg.validate()?;

  if let Some(dir) = server_cfg.store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::GrantAdmin { email } => {
      let role = grant_admin(&store, &email).await?;
      tracing::info!(user = %role.user_id, "granted admin to {email}");
      Ok(())
    }
    Command::Serve => serve(store, server_cfg).await,
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  std::fs::create_dir_all(&server_cfg.storage_dir).with_context(|| {
    format!("failed to create storage dir {}", server_cfg.storage_dir.display())
  })?;

  let functions =
    Functions::new(&server_cfg.functions).context("failed to build upstream clients")?;
  let state = AppState::new(Arc::new(store), server_cfg.api_config(), functions);
  let app = build_app(state, &server_cfg);

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  tracing::info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        tracing::error!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => {},
    () = terminate => {},
  }
  tracing::info!("shutdown signal received");
}
