//! proposta server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `PROPOSTA_*` environment variables, opens the SQLite store and serves the
//! JSON API over HTTP.
//!
//! # Seeding reference data
//!
//! Customers and suppliers are registered from the command line:
//!
//! ```
//! cargo run -p proposta-api --bin server -- --add-customer "Égis Engenharia"
//! cargo run -p proposta-api --bin server -- --add-supplier "Acme Ltda" --specialty MEP
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use proposta_api::{AppState, FsObjectStore, ServerConfig};
use proposta_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Proposal lifecycle server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Register a customer with this name, print it and exit.
  #[arg(long, conflicts_with = "add_supplier")]
  add_customer: Option<String>,

  /// Register a supplier with this legal name, print it and exit.
  #[arg(long, requires = "specialty")]
  add_supplier: Option<String>,

  /// Specialty of the supplier given with `--add-supplier`.
  #[arg(long)]
  specialty: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("PROPOSTA"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let database_path = expand_tilde(&server_cfg.database_path);
  let objects_dir = expand_tilde(&server_cfg.objects_dir);

  tokio::fs::create_dir_all(&objects_dir)
    .await
    .with_context(|| format!("failed to create {objects_dir:?}"))?;
  let objects = Arc::new(FsObjectStore::new(
    &objects_dir,
    &server_cfg.public_base_url,
    &server_cfg.signing_secret,
    server_cfg.upload_ttl_seconds,
  ));

  let store = SqliteStore::open(&database_path, objects.clone())
    .await
    .with_context(|| format!("failed to open store at {database_path:?}"))?;

  // Helper modes: seed reference data and exit.
  if let Some(name) = cli.add_customer {
    let customer = store
      .add_customer(&name)
      .await
      .context("failed to add customer")?;
    println!("{}", serde_json::to_string_pretty(&customer)?);
    return Ok(());
  }
  if let Some(legal_name) = cli.add_supplier {
    let specialty = cli.specialty.unwrap_or_default();
    let supplier = store
      .add_supplier(&legal_name, &specialty)
      .await
      .context("failed to add supplier")?;
    println!("{}", serde_json::to_string_pretty(&supplier)?);
    return Ok(());
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState {
    service: Arc::new(store),
    objects,
    config: Arc::new(server_cfg),
  };
  let app = proposta_api::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
