use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use configuration::{load_config, LoggingSettings};
use database::{connect, run_migrations, DbRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Production KPIs for shrimp farms, served over a REST API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. A missing file means "defaults + environment".
    #[arg(long, short, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the database, apply migrations, and serve the API.
    Serve(ServeArgs),
    /// Apply pending database migrations, then exit.
    Migrate,
}

#[derive(Parser)]
struct ServeArgs {
    /// Overrides `server.host`.
    #[arg(long)]
    host: Option<String>,

    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    // Held until exit so buffered file logs are flushed.
    let _log_guard = init_tracing(&config.logging)?;

    let db_pool = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.acquire_timeout(),
    )
    .await
    .context("Failed to connect to database")?;
    run_migrations(&db_pool).await.context("Failed to run migrations")?;

    match cli.command {
        Commands::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            let store = Arc::new(DbRepository::new(db_pool));
            web_server::run_server(&config.server, store).await?;
        }
        Commands::Migrate => {
            tracing::info!("Migrations applied.");
        }
    }

    Ok(())
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter. The returned guard must outlive all logging.
fn init_tracing(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.filter)
            .with_context(|| format!("Invalid log filter '{}'", settings.filter))?,
    };

    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match &settings.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &settings.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            registry.try_init()?;
            Ok(None)
        }
    }
}
