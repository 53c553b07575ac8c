use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use lifedash::config::{self, CliArgs, Config};
use lifedash::state::{AppState, Services};
use lifedash::{create_app, db, run_migrations};

/// Sets up stdout logging and, when `log_dir` is set, daily JSON log files
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(debug: bool, log_dir: Option<&std::path::Path>) -> Option<WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout_layer = fmt::layer().with_filter(filter());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lifedash.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().json().with_writer(writer).with_filter(filter());
            tracing_subscriber::registry().with(stdout_layer).with(file_layer).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stdout_layer).init();
            None
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let services = Services::from_config(&config)?;

    // Initialize the database pool
    let pool = Arc::new(db::init_pool(&config.database_url).context("Failed to open database")?);
    {
        let mut conn = pool.get().context("Failed to get a database connection")?;
        run_migrations(&mut conn)?;
    }

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.bind_address, config.port))?;

    let app = create_app(AppState::new(pool, config, services));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = CliArgs::parse();
    let debug = args.debug;
    let config = config::get_config(args);

    let _guard = init_tracing(debug, config.log_dir.as_deref());
    serve(config).await
}
