use anyhow::Context;
use std::sync::Arc;
use tasktrack::config::AppConfig;
use tasktrack::http::{self, App};
use tasktrack::metrics::Metrics;
use tasktrack::migration::run_startup_migrations;
use tasktrack::tasks::PgTaskRepository;
use tasktrack::{logging, DbPool};

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    logging::init(&config.log).context("failed to initialise logging")?;

    // Fatal: the server never starts against a schema it could not migrate.
    if let Err(e) = run_startup_migrations(&config) {
        tracing::error!("startup migrations failed: {e}");
        std::process::exit(1);
    }

    if let Some(workers) = config.server.workers {
        may::config().set_workers(workers);
    }

    let url = config
        .database_url()
        .context("database.url (DATABASE_URL) is not configured")?;
    let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);
    let pool = DbPool::connect(
        url,
        config.database.max_connections,
        Some(Arc::clone(&metrics.queries)),
    )
    .context("failed to open the connection pool")?;

    let repo = Arc::new(PgTaskRepository::new(Arc::new(pool)));
    let app = Arc::new(App::new(repo, metrics, &config));

    let addr = config.bind_address();
    let server = http::serve(app, &addr).with_context(|| format!("failed to bind {addr}"))?;
    server
        .join()
        .map_err(|e| anyhow::anyhow!("server stopped: {e:?}"))?;
    Ok(())
}
