use std::error::Error;

use blog::config::Config;
use blog::db::{self, Db, PgStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let pool = db::init_pool(&config.database_url, config.pool_size)?;
    db::run_migrations(&pool)?;
    info!(pool_size = config.pool_size, "database ready");

    let store: Db = Box::new(PgStore::new(pool));
    blog::server(store, config).launch().await?;
    Ok(())
}
