mod auth;
mod routes;

use rickover::callback::CallbackReducer;
use rickover::config::Config;
use rickover::db;
use rickover::store::{ArchivedJobsRepo, JobTypesRepo, QueuedJobsRepo, Store};
use tracing::info;

use crate::auth::Credentials;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::from_env()?;
    let pool = db::make_pool(&cfg.database_url, cfg.server_pool_size).await?;
    db::run_migrations(&pool).await?;

    let store = Store::new(pool.clone());
    let callback = CallbackReducer::new(
        QueuedJobsRepo::new(pool.clone()),
        ArchivedJobsRepo::new(pool.clone()),
        JobTypesRepo::new(pool),
    );

    let credentials = Credentials {
        user: std::env::var("RICKOVER_AUTH_USER").unwrap_or_else(|_| "rickover".to_string()),
        password: std::env::var("RICKOVER_AUTH_PASSWORD").unwrap_or_default(),
    };

    let state = AppState {
        store,
        callback,
        credentials,
    };

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!(%addr, "rickover-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
