//! Backend entry-point: loads settings, prepares the database and serves the
//! admin API.

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use futureproof_backend::domain::clauses::DEFAULT_CLAUSE_POSITIONS;
use futureproof_backend::domain::ports::ClausePositionRepository;
use futureproof_backend::inbound::http::health::HealthState;
use futureproof_backend::outbound::persistence::{
    DbPool, DieselClausePositionRepository, run_pending_migrations,
};
use futureproof_backend::settings::FutureproofSettings;
use ortho_config::OrthoConfig;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = FutureproofSettings::load().wrap_err("load settings")?;
    let pool_config = settings.pool_config()?;
    let bind_addr = settings.bind_addr()?;

    let applied = run_pending_migrations(pool_config.database_url().to_owned())
        .await
        .wrap_err("run database migrations")?;
    info!(applied, "database schema up to date");

    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("build connection pool")?;

    if settings.seed_clause_positions {
        let inserted = DieselClausePositionRepository::new(pool.clone())
            .seed(&DEFAULT_CLAUSE_POSITIONS)
            .await
            .wrap_err("seed clause positions")?;
        info!(inserted, "clause positions seeded");
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, ServerConfig::new(bind_addr, pool))
        .wrap_err_with(|| format!("bind {bind_addr}"))?;
    info!(%bind_addr, "admin API listening");
    server.await.wrap_err("server terminated")
}
