use crate::application::QuotaService;
use crate::infrastructure::{AppConfig, PostgresEmployerRepository, PostgresUsageRepository};
use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;

pub type QuotaServiceType = QuotaService<PostgresEmployerRepository, PostgresUsageRepository>;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub employer_repo: Arc<PostgresEmployerRepository>,
    pub quota: Arc<QuotaServiceType>,
    pub admin_token: Arc<str>,
}

impl AppState {
    pub fn new(pool: PgPool, admin_token: &str) -> Self {
        let employer_repo = Arc::new(PostgresEmployerRepository::new(pool.clone()));
        let usage_repo = Arc::new(PostgresUsageRepository::new(pool.clone()));
        let quota = Arc::new(QuotaService::new(employer_repo.clone(), usage_repo));

        Self {
            pool,
            employer_repo,
            quota,
            admin_token: Arc::from(admin_token),
        }
    }
}

/// Build full state from config + an existing pool.
///
/// Intended for embedding into a larger service that already manages a `PgPool`.
pub async fn build_state_with_pool(
    config: AppConfig,
    pool: PgPool,
    run_migrations: bool,
) -> anyhow::Result<AppState> {
    if run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
    }

    Ok(AppState::new(pool, &config.admin_token))
}

/// Build state for the standalone server.
///
/// Creates the `PgPool`, runs migrations, and wires repositories/services.
pub async fn build_state_from_env(config: AppConfig) -> anyhow::Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect database")?;
    build_state_with_pool(config, pool, true).await
}
