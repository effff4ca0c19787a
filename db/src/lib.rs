use color_eyre::{eyre::Context, Result};
use sqlx::postgres::PgPoolOptions;

mod catalog;
mod errors;
mod memberships;
mod recipes;
mod store;
mod users;

pub use sqlx;
pub use sqlx::PgPool;
pub use store::PgStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[tracing::instrument(err)]
pub async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").wrap_err("DATABASE_URL must be set")?;
    let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
        Ok(value) => value
            .parse()
            .wrap_err("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
        Err(_) => DEFAULT_MAX_CONNECTIONS,
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await?;

    Ok(pool)
}

/// Runs pending migrations while holding an advisory lock, so several
/// instances starting at once do not race each other.
#[tracing::instrument(skip(pool), err)]
pub async fn migrate(pool: &PgPool) -> Result<()> {
    const MIGRATION_LOCK_ID: i64 = 0x0BAD_F00D_CAFE;
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(pool)
        .await?;

    sqlx::migrate!().run(pool).await?;

    let unlocked: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(pool)
        .await?;

    if unlocked == Some(true) {
        tracing::info!("Migration lock unlocked");
    } else {
        tracing::warn!("Failed to unlock migration lock");
    }

    Ok(())
}

pub async fn setup_db_pool() -> Result<PgPool> {
    let pool = connect().await?;
    migrate(&pool).await?;

    Ok(pool)
}
