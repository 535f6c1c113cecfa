//! Database configuration module.
//!
//! Handles the connection to the relational store and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust models. Two unique indexes back the
//! duplicate guards of the quote subsystem:
//! - `presupuestos.numero` (one quote per sequence number)
//! - `seguimientos(presupuesto_id, tipo)` (one follow-up set per quote)

use crate::entities::{FollowUp, Lead, Quote, follow_up};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/quote_followups.sqlite?mode=rwc";

/// Name of the unique index guarding against double-scheduled follow-ups.
pub const FOLLOW_UP_UNIQUE_INDEX: &str = "idx_seguimientos_presupuesto_tipo";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_path(database_url)
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

fn sqlite_file_path(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite://")?;
    let file = rest.split('?').next()?;
    (!file.is_empty() && !file.starts_with(":memory:")).then(|| Path::new(file))
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Safe to call on every startup. Tables are created in dependency order
/// (leads, quotes, follow-ups) so foreign keys resolve.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut lead_table = schema.create_table_from_entity(Lead);
    let mut quote_table = schema.create_table_from_entity(Quote);
    let mut follow_up_table = schema.create_table_from_entity(FollowUp);

    lead_table.if_not_exists();
    quote_table.if_not_exists();
    follow_up_table.if_not_exists();

    db.execute(builder.build(&lead_table)).await?;
    db.execute(builder.build(&quote_table)).await?;
    db.execute(builder.build(&follow_up_table)).await?;

    let follow_up_index = Index::create()
        .name(FOLLOW_UP_UNIQUE_INDEX)
        .table(FollowUp)
        .col(follow_up::Column::QuoteId)
        .col(follow_up::Column::Kind)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&follow_up_index)).await?;

    info!("Database tables ensured");
    Ok(())
}
