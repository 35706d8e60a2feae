//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Composite uniqueness constraints that the entity derive cannot
//! express are added as unique indexes afterwards.

use crate::entities::{
    Access, EntityType, ExpectedReporting, OrgEntity, PeriodRow, Permission, Provider, Report,
    ReportClass, Role, RolePermission, ScheduledReporting, access, expected_reporting, period,
    report, role_permission, scheduled_reporting,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/bolibana.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_parent_dir(&database_url)?;
    debug!("Connecting to {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// `SQLite` creates the file (`mode=rwc`) but not its directory.
fn ensure_parent_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("uq_periods_bounds_type")
            .table(PeriodRow)
            .col(period::Column::StartOn)
            .col(period::Column::EndOn)
            .col(period::Column::PeriodType)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_role_permissions")
            .table(RolePermission)
            .col(role_permission::Column::RoleSlug)
            .col(role_permission::Column::PermissionSlug)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_accesses_role_entity")
            .table(Access)
            .col(access::Column::RoleSlug)
            .col(access::Column::EntityId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_reports_class_period_entity_type")
            .table(Report)
            .col(report::Column::ReportClassSlug)
            .col(report::Column::PeriodId)
            .col(report::Column::EntityId)
            .col(report::Column::ReportType)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_scheduled_reportings_class_entity")
            .table(ScheduledReporting)
            .col(scheduled_reporting::Column::ReportClassSlug)
            .col(scheduled_reporting::Column::EntityId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("uq_expected_reportings_class_entity_period")
            .table(ExpectedReporting)
            .col(expected_reporting::Column::ReportClassSlug)
            .col(expected_reporting::Column::EntityId)
            .col(expected_reporting::Column::PeriodId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates all tables and unique indexes, skipping those that already exist.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Referenced tables first
    create_table(db, &schema, EntityType).await?;
    create_table(db, &schema, OrgEntity).await?;
    create_table(db, &schema, Permission).await?;
    create_table(db, &schema, Role).await?;
    create_table(db, &schema, RolePermission).await?;
    create_table(db, &schema, Access).await?;
    create_table(db, &schema, Provider).await?;
    create_table(db, &schema, PeriodRow).await?;
    create_table(db, &schema, ReportClass).await?;
    create_table(db, &schema, Report).await?;
    create_table(db, &schema, ScheduledReporting).await?;
    create_table(db, &schema, ExpectedReporting).await?;

    for index in unique_indexes() {
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}
