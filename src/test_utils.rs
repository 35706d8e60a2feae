//! Shared test utilities for bolibana.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test rows with sensible defaults.

use crate::{
    core::{
        calendar::PeriodType,
        entity::{self, NewEntity},
        format::title_case,
        provider::{self, NewProvider},
        reporting::{self, NewReportClass},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all database tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates an entity, creating its type first when missing.
///
/// # Arguments
/// * `db` - Database connection
/// * `name` - Entity name
/// * `slug` - Entity slug
/// * `type_slug` - Entity type slug, also used as the type name
/// * `parent_slug` - Parent entity, `None` for a root
pub async fn create_test_entity(
    db: &DatabaseConnection,
    name: &str,
    slug: &str,
    type_slug: &str,
    parent_slug: Option<&str>,
) -> Result<entities::entity::Model> {
    if entity::get_entity_type_by_slug(db, type_slug).await?.is_none() {
        entity::create_entity_type(db, &title_case(type_slug), type_slug).await?;
    }

    entity::create_entity(
        db,
        NewEntity {
            name: name.to_string(),
            slug: slug.to_string(),
            entity_type_slug: type_slug.to_string(),
            phone_number: None,
            parent_slug: parent_slug.map(str::to_string),
        },
    )
    .await
}

/// Creates an active provider with a generated username.
///
/// # Defaults
/// * no e-mail nor phone number
pub async fn create_test_provider(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
    access_id: i64,
) -> Result<entities::provider::Model> {
    provider::create_provider(
        db,
        NewProvider {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            access_id,
            ..NewProvider::default()
        },
    )
    .await
}

/// Creates a regular report class named after its slug.
pub async fn create_test_report_class(
    db: &DatabaseConnection,
    slug: &str,
    period_type: PeriodType,
) -> Result<entities::report_class::Model> {
    reporting::create_report_class(
        db,
        NewReportClass {
            slug: slug.to_string(),
            name: title_case(slug),
            cls: format!("{slug}.Report"),
            period_type,
            report_type: reporting::REGULAR.to_string(),
        },
    )
    .await
}

/// A small health-system hierarchy.
///
/// ```text
/// mali (country)
/// └── kayes (region)
///     ├── bafoulabe (district)
///     └── kita (district)
///         └── kita-central (cscom)
/// ```
pub struct TestHierarchy {
    /// Root
    pub country: entities::entity::Model,
    /// Only region
    pub region: entities::entity::Model,
    /// District holding the facility
    pub district: entities::entity::Model,
    /// District without children
    pub other_district: entities::entity::Model,
    /// Health facility
    pub facility: entities::entity::Model,
}

/// Sets up a database holding [`TestHierarchy`].
/// Returns (db, hierarchy) for entity, access and report tests.
pub async fn setup_with_hierarchy() -> Result<(DatabaseConnection, TestHierarchy)> {
    let db = setup_test_db().await?;
    let country = create_test_entity(&db, "Mali", "mali", "country", None).await?;
    let region = create_test_entity(&db, "Kayes", "kayes", "region", Some("mali")).await?;
    let district = create_test_entity(&db, "Kita", "kita", "district", Some("kayes")).await?;
    let other_district =
        create_test_entity(&db, "Bafoulabe", "bafoulabe", "district", Some("kayes")).await?;
    let facility =
        create_test_entity(&db, "Kita Central", "kita-central", "cscom", Some("kita")).await?;

    Ok((
        db,
        TestHierarchy {
            country,
            region,
            district,
            other_district,
            facility,
        },
    ))
}
