//! Application settings loaded from `bolibana.toml`.
//!
//! Besides cache lifetimes, the file lists the reference data every
//! deployment needs: entity types, permissions, roles and report classes.
//! [`seed`] inserts whatever is missing, so it is safe to run on every start.

use crate::{
    core::{access, calendar::PeriodType, entity, reporting},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "bolibana.toml";

/// Configuration structure representing the entire settings file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Cache lifetimes
    #[serde(default)]
    pub cache: CacheConfig,
    /// Entity types to seed
    #[serde(default)]
    pub entity_types: Vec<EntityTypeConfig>,
    /// Permissions to seed
    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,
    /// Roles to seed, with their permissions
    #[serde(default)]
    pub roles: Vec<RoleConfig>,
    /// Report classes to seed
    #[serde(default)]
    pub report_classes: Vec<ReportClassConfig>,
}

/// Cache lifetimes, in seconds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of ordinary cached results
    #[serde(default = "default_expiry_secs")]
    pub default_expiry_secs: u64,
    /// Lifetime of computed indicator tables (built from validated data)
    #[serde(default = "indicator_expiry_secs")]
    pub indicator_expiry_secs: u64,
}

const fn default_expiry_secs() -> u64 {
    15 * 60
}

const fn indicator_expiry_secs() -> u64 {
    365 * 24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_expiry_secs: default_expiry_secs(),
            indicator_expiry_secs: indicator_expiry_secs(),
        }
    }
}

impl CacheConfig {
    /// Lifetime of ordinary cached results
    #[must_use]
    pub const fn default_expiry(&self) -> Duration {
        Duration::from_secs(self.default_expiry_secs)
    }

    /// Lifetime of computed indicator tables
    #[must_use]
    pub const fn indicator_expiry(&self) -> Duration {
        Duration::from_secs(self.indicator_expiry_secs)
    }
}

/// An entity type to seed
#[derive(Debug, Clone, Deserialize)]
pub struct EntityTypeConfig {
    /// Display name
    pub name: String,
    /// Unique code
    pub slug: String,
}

/// A permission to seed
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionConfig {
    /// Permission code
    pub slug: String,
}

/// A role to seed
#[derive(Debug, Clone, Deserialize)]
pub struct RoleConfig {
    /// Role code
    pub slug: String,
    /// Display name
    pub name: String,
    /// Optional level hint
    #[serde(default)]
    pub level: Option<String>,
    /// Permission slugs granted to the role
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// A report class to seed
#[derive(Debug, Clone, Deserialize)]
pub struct ReportClassConfig {
    /// Class code
    pub slug: String,
    /// Display name
    pub name: String,
    /// Implementation identifier
    pub cls: String,
    /// Filing cadence
    pub period_type: PeriodType,
    /// `"r"` (regular) or `"i"` (individual)
    #[serde(default = "regular_report_type")]
    pub report_type: String,
}

fn regular_report_type() -> String {
    reporting::REGULAR.to_string()
}

/// Counts of rows inserted by [`seed`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// New entity types
    pub entity_types: usize,
    /// New permissions
    pub permissions: usize,
    /// New roles
    pub roles: usize,
    /// New role/permission grants
    pub grants: usize,
    /// New report classes
    pub report_classes: usize,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from `BOLIBANA_CONFIG`, or `./bolibana.toml`.
///
/// A missing default file yields an empty configuration; a missing file
/// named explicitly through the environment is an error.
pub fn load_default_config() -> Result<Config> {
    match std::env::var("BOLIBANA_CONFIG") {
        Ok(path) => load_config(path),
        Err(_) if !Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("No {DEFAULT_CONFIG_PATH} found, using built-in defaults");
            Ok(Config::default())
        }
        Err(_) => load_config(DEFAULT_CONFIG_PATH),
    }
}

/// Inserts every configured row that does not exist yet.
pub async fn seed(db: &DatabaseConnection, config: &Config) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for entity_type in &config.entity_types {
        if entity::get_entity_type_by_slug(db, &entity_type.slug)
            .await?
            .is_none()
        {
            entity::create_entity_type(db, &entity_type.name, &entity_type.slug).await?;
            summary.entity_types += 1;
        }
    }

    for permission in &config.permissions {
        if access::get_permission(db, &permission.slug).await?.is_none() {
            access::create_permission(db, &permission.slug).await?;
            summary.permissions += 1;
        }
    }

    for role in &config.roles {
        if access::get_role(db, &role.slug).await?.is_none() {
            access::create_role(db, &role.slug, &role.name, role.level.clone()).await?;
            summary.roles += 1;
        }
        for permission in &role.permissions {
            if access::grant_permission(db, &role.slug, permission).await? {
                summary.grants += 1;
            }
        }
    }

    for report_class in &config.report_classes {
        if reporting::get_report_class(db, &report_class.slug)
            .await?
            .is_none()
        {
            reporting::create_report_class(
                db,
                reporting::NewReportClass {
                    slug: report_class.slug.clone(),
                    name: report_class.name.clone(),
                    cls: report_class.cls.clone(),
                    period_type: report_class.period_type,
                    report_type: report_class.report_type.clone(),
                },
            )
            .await?;
            summary.report_classes += 1;
        }
    }

    info!(
        "Seeded {} entity types, {} permissions, {} roles, {} grants, {} report classes",
        summary.entity_types,
        summary.permissions,
        summary.roles,
        summary.grants,
        summary.report_classes
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    const SAMPLE: &str = r#"
        [cache]
        default_expiry_secs = 60

        [[entity_types]]
        name = "Health Center"
        slug = "cscom"

        [[entity_types]]
        name = "District"
        slug = "district"

        [[permissions]]
        slug = "can_submit_report"

        [[permissions]]
        slug = "can_validate_report"

        [[roles]]
        slug = "data_clerk"
        name = "Data Clerk"
        level = "cscom"
        permissions = ["can_submit_report"]

        [[roles]]
        slug = "district_manager"
        name = "District Manager"
        permissions = ["can_submit_report", "can_validate_report"]

        [[report_classes]]
        slug = "malaria_monthly"
        name = "Malaria Monthly Report"
        cls = "malaria.MalariaReport"
        period_type = "month"
    "#;

    #[test]
    fn test_parse_settings() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.cache.default_expiry_secs, 60);
        assert_eq!(config.cache.indicator_expiry_secs, 31_536_000);
        assert_eq!(config.entity_types.len(), 2);
        assert_eq!(config.roles[0].level.as_deref(), Some("cscom"));
        assert!(config.roles[1].level.is_none());
        assert_eq!(config.report_classes[0].period_type, PeriodType::Month);
        assert_eq!(config.report_classes[0].report_type, "r");
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.roles.is_empty());
        assert_eq!(config.cache.default_expiry(), Duration::from_secs(900));
    }

    #[test]
    fn test_unknown_period_type_is_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [[report_classes]]
            slug = "x"
            name = "X"
            cls = "x.X"
            period_type = "fortnight"
            "#,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config: Config = toml::from_str(SAMPLE).unwrap();

        let first = seed(&db, &config).await?;
        assert_eq!(
            first,
            SeedSummary {
                entity_types: 2,
                permissions: 2,
                roles: 2,
                grants: 3,
                report_classes: 1,
            }
        );

        let second = seed(&db, &config).await?;
        assert_eq!(second, SeedSummary::default());

        let perms = access::role_permissions(&db, "district_manager").await?;
        assert_eq!(perms, vec!["can_submit_report", "can_validate_report"]);
        Ok(())
    }
}
