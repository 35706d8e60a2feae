//! Unified error types for the reporting core.

use thiserror::Error;

/// Errors raised by configuration, persistence, calendar and indicator code.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config file, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer conversion failure
    #[error("Integer conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    /// Input failed validation
    #[error("Validation error: {message}")]
    Validation {
        /// What was rejected
        message: String,
    },

    /// Date arithmetic produced no valid period
    #[error("Invalid period: {message}")]
    InvalidPeriod {
        /// Why the period could not be built
        message: String,
    },

    /// Unknown entity
    #[error("Entity not found: {slug}")]
    EntityNotFound {
        /// Slug or id that was looked up
        slug: String,
    },

    /// Unknown entity type
    #[error("Entity type not found: {slug}")]
    EntityTypeNotFound {
        /// Slug that was looked up
        slug: String,
    },

    /// Unknown role
    #[error("Role not found: {slug}")]
    RoleNotFound {
        /// Slug that was looked up
        slug: String,
    },

    /// Unknown access
    #[error("Access not found: {id}")]
    AccessNotFound {
        /// Access id
        id: i64,
    },

    /// Unknown provider
    #[error("Provider not found: {username}")]
    ProviderNotFound {
        /// Username or id that was looked up
        username: String,
    },

    /// Unknown period
    #[error("Period not found: {id}")]
    PeriodNotFound {
        /// Period id
        id: i64,
    },

    /// Unknown report class
    #[error("Report class not found: {slug}")]
    ReportClassNotFound {
        /// Slug that was looked up
        slug: String,
    },

    /// Unknown report
    #[error("Report not found: {id}")]
    ReportNotFound {
        /// Report id
        id: i64,
    },

    /// The provider lacks a permission
    #[error("{}", permission_message(.permission, .entity.as_deref()))]
    PermissionDenied {
        /// Permission slug that was checked
        permission: String,
        /// Entity the check was scoped to, if any
        entity: Option<String>,
    },

    /// An indicator has no data for a period
    #[error("No source data for `{line}` in {period}")]
    NoSourceData {
        /// Indicator line slug
        line: String,
        /// Period identifier
        period: String,
    },

    /// A percentage was requested on a table with no reference line
    #[error("Indicator table `{table}` has no reference line")]
    NoReferenceLine {
        /// Table identifier
        table: String,
    },

    /// A line slug that the table does not declare
    #[error("Unknown indicator line `{line}`")]
    UnknownLine {
        /// Line slug
        line: String,
    },
}

fn permission_message(permission: &str, entity: Option<&str>) -> String {
    entity.map_or_else(
        || format!("You don't have permission {permission}"),
        |entity| format!("You don't have permission {permission} on {entity}"),
    )
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
