/// Database configuration and connection management
pub mod database;

/// Application settings and reference data loaded from `bolibana.toml`
pub mod settings;
