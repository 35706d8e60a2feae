/// Role-based access control: permissions, roles and accesses
pub mod access;

/// In-memory result cache with per-entry expiry
pub mod cache;

/// Pure period arithmetic
pub mod calendar;

/// Reporting completeness indicator table
pub mod completeness;

/// Entity types and the entity hierarchy
pub mod entity;

/// Display helpers for names, phone numbers and numbers
pub mod format;

/// Indicator table engine
pub mod indicator;

/// Memoized period storage
pub mod period;

/// Provider accounts and credential helpers
pub mod provider;

/// Reports, statuses and receipts
pub mod report;

/// Report classes, scheduled and expected reportings
pub mod reporting;
