//! `SeaORM` entity definitions for the reporting database.
//!
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod access;
pub mod entity;
pub mod entity_type;
pub mod expected_reporting;
pub mod period;
pub mod permission;
pub mod provider;
pub mod report;
pub mod report_class;
pub mod role;
pub mod role_permission;
pub mod scheduled_reporting;

// Re-export specific types to avoid conflicts
pub use access::{Column as AccessColumn, Entity as Access, Model as AccessModel};
pub use entity::{Column as OrgEntityColumn, Entity as OrgEntity, Model as OrgEntityModel};
pub use entity_type::{
    Column as EntityTypeColumn, Entity as EntityType, Model as EntityTypeModel,
};
pub use expected_reporting::{
    Column as ExpectedReportingColumn, Entity as ExpectedReporting,
    Model as ExpectedReportingModel,
};
pub use period::{Column as PeriodColumn, Entity as PeriodRow, Model as PeriodModel};
pub use permission::{
    Column as PermissionColumn, Entity as Permission, Model as PermissionModel,
};
pub use provider::{Column as ProviderColumn, Entity as Provider, Model as ProviderModel};
pub use report::{Column as ReportColumn, Entity as Report, Model as ReportModel};
pub use report_class::{
    Column as ReportClassColumn, Entity as ReportClass, Model as ReportClassModel,
};
pub use role::{Column as RoleColumn, Entity as Role, Model as RoleModel};
pub use role_permission::{
    Column as RolePermissionColumn, Entity as RolePermission, Model as RolePermissionModel,
};
pub use scheduled_reporting::{
    Column as ScheduledReportingColumn, Entity as ScheduledReporting,
    Model as ScheduledReportingModel,
};
