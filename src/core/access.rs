//! Role-based access control.
//!
//! A role bundles permissions. An access binds a role to a target entity, and
//! a provider holding that access may use the role's permissions on the
//! target and everything below it.

use crate::{
    core::entity::{display_full_name, display_name, get_entity_by_id, is_descendant_or_self},
    entities::{
        Access, Permission, Role, RolePermission, access, entity, permission, provider, role,
        role_permission,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Creates a permission.
pub async fn create_permission<C>(db: &C, slug: &str) -> Result<permission::Model>
where
    C: ConnectionTrait,
{
    if slug.trim().is_empty() {
        return Err(Error::Validation {
            message: "Permission slug cannot be empty".to_string(),
        });
    }
    let row = permission::ActiveModel {
        slug: Set(slug.trim().to_string()),
    };
    Ok(row.insert(db).await?)
}

/// Finds a permission by slug.
pub async fn get_permission<C>(db: &C, slug: &str) -> Result<Option<permission::Model>>
where
    C: ConnectionTrait,
{
    Permission::find_by_id(slug.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a role without any permission.
pub async fn create_role<C>(
    db: &C,
    slug: &str,
    name: &str,
    level: Option<String>,
) -> Result<role::Model>
where
    C: ConnectionTrait,
{
    if slug.trim().is_empty() || name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Role slug and name cannot be empty".to_string(),
        });
    }
    let row = role::ActiveModel {
        slug: Set(slug.trim().to_string()),
        name: Set(name.trim().to_string()),
        level: Set(level),
    };
    Ok(row.insert(db).await?)
}

/// Finds a role by slug.
pub async fn get_role<C>(db: &C, slug: &str) -> Result<Option<role::Model>>
where
    C: ConnectionTrait,
{
    Role::find_by_id(slug.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a role by slug, failing with [`Error::RoleNotFound`].
pub async fn require_role<C>(db: &C, slug: &str) -> Result<role::Model>
where
    C: ConnectionTrait,
{
    get_role(db, slug).await?.ok_or_else(|| Error::RoleNotFound {
        slug: slug.to_string(),
    })
}

/// Adds `permission_slug` to a role. Returns `false` when it was already granted.
pub async fn grant_permission<C>(db: &C, role_slug: &str, permission_slug: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    require_role(db, role_slug).await?;
    if get_permission(db, permission_slug).await?.is_none() {
        return Err(Error::Validation {
            message: format!("Unknown permission `{permission_slug}`"),
        });
    }

    let existing = RolePermission::find()
        .filter(role_permission::Column::RoleSlug.eq(role_slug))
        .filter(role_permission::Column::PermissionSlug.eq(permission_slug))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }

    role_permission::ActiveModel {
        role_slug: Set(role_slug.to_string()),
        permission_slug: Set(permission_slug.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    debug!("Granted {permission_slug} to role {role_slug}");
    Ok(true)
}

/// Permission slugs of a role, sorted.
pub async fn role_permissions<C>(db: &C, role_slug: &str) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    let grants = RolePermission::find()
        .filter(role_permission::Column::RoleSlug.eq(role_slug))
        .order_by_asc(role_permission::Column::PermissionSlug)
        .all(db)
        .await?;
    Ok(grants.into_iter().map(|grant| grant.permission_slug).collect())
}

/// The access binding `role_slug` to `target`, created if needed.
pub async fn find_or_create_access<C>(
    db: &C,
    role_slug: &str,
    target: &entity::Model,
) -> Result<access::Model>
where
    C: ConnectionTrait,
{
    require_role(db, role_slug).await?;

    let existing = Access::find()
        .filter(access::Column::RoleSlug.eq(role_slug))
        .filter(access::Column::EntityId.eq(target.id))
        .one(db)
        .await?;
    if let Some(existing) = existing {
        return Ok(existing);
    }

    let created = access::ActiveModel {
        role_slug: Set(role_slug.to_string()),
        entity_id: Set(target.id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created access {} on {}", role_slug, target.slug);
    Ok(created)
}

/// Retrieves an access by id.
pub async fn get_access<C>(db: &C, access_id: i64) -> Result<access::Model>
where
    C: ConnectionTrait,
{
    Access::find_by_id(access_id)
        .one(db)
        .await?
        .ok_or(Error::AccessNotFound { id: access_id })
}

/// `Role` when the target is a root entity, `Role on Target` otherwise.
pub async fn access_name<C>(db: &C, access: &access::Model) -> Result<String>
where
    C: ConnectionTrait,
{
    let role = require_role(db, &access.role_slug).await?;
    let target = get_entity_by_id(db, access.entity_id).await?;
    if target.parent_id.is_none() {
        Ok(role.name)
    } else {
        Ok(format!("{} on {}", role.name, display_name(&target)))
    }
}

/// Whether `provider` holds `permission_slug`, on `entity` when given.
///
/// The entity must be the access target or one of its descendants. Inactive
/// providers hold no permission.
pub async fn provider_can<C>(
    db: &C,
    provider: &provider::Model,
    permission_slug: &str,
    entity: Option<&entity::Model>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if !provider.is_active {
        return Ok(false);
    }

    let access = get_access(db, provider.access_id).await?;
    if !role_permissions(db, &access.role_slug)
        .await?
        .iter()
        .any(|granted| granted == permission_slug)
    {
        return Ok(false);
    }

    match entity {
        Some(entity) => {
            let target = get_entity_by_id(db, access.entity_id).await?;
            is_descendant_or_self(db, entity, &target).await
        }
        None => Ok(true),
    }
}

/// Like [`provider_can`], failing with [`Error::PermissionDenied`].
pub async fn require_permission<C>(
    db: &C,
    provider: &provider::Model,
    permission_slug: &str,
    entity: Option<&entity::Model>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    if provider_can(db, provider, permission_slug, entity).await? {
        return Ok(());
    }

    let entity = match entity {
        Some(entity) => Some(display_full_name(db, entity).await?),
        None => None,
    };
    Err(Error::PermissionDenied {
        permission: permission_slug.to_string(),
        entity,
    })
}

/// Role level of the provider's access, if the role has one.
pub async fn provider_level<C>(db: &C, provider: &provider::Model) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let access = get_access(db, provider.access_id).await?;
    Ok(require_role(db, &access.role_slug).await?.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_provider, setup_test_db, setup_with_hierarchy};

    #[tokio::test]
    async fn test_grants_are_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        create_permission(&db, "can_validate_report").await?;
        create_permission(&db, "can_submit_report").await?;
        create_role(&db, "manager", "Manager", Some("district".to_string())).await?;

        assert!(grant_permission(&db, "manager", "can_validate_report").await?);
        assert!(grant_permission(&db, "manager", "can_submit_report").await?);
        assert!(!grant_permission(&db, "manager", "can_submit_report").await?);
        assert_eq!(
            role_permissions(&db, "manager").await?,
            vec!["can_submit_report", "can_validate_report"]
        );

        assert!(matches!(
            grant_permission(&db, "nobody", "can_submit_report").await,
            Err(Error::RoleNotFound { .. })
        ));
        assert!(matches!(
            grant_permission(&db, "manager", "can_fly").await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_access_is_unique_and_named() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_role(&db, "manager", "Manager", None).await?;

        let first = find_or_create_access(&db, "manager", &tree.district).await?;
        let second = find_or_create_access(&db, "manager", &tree.district).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(access_name(&db, &first).await?, "Manager on Kita");

        let national = find_or_create_access(&db, "manager", &tree.country).await?;
        assert_eq!(access_name(&db, &national).await?, "Manager");

        assert!(matches!(
            get_access(&db, 999).await,
            Err(Error::AccessNotFound { id: 999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_permissions_follow_the_hierarchy() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_permission(&db, "can_validate_report").await?;
        create_role(&db, "manager", "Manager", Some("district".to_string())).await?;
        grant_permission(&db, "manager", "can_validate_report").await?;
        let access = find_or_create_access(&db, "manager", &tree.district).await?;
        let provider = create_test_provider(&db, "Awa", "Traore", access.id).await?;

        assert!(provider_can(&db, &provider, "can_validate_report", None).await?);
        assert!(provider_can(&db, &provider, "can_validate_report", Some(&tree.facility)).await?);
        assert!(provider_can(&db, &provider, "can_validate_report", Some(&tree.district)).await?);
        assert!(!provider_can(&db, &provider, "can_validate_report", Some(&tree.region)).await?);
        assert!(!provider_can(&db, &provider, "can_submit_report", None).await?);
        assert_eq!(provider_level(&db, &provider).await?, Some("district".to_string()));

        let denied = require_permission(&db, &provider, "can_validate_report", Some(&tree.region))
            .await
            .err()
            .map(|err| err.to_string());
        assert_eq!(
            denied.as_deref(),
            Some("You don't have permission can_validate_report on Kayes/Mali")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_provider_holds_nothing() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_permission(&db, "can_submit_report").await?;
        create_role(&db, "agent", "Agent", None).await?;
        grant_permission(&db, "agent", "can_submit_report").await?;
        let access = find_or_create_access(&db, "agent", &tree.facility).await?;
        let provider = create_test_provider(&db, "Moussa", "Keita", access.id).await?;

        let inactive = crate::core::provider::deactivate_provider(&db, provider.id).await?;
        assert!(!provider_can(&db, &inactive, "can_submit_report", Some(&tree.facility)).await?);
        assert!(
            require_permission(&db, &inactive, "can_submit_report", None)
                .await
                .is_err()
        );
        Ok(())
    }
}
