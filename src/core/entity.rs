//! Entity hierarchy - entity types, entities and tree traversal.
//!
//! The hierarchy is a plain adjacency list (`parent_id`). Subtree queries walk
//! it breadth-first, one query per level.

use crate::{
    core::format::title_case,
    entities::{EntityType, OrgEntity, entity, entity_type},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::HashSet;

/// Creates an entity type. The slug must be unique.
pub async fn create_entity_type<C>(db: &C, name: &str, slug: &str) -> Result<entity_type::Model>
where
    C: ConnectionTrait,
{
    validate_slug(slug)?;
    if name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Entity type name cannot be empty".to_string(),
        });
    }

    let row = entity_type::ActiveModel {
        name: Set(name.trim().to_string()),
        slug: Set(slug.to_string()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Finds an entity type by slug.
pub async fn get_entity_type_by_slug<C>(db: &C, slug: &str) -> Result<Option<entity_type::Model>>
where
    C: ConnectionTrait,
{
    EntityType::find()
        .filter(entity_type::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves an entity type by id.
pub async fn get_entity_type<C>(db: &C, entity_type_id: i64) -> Result<entity_type::Model>
where
    C: ConnectionTrait,
{
    EntityType::find_by_id(entity_type_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::EntityTypeNotFound {
            slug: entity_type_id.to_string(),
        })
}

/// Fields of a new entity.
#[derive(Debug, Clone, Default)]
pub struct NewEntity {
    /// Display name
    pub name: String,
    /// Unique code
    pub slug: String,
    /// Slug of an existing entity type
    pub entity_type_slug: String,
    /// Contact number; blank means none
    pub phone_number: Option<String>,
    /// Slug of the parent entity, `None` for a root
    pub parent_slug: Option<String>,
}

/// Creates an entity under its parent.
///
/// A blank phone number is stored as NULL so that several entities may lack one.
pub async fn create_entity<C>(db: &C, new: NewEntity) -> Result<entity::Model>
where
    C: ConnectionTrait,
{
    validate_slug(&new.slug)?;
    if new.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "Entity name cannot be empty".to_string(),
        });
    }

    let entity_type = get_entity_type_by_slug(db, &new.entity_type_slug)
        .await?
        .ok_or_else(|| Error::EntityTypeNotFound {
            slug: new.entity_type_slug.clone(),
        })?;

    let parent_id = match new.parent_slug.as_deref() {
        Some(parent) => Some(require_entity_by_slug(db, parent).await?.id),
        None => None,
    };

    let phone_number = new
        .phone_number
        .map(|phone| phone.trim().to_string())
        .filter(|phone| !phone.is_empty());

    let row = entity::ActiveModel {
        name: Set(new.name.trim().to_string()),
        slug: Set(new.slug),
        entity_type_id: Set(entity_type.id),
        phone_number: Set(phone_number),
        parent_id: Set(parent_id),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

fn validate_slug(slug: &str) -> Result<()> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Validation {
            message: format!("`{slug}` is not a valid slug (letters, digits, `-` and `_` only)"),
        })
    }
}

/// Finds an entity by slug.
pub async fn get_entity_by_slug<C>(db: &C, slug: &str) -> Result<Option<entity::Model>>
where
    C: ConnectionTrait,
{
    OrgEntity::find()
        .filter(entity::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an entity by slug, failing with [`Error::EntityNotFound`].
pub async fn require_entity_by_slug<C>(db: &C, slug: &str) -> Result<entity::Model>
where
    C: ConnectionTrait,
{
    get_entity_by_slug(db, slug)
        .await?
        .ok_or_else(|| Error::EntityNotFound {
            slug: slug.to_string(),
        })
}

/// Retrieves an entity by id.
pub async fn get_entity_by_id<C>(db: &C, entity_id: i64) -> Result<entity::Model>
where
    C: ConnectionTrait,
{
    OrgEntity::find_by_id(entity_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::EntityNotFound {
            slug: entity_id.to_string(),
        })
}

/// Direct children, ordered by name.
pub async fn children<C>(db: &C, entity: &entity::Model) -> Result<Vec<entity::Model>>
where
    C: ConnectionTrait,
{
    OrgEntity::find()
        .filter(entity::Column::ParentId.eq(entity.id))
        .order_by_asc(entity::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every entity below `entity`, level by level.
pub async fn descendants<C>(db: &C, entity: &entity::Model) -> Result<Vec<entity::Model>>
where
    C: ConnectionTrait,
{
    let mut seen = HashSet::from([entity.id]);
    let mut found = Vec::new();
    let mut frontier = vec![entity.id];

    while !frontier.is_empty() {
        let level = OrgEntity::find()
            .filter(entity::Column::ParentId.is_in(frontier))
            .order_by_asc(entity::Column::Name)
            .all(db)
            .await?;

        // A corrupted tree could loop; never visit a node twice
        frontier = level
            .iter()
            .filter(|child| seen.insert(child.id))
            .map(|child| child.id)
            .collect();
        found.extend(level.into_iter().filter(|child| frontier.contains(&child.id)));
    }

    Ok(found)
}

/// Ids of `entity` and all its descendants.
pub async fn subtree_ids<C>(db: &C, entity: &entity::Model) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let mut ids = vec![entity.id];
    ids.extend(descendants(db, entity).await?.iter().map(|child| child.id));
    Ok(ids)
}

/// Ancestors of `entity`, nearest first.
pub async fn ancestors<C>(db: &C, entity: &entity::Model) -> Result<Vec<entity::Model>>
where
    C: ConnectionTrait,
{
    let mut seen = HashSet::from([entity.id]);
    let mut found = Vec::new();
    let mut next = entity.parent_id;

    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            break;
        }
        let parent = get_entity_by_id(db, parent_id).await?;
        next = parent.parent_id;
        found.push(parent);
    }

    Ok(found)
}

/// Depth of `entity` in the tree; roots are at level 0.
pub async fn level<C>(db: &C, entity: &entity::Model) -> Result<usize>
where
    C: ConnectionTrait,
{
    Ok(ancestors(db, entity).await?.len())
}

/// Whether `entity` is `ancestor` itself or lies below it.
pub async fn is_descendant_or_self<C>(
    db: &C,
    entity: &entity::Model,
    ancestor: &entity::Model,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if entity.id == ancestor.id {
        return Ok(true);
    }
    Ok(ancestors(db, entity)
        .await?
        .iter()
        .any(|parent| parent.id == ancestor.id))
}

/// `entity` itself if it has type `type_slug`, else its nearest ancestor of that type.
pub async fn parent_by_type<C>(
    db: &C,
    entity: &entity::Model,
    type_slug: &str,
) -> Result<Option<entity::Model>>
where
    C: ConnectionTrait,
{
    let Some(wanted) = get_entity_type_by_slug(db, type_slug).await? else {
        return Ok(None);
    };

    if entity.entity_type_id == wanted.id {
        return Ok(Some(entity.clone()));
    }
    Ok(ancestors(db, entity)
        .await?
        .into_iter()
        .find(|parent| parent.entity_type_id == wanted.id))
}

/// Title-cased name.
#[must_use]
pub fn display_name(entity: &entity::Model) -> String {
    title_case(&entity.name)
}

/// `Name/Parent` for entities with a parent, `Name` otherwise.
pub async fn display_full_name<C>(db: &C, entity: &entity::Model) -> Result<String>
where
    C: ConnectionTrait,
{
    match entity.parent_id {
        Some(parent_id) => {
            let parent = get_entity_by_id(db, parent_id).await?;
            Ok(format!("{}/{}", display_name(entity), display_name(&parent)))
        }
        None => Ok(display_name(entity)),
    }
}

/// `slug/Name`.
#[must_use]
pub fn display_code_name(entity: &entity::Model) -> String {
    format!("{}/{}", entity.slug, display_name(entity))
}

/// Type of the parent entity, `None` for roots.
pub async fn parent_level<C>(db: &C, entity: &entity::Model) -> Result<Option<entity_type::Model>>
where
    C: ConnectionTrait,
{
    match entity.parent_id {
        Some(parent_id) => {
            let parent = get_entity_by_id(db, parent_id).await?;
            Ok(Some(get_entity_type(db, parent.entity_type_id).await?))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_entity, setup_test_db, setup_with_hierarchy};

    #[tokio::test]
    async fn test_create_entity_validation() -> Result<()> {
        let db = setup_test_db().await?;
        create_entity_type(&db, "Country", "country").await?;

        let bad_slug = create_entity(
            &db,
            NewEntity {
                name: "Mali".to_string(),
                slug: "ma li".to_string(),
                entity_type_slug: "country".to_string(),
                ..NewEntity::default()
            },
        )
        .await;
        assert!(matches!(bad_slug, Err(Error::Validation { .. })));

        let unknown_type = create_entity(
            &db,
            NewEntity {
                name: "Mali".to_string(),
                slug: "mali".to_string(),
                entity_type_slug: "planet".to_string(),
                ..NewEntity::default()
            },
        )
        .await;
        assert!(matches!(unknown_type, Err(Error::EntityTypeNotFound { .. })));

        let unknown_parent = create_entity(
            &db,
            NewEntity {
                name: "Mali".to_string(),
                slug: "mali".to_string(),
                entity_type_slug: "country".to_string(),
                parent_slug: Some("africa".to_string()),
                ..NewEntity::default()
            },
        )
        .await;
        assert!(matches!(unknown_parent, Err(Error::EntityNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_phone_numbers_are_null() -> Result<()> {
        let db = setup_test_db().await?;
        create_entity_type(&db, "Health center", "cscom").await?;

        for slug in ["a1", "a2"] {
            let entity = create_entity(
                &db,
                NewEntity {
                    name: format!("Center {slug}"),
                    slug: slug.to_string(),
                    entity_type_slug: "cscom".to_string(),
                    phone_number: Some("  ".to_string()),
                    parent_slug: None,
                },
            )
            .await?;
            assert_eq!(entity.phone_number, None);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_traversal() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;

        let below_mali = descendants(&db, &tree.country).await?;
        let slugs: Vec<&str> = below_mali.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["kayes", "bafoulabe", "kita", "kita-central"]);

        let above = ancestors(&db, &tree.facility).await?;
        let slugs: Vec<&str> = above.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["kita", "kayes", "mali"]);

        assert_eq!(level(&db, &tree.country).await?, 0);
        assert_eq!(level(&db, &tree.facility).await?, 3);
        assert_eq!(children(&db, &tree.region).await?.len(), 2);
        assert_eq!(subtree_ids(&db, &tree.district).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_descendant_checks() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;

        assert!(is_descendant_or_self(&db, &tree.facility, &tree.region).await?);
        assert!(is_descendant_or_self(&db, &tree.region, &tree.region).await?);
        assert!(!is_descendant_or_self(&db, &tree.region, &tree.facility).await?);

        let region = parent_by_type(&db, &tree.facility, "region").await?;
        assert_eq!(region.map(|r| r.id), Some(tree.region.id));
        let itself = parent_by_type(&db, &tree.region, "region").await?;
        assert_eq!(itself.map(|r| r.id), Some(tree.region.id));
        assert!(parent_by_type(&db, &tree.country, "region").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_display_names() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        let lone = create_test_entity(&db, "CSCOM de sikasso", "sikasso", "cscom", None).await?;

        assert_eq!(display_name(&lone), "Cscom De Sikasso");
        assert_eq!(display_code_name(&tree.district), "kita/Kita");
        assert_eq!(display_code_name(&tree.facility), "kita-central/Kita Central");
        assert_eq!(display_full_name(&db, &tree.district).await?, "Kita/Kayes");
        assert_eq!(display_full_name(&db, &tree.country).await?, "Mali");

        let parent_type = parent_level(&db, &tree.district).await?;
        assert_eq!(parent_type.map(|t| t.slug), Some("region".to_string()));
        assert!(parent_level(&db, &tree.country).await?.is_none());
        Ok(())
    }
}
