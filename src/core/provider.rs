//! Providers - accounts that submit and validate reports.
//!
//! Also hosts credential helpers: usernames derived from a person's name and
//! short random passwords that are easy to type on a phone keypad.

use crate::{
    core::{access::access_name, access::get_access, format::title_case},
    entities::{Provider, provider},
    errors::{Error, Result},
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

const PASSWORD_LENGTH: usize = 8;
const SAMPLE_PASSWORD_LETTERS: usize = 4;
const USERNAME_MIN_LENGTH: usize = 4;
const USERNAME_MAX_LENGTH: usize = 8;
const PASSWORD_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz1234567890";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Fields of a new provider.
#[derive(Debug, Clone, Default)]
pub struct NewProvider {
    /// Login name; derived from the names when `None`
    pub username: Option<String>,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// E-mail address
    pub email: Option<String>,
    /// Main phone number
    pub phone_number: Option<String>,
    /// Secondary phone number
    pub phone_number_extra: Option<String>,
    /// Access held by the provider
    pub access_id: i64,
}

/// Public view of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    /// Login name
    pub username: String,
    /// Display name
    pub name: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// E-mail address
    pub email: Option<String>,
    /// Main phone number
    pub phone_number: Option<String>,
    /// Secondary phone number
    pub phone_number_extra: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Creates an active provider holding an existing access.
pub async fn create_provider<C>(db: &C, new: NewProvider) -> Result<provider::Model>
where
    C: ConnectionTrait,
{
    get_access(db, new.access_id).await?;

    let username = match non_blank(new.username) {
        Some(username) => {
            if get_provider_by_username(db, &username).await?.is_some() {
                return Err(Error::Validation {
                    message: format!("Username `{username}` is already taken"),
                });
            }
            username
        }
        None => username_from_name(db, &new.first_name, &new.last_name).await?,
    };

    let created = provider::ActiveModel {
        username: Set(username),
        first_name: Set(new.first_name.trim().to_string()),
        last_name: Set(new.last_name.trim().to_string()),
        email: Set(non_blank(new.email)),
        phone_number: Set(non_blank(new.phone_number)),
        phone_number_extra: Set(non_blank(new.phone_number_extra)),
        access_id: Set(new.access_id),
        is_active: Set(true),
        created_on: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created provider {}", created.username);
    Ok(created)
}

/// Finds a provider by username.
pub async fn get_provider_by_username<C>(db: &C, username: &str) -> Result<Option<provider::Model>>
where
    C: ConnectionTrait,
{
    Provider::find()
        .filter(provider::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a provider by id.
pub async fn get_provider<C>(db: &C, provider_id: i64) -> Result<provider::Model>
where
    C: ConnectionTrait,
{
    Provider::find_by_id(provider_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ProviderNotFound {
            username: provider_id.to_string(),
        })
}

/// Active providers ordered by last then first name.
pub async fn list_active_providers(db: &DatabaseConnection) -> Result<Vec<provider::Model>> {
    Provider::find()
        .filter(provider::Column::IsActive.eq(true))
        .order_by_asc(provider::Column::LastName)
        .order_by_asc(provider::Column::FirstName)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks a provider inactive. Its reports and access are kept.
pub async fn deactivate_provider<C>(db: &C, provider_id: i64) -> Result<provider::Model>
where
    C: ConnectionTrait,
{
    let provider = get_provider(db, provider_id).await?;
    let mut active: provider::ActiveModel = provider.into();
    active.is_active = Set(false);
    let updated = active.update(db).await?;
    info!("Deactivated provider {}", updated.username);
    Ok(updated)
}

/// Preferred representation of a provider's name.
#[must_use]
pub fn display_name(provider: &provider::Model) -> String {
    match (provider.first_name.is_empty(), provider.last_name.is_empty()) {
        (false, false) => format!(
            "{} {}",
            title_case(&provider.first_name),
            title_case(&provider.last_name)
        ),
        (false, true) => title_case(&provider.first_name),
        (true, false) => title_case(&provider.last_name),
        (true, true) => provider.username.clone(),
    }
}

/// `Name (Access)`.
pub async fn name_access<C>(db: &C, provider: &provider::Model) -> Result<String>
where
    C: ConnectionTrait,
{
    let access = get_access(db, provider.access_id).await?;
    Ok(format!(
        "{} ({})",
        display_name(provider),
        access_name(db, &access).await?
    ))
}

/// Public fields of a provider.
#[must_use]
pub fn to_summary(provider: &provider::Model) -> ProviderSummary {
    ProviderSummary {
        username: provider.username.clone(),
        name: display_name(provider),
        first_name: provider.first_name.clone(),
        last_name: provider.last_name.clone(),
        email: provider.email.clone(),
        phone_number: provider.phone_number.clone(),
        phone_number_extra: provider.phone_number_extra.clone(),
    }
}

/// Lowercase ASCII slug: accents folded, anything but `[a-z0-9-]` dropped.
fn ascii_slug(text: &str) -> String {
    text.nfkd()
        .filter(char::is_ascii)
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Fits `text` plus an optional counter into the username length bounds.
fn fit_username(text: &str, counter: Option<&str>) -> String {
    let counter = counter.unwrap_or_default();
    let keep = USERNAME_MAX_LENGTH.saturating_sub(counter.len());
    let mut username: String = text.chars().take(keep).collect();
    username.push_str(counter);
    while username.len() < USERNAME_MIN_LENGTH {
        username.push('a');
    }
    username
}

/// Splits a trailing counter off a username (`jdoe12` → `("jdoe", Some(12))`).
fn split_counter(username: &str) -> (&str, Option<u64>) {
    let base = username.trim_end_matches(|c: char| c.is_ascii_digit());
    let counter = username[base.len()..].parse().ok();
    (base, counter)
}

/// First unused username in the `jdoe` form: first initial then last name.
///
/// Usernames hold 4 to 8 characters, padded with `a`. When taken, a numeric
/// counter is appended (or incremented) until a free one is found.
pub async fn username_from_name<C>(db: &C, first_name: &str, last_name: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let first = ascii_slug(first_name);
    let last = ascii_slug(last_name);
    let jdoe: String = first.chars().take(1).chain(last.chars()).collect();

    let mut username = fit_username(&jdoe, None);
    while get_provider_by_username(db, &username).await?.is_some() {
        let (base, counter) = split_counter(&username);
        let next = counter.map_or(1, |counter| counter + 1).to_string();
        username = fit_username(base, Some(&next));
    }
    Ok(username)
}

/// Random 8-character password of lowercase letters and digits.
#[must_use]
pub fn random_password() -> String {
    let mut rng = rand::rng();
    (0..PASSWORD_LENGTH)
        .map(|_| char::from(PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())]))
        .collect()
}

/// Easy to type password: 4 consecutive letters (wrapping after `z`) then a digit.
#[must_use]
pub fn random_sample_password() -> String {
    let mut rng = rand::rng();
    let start = rng.random_range(0..LETTERS.len());
    let mut password: String = (0..SAMPLE_PASSWORD_LETTERS)
        .map(|offset| char::from(LETTERS[(start + offset) % LETTERS.len()]))
        .collect();
    password.push(char::from(b'0' + rng.random_range(0..10u8)));
    password
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::{create_role, find_or_create_access};
    use crate::test_utils::{create_test_provider, setup_with_hierarchy};

    #[test]
    fn test_ascii_slug_and_fit() {
        assert_eq!(ascii_slug("Sékou Traoré"), "sekoutraore");
        assert_eq!(ascii_slug("N'Diaye"), "ndiaye");
        assert_eq!(fit_username("jo", None), "joaa");
        assert_eq!(fit_username("atraorelong", None), "atraorel");
        assert_eq!(fit_username("atraorel", Some("12")), "atraor12");
        assert_eq!(split_counter("jdoe12"), ("jdoe", Some(12)));
        assert_eq!(split_counter("jdoe"), ("jdoe", None));
    }

    #[test]
    fn test_random_passwords() {
        let password = random_password();
        assert_eq!(password.len(), 8);
        assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));

        let sample = random_sample_password();
        let bytes = sample.as_bytes();
        assert_eq!(bytes.len(), 5);
        assert!(bytes[4].is_ascii_digit());
        for pair in bytes[..4].windows(2) {
            assert!(pair[1] == pair[0] + 1 || (pair[0] == b'z' && pair[1] == b'a'));
        }
    }

    #[tokio::test]
    async fn test_usernames_are_unique() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_role(&db, "agent", "Agent", None).await?;
        let access = find_or_create_access(&db, "agent", &tree.facility).await?;

        let first = create_test_provider(&db, "Awa", "Traoré", access.id).await?;
        let second = create_test_provider(&db, "Aminata", "Traore", access.id).await?;
        let third = create_test_provider(&db, "Adama", "Traoré", access.id).await?;
        assert_eq!(first.username, "atraore");
        assert_eq!(second.username, "atraore1");
        assert_eq!(third.username, "atraore2");

        let short = create_test_provider(&db, "", "Ba", access.id).await?;
        assert_eq!(short.username, "baaa");
        Ok(())
    }

    #[tokio::test]
    async fn test_explicit_username_must_be_free() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_role(&db, "agent", "Agent", None).await?;
        let access = find_or_create_access(&db, "agent", &tree.facility).await?;

        let new = NewProvider {
            username: Some("admin".to_string()),
            first_name: "Fatou".to_string(),
            last_name: "Diallo".to_string(),
            phone_number: Some(String::new()),
            access_id: access.id,
            ..NewProvider::default()
        };
        let created = create_provider(&db, new.clone()).await?;
        assert_eq!(created.username, "admin");
        assert_eq!(created.phone_number, None);
        assert!(matches!(
            create_provider(&db, new).await,
            Err(Error::Validation { .. })
        ));

        let unknown_access = NewProvider {
            access_id: 999,
            ..NewProvider::default()
        };
        assert!(matches!(
            create_provider(&db, unknown_access).await,
            Err(Error::AccessNotFound { id: 999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_names_and_listing() -> Result<()> {
        let (db, tree) = setup_with_hierarchy().await?;
        create_role(&db, "manager", "Manager", None).await?;
        let access = find_or_create_access(&db, "manager", &tree.district).await?;

        let awa = create_test_provider(&db, "awa", "keita", access.id).await?;
        let moussa = create_test_provider(&db, "moussa", "", access.id).await?;
        assert_eq!(display_name(&awa), "Awa Keita");
        assert_eq!(display_name(&moussa), "Moussa");
        assert_eq!(name_access(&db, &awa).await?, "Awa Keita (Manager on Kita)");
        assert_eq!(to_summary(&awa).name, "Awa Keita");

        deactivate_provider(&db, moussa.id).await?;
        let active = list_active_providers(&db).await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, awa.id);

        assert!(matches!(
            get_provider(&db, 999).await,
            Err(Error::ProviderNotFound { .. })
        ));
        Ok(())
    }
}
