//! First-start seeding.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use stockroom_auth::{Employee, NewEmployee, PasswordError, Role, hash_password};

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::store::{EmployeeRepository, Store};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot hash admin password: {0}")]
    Password(#[from] PasswordError),
}

/// Create the initial admin from `ADMIN_EMAIL` / `ADMIN_PASSWORD` when no
/// employee exists yet. Returns the created account, if any.
pub async fn seed_admin(
    store: &dyn Store,
    config: &AppConfig,
) -> Result<Option<Employee>, BootstrapError> {
    if store.count_employees().await? > 0 {
        return Ok(None);
    }
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        warn!("no employees exist and ADMIN_EMAIL/ADMIN_PASSWORD are not set; nobody can log in");
        return Ok(None);
    };

    let input = NewEmployee {
        name: "Administrator".to_string(),
        email: email.clone(),
        phone: None,
        address: None,
        role: Role::Admin,
        password: password.clone(),
        joined_on: None,
    };
    input.validate().map_err(StoreError::from)?;
    let hash = hash_password(password, config.password_rounds)?;
    let admin = Employee::create(input, hash, Utc::now()).map_err(StoreError::from)?;
    let admin = store.create_employee(admin).await?;
    info!(employee_id = %admin.id, email = %admin.email, "seeded initial admin account");
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use stockroom_auth::verify_password;

    fn config(email: Option<&str>, password: Option<&str>) -> AppConfig {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        config.admin_email = email.map(str::to_string);
        config.admin_password = password.map(str::to_string);
        config.password_rounds = 1000;
        config
    }

    #[tokio::test]
    async fn seeds_admin_on_empty_store() {
        let store = InMemoryStore::new();
        let admin = seed_admin(&store, &config(Some("Boss@Example.com"), Some("s3cret-pass")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "boss@example.com");
        assert!(verify_password("s3cret-pass", &admin.password_hash).unwrap());
        assert_eq!(store.count_employees().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn does_nothing_when_employees_exist() {
        let store = InMemoryStore::new();
        let cfg = config(Some("boss@example.com"), Some("s3cret-pass"));
        seed_admin(&store, &cfg).await.unwrap();

        assert!(seed_admin(&store, &cfg).await.unwrap().is_none());
        assert_eq!(store.count_employees().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn skips_without_credentials() {
        let store = InMemoryStore::new();
        assert!(seed_admin(&store, &config(None, None)).await.unwrap().is_none());
        assert_eq!(store.count_employees().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejects_weak_password() {
        let store = InMemoryStore::new();
        let err = seed_admin(&store, &config(Some("boss@example.com"), Some("short")))
            .await
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Store(StoreError::Domain(_))));
    }
}
