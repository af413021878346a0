//! User service
//!
//! Cached read-only lookups of users and authorities.

use crate::cache::{regions, CacheLayer, CacheManager};
use crate::db::repositories::UserRepository;
use crate::models::{Authority, User};
use crate::services::EntityServiceError;
use anyhow::Context;
use std::sync::Arc;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
    cache: Arc<CacheManager>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, cache: Arc<CacheManager>) -> Self {
        Self { repo, cache }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, EntityServiceError> {
        let region = self.cache.region(regions::USER);
        let key = id.to_string();
        if let Some(user) = region.get::<User>(&key).await.ok().flatten() {
            return Ok(Some(user));
        }

        let user = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        if let Some(ref u) = user {
            let _ = region.set(&key, u).await;
        }
        Ok(user)
    }

    /// Get user by login
    pub async fn get_by_login(&self, login: &str) -> Result<Option<User>, EntityServiceError> {
        let region = self.cache.region(regions::USERS_BY_LOGIN);
        if let Some(user) = region.get::<User>(login).await.ok().flatten() {
            return Ok(Some(user));
        }

        let user = self
            .repo
            .get_by_login(login)
            .await
            .context("Failed to get user by login")?;
        if let Some(ref u) = user {
            let _ = region.set(login, u).await;
        }
        Ok(user)
    }

    /// Get user by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, EntityServiceError> {
        let region = self.cache.region(regions::USERS_BY_EMAIL);
        if let Some(user) = region.get::<User>(email).await.ok().flatten() {
            return Ok(Some(user));
        }

        let user = self
            .repo
            .get_by_email(email)
            .await
            .context("Failed to get user by email")?;
        if let Some(ref u) = user {
            let _ = region.set(email, u).await;
        }
        Ok(user)
    }

    /// Authority names of a user
    pub async fn get_authorities(&self, user_id: i64) -> Result<Vec<String>, EntityServiceError> {
        let region = self.cache.region(regions::USER_AUTHORITIES);
        let key = user_id.to_string();
        if let Some(names) = region.get::<Vec<String>>(&key).await.ok().flatten() {
            return Ok(names);
        }

        let names = self
            .repo
            .get_authorities(user_id)
            .await
            .context("Failed to get user authorities")?;
        let _ = region.set(&key, &names).await;
        Ok(names)
    }

    /// Get authority by name
    pub async fn get_authority(&self, name: &str) -> Result<Option<Authority>, EntityServiceError> {
        let region = self.cache.region(regions::AUTHORITY);
        if let Some(authority) = region.get::<Authority>(name).await.ok().flatten() {
            return Ok(Some(authority));
        }

        let authority = self
            .repo
            .get_authority(name)
            .await
            .context("Failed to get authority")?;
        if let Some(ref a) = authority {
            let _ = region.set(name, a).await;
        }
        Ok(authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> (Arc<CacheManager>, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let cache = create_cache(&CacheConfig::default());
        let service = UserService::new(SqlxUserRepository::boxed(pool), cache.clone());
        (cache, service)
    }

    #[tokio::test]
    async fn test_get_by_login_fills_cache() {
        let (cache, service) = setup_test_service().await;

        let admin = service.get_by_login("admin").await.unwrap().unwrap();
        assert_eq!(admin.id, 3);

        let cached: Option<User> = cache.region(regions::USERS_BY_LOGIN).get("admin").await.unwrap();
        assert_eq!(cached, Some(admin));
    }

    #[tokio::test]
    async fn test_lookups_by_id_and_email_agree() {
        let (_, service) = setup_test_service().await;

        let by_id = service.get_by_id(4).await.unwrap().unwrap();
        let by_email = service.get_by_email("user@localhost").await.unwrap().unwrap();
        assert_eq!(by_id, by_email);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_cached() {
        let (cache, service) = setup_test_service().await;

        assert!(service.get_by_login("nobody").await.unwrap().is_none());
        let cached: Option<User> = cache.region(regions::USERS_BY_LOGIN).get("nobody").await.unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_authorities() {
        let (cache, service) = setup_test_service().await;

        assert_eq!(
            service.get_authorities(3).await.unwrap(),
            vec!["ROLE_ADMIN", "ROLE_USER"]
        );
        let cached: Option<Vec<String>> =
            cache.region(regions::USER_AUTHORITIES).get("3").await.unwrap();
        assert!(cached.is_some());

        assert!(service.get_authority("ROLE_USER").await.unwrap().is_some());
        assert!(service.get_authority("ROLE_NONE").await.unwrap().is_none());
    }
}
