//! Blog service
//!
//! Create, replace, read and delete blogs. Single blogs are read through
//! the `Blog` cache region.

use crate::cache::{regions, CacheLayer, CacheManager};
use crate::db::repositories::BlogRepository;
use crate::models::{Blog, BlogInput, UserRef};
use crate::services::error::min_length;
use crate::services::mapper::BlogDto;
use crate::services::{EntityServiceError, UserService};
use anyhow::Context;
use std::sync::Arc;

const ENTITY: &str = "Blog";

pub struct BlogService {
    repo: Arc<dyn BlogRepository>,
    users: Arc<UserService>,
    cache: Arc<CacheManager>,
}

impl BlogService {
    pub fn new(
        repo: Arc<dyn BlogRepository>,
        users: Arc<UserService>,
        cache: Arc<CacheManager>,
    ) -> Self {
        Self { repo, users, cache }
    }

    /// Create a blog. The input must not carry an id.
    pub async fn create(&self, input: BlogInput) -> Result<BlogDto, EntityServiceError> {
        tracing::debug!("Request to save Blog: {:?}", input);
        if input.id.is_some() {
            return Err(EntityServiceError::invalid(
                "A new blog cannot already have an ID",
            ));
        }

        let blog = self.validate(0, input).await?;
        let created = self.repo.create(&blog).await.context("Failed to create blog")?;
        let _ = self
            .cache
            .region(regions::BLOG)
            .set(&created.id.to_string(), &created)
            .await;

        Ok(created.into())
    }

    /// Replace every field of an existing blog
    pub async fn update(&self, input: BlogInput) -> Result<BlogDto, EntityServiceError> {
        tracing::debug!("Request to update Blog: {:?}", input);
        let id = input
            .id
            .ok_or_else(|| EntityServiceError::invalid("Invalid id"))?;

        let blog = self.validate(id, input).await?;
        if self.find(id).await?.is_none() {
            return Err(EntityServiceError::not_found(ENTITY, id));
        }

        self.repo.update(&blog).await.context("Failed to update blog")?;
        self.evict(id).await;

        Ok(blog.into())
    }

    /// Get blog by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<BlogDto>, EntityServiceError> {
        tracing::debug!("Request to get Blog: {}", id);
        Ok(self.find(id).await?.map(BlogDto::from))
    }

    /// Delete a blog. Deleting a missing blog succeeds.
    pub async fn delete(&self, id: i64) -> Result<(), EntityServiceError> {
        tracing::debug!("Request to delete Blog: {}", id);
        self.repo.delete(id).await.context("Failed to delete blog")?;
        self.evict(id).await;
        Ok(())
    }

    /// Cached blog entity
    pub(crate) async fn find(&self, id: i64) -> Result<Option<Blog>, EntityServiceError> {
        let region = self.cache.region(regions::BLOG);
        let key = id.to_string();
        if let Some(blog) = region.get::<Blog>(&key).await.ok().flatten() {
            return Ok(Some(blog));
        }

        let blog = self.repo.get_by_id(id).await.context("Failed to get blog")?;
        if let Some(ref b) = blog {
            let _ = region.set(&key, b).await;
        }
        Ok(blog)
    }

    async fn validate(&self, id: i64, input: BlogInput) -> Result<Blog, EntityServiceError> {
        let name = min_length(input.name, "name", 3)?;
        let handle = min_length(input.handle, "handle", 2)?;

        let user = match input.user_id {
            Some(user_id) => {
                let user = self.users.get_by_id(user_id).await?.ok_or_else(|| {
                    EntityServiceError::invalid(format!("User {} does not exist", user_id))
                })?;
                Some(UserRef {
                    id: user.id,
                    login: user.login,
                })
            }
            None => None,
        };

        Ok(Blog {
            id,
            name,
            handle,
            user,
        })
    }

    async fn evict(&self, id: i64) {
        let _ = self.cache.region(regions::BLOG).delete(&id.to_string()).await;
        // cached entries carry the blog name
        let _ = self.cache.region(regions::ENTRY).clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxBlogRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> (Arc<CacheManager>, BlogService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default());
        let users = Arc::new(UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let service = BlogService::new(SqlxBlogRepository::boxed(pool), users, cache.clone());
        (cache, service)
    }

    fn input(name: &str, handle: &str, user_id: Option<i64>) -> BlogInput {
        BlogInput {
            id: None,
            name: Some(name.to_string()),
            handle: Some(handle.to_string()),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_create_blog() {
        let (_, service) = setup_test_service().await;

        let created = service
            .create(input("AAAAAAAAAA", "AAAAAAAAAA", Some(3)))
            .await
            .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.user_login.as_deref(), Some("admin"));

        let found = service.get_by_id(created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn test_create_with_id_fails() {
        let (_, service) = setup_test_service().await;
        let mut blog = input("AAAAAAAAAA", "AAAAAAAAAA", None);
        blog.id = Some(1);

        let result = service.create(blog).await;
        assert!(matches!(result, Err(EntityServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let (_, service) = setup_test_service().await;

        for bad in [
            input("AA", "AAAA", None),
            input("AAAA", "A", None),
            BlogInput {
                name: None,
                ..input("AAAA", "AAAA", None)
            },
            input("AAAA", "AAAA", Some(999)),
        ] {
            let result = service.create(bad).await;
            assert!(matches!(result, Err(EntityServiceError::ValidationError(_))));
        }
    }

    #[tokio::test]
    async fn test_update_blog_refreshes_cache() {
        let (cache, service) = setup_test_service().await;
        let created = service.create(input("Before", "before", None)).await.unwrap();

        let updated = service
            .update(BlogInput {
                id: Some(created.id),
                ..input("After", "after", Some(4))
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "After");
        assert_eq!(updated.user_login.as_deref(), Some("user"));

        let cached: Option<Blog> = cache
            .region(regions::BLOG)
            .get(&created.id.to_string())
            .await
            .unwrap();
        assert!(cached.is_none());
        assert_eq!(service.get_by_id(created.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_requires_id() {
        let (_, service) = setup_test_service().await;
        let result = service.update(input("Name", "handle", None)).await;
        assert!(matches!(result, Err(EntityServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_update_unknown_blog() {
        let (_, service) = setup_test_service().await;
        let result = service
            .update(BlogInput {
                id: Some(999),
                ..input("Name", "handle", None)
            })
            .await;
        assert!(matches!(result, Err(EntityServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_, service) = setup_test_service().await;
        let created = service.create(input("Gone", "gone", None)).await.unwrap();
        service.get_by_id(created.id).await.unwrap();

        service.delete(created.id).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert!(service.get_by_id(created.id).await.unwrap().is_none());
    }
}
