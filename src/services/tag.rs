//! Tag service
//!
//! Create, replace, read and delete tags. Single tags are read through the
//! `Tag` cache region; any tag write invalidates the cached tag lists of
//! entries.

use crate::cache::{regions, CacheLayer, CacheManager};
use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagInput};
use crate::services::error::min_length;
use crate::services::mapper::{decode_image, TagDto};
use crate::services::EntityServiceError;
use anyhow::Context;
use std::sync::Arc;

const ENTITY: &str = "Tag";

pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<CacheManager>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<CacheManager>) -> Self {
        Self { repo, cache }
    }

    /// Create a tag. The input must not carry an id.
    pub async fn create(&self, input: TagInput) -> Result<TagDto, EntityServiceError> {
        tracing::debug!("Request to save Tag: {:?}", input.name);
        if input.id.is_some() {
            return Err(EntityServiceError::invalid(
                "A new tag cannot already have an ID",
            ));
        }

        let tag = validate(0, input)?;
        let created = self.repo.create(&tag).await.context("Failed to create tag")?;
        let _ = self
            .cache
            .region(regions::TAG)
            .set(&created.id.to_string(), &created)
            .await;

        Ok(created.into())
    }

    /// Replace every field of an existing tag
    pub async fn update(&self, input: TagInput) -> Result<TagDto, EntityServiceError> {
        tracing::debug!("Request to update Tag: {:?}", input.id);
        let id = input
            .id
            .ok_or_else(|| EntityServiceError::invalid("Invalid id"))?;

        let tag = validate(id, input)?;
        if self.find(id).await?.is_none() {
            return Err(EntityServiceError::not_found(ENTITY, id));
        }

        self.repo.update(&tag).await.context("Failed to update tag")?;
        self.evict(id).await;

        Ok(tag.into())
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<TagDto>, EntityServiceError> {
        tracing::debug!("Request to get Tag: {}", id);
        Ok(self.find(id).await?.map(TagDto::from))
    }

    /// Delete a tag and unlink it from every entry
    pub async fn delete(&self, id: i64) -> Result<(), EntityServiceError> {
        tracing::debug!("Request to delete Tag: {}", id);
        self.repo.delete(id).await.context("Failed to delete tag")?;
        self.evict(id).await;
        Ok(())
    }

    /// The existing tags among `ids`
    pub(crate) async fn find_all(&self, ids: &[i64]) -> Result<Vec<Tag>, EntityServiceError> {
        let tags = self
            .repo
            .get_by_ids(ids)
            .await
            .context("Failed to get tags")?;
        Ok(tags)
    }

    async fn find(&self, id: i64) -> Result<Option<Tag>, EntityServiceError> {
        let region = self.cache.region(regions::TAG);
        let key = id.to_string();
        if let Some(tag) = region.get::<Tag>(&key).await.ok().flatten() {
            return Ok(Some(tag));
        }

        let tag = self.repo.get_by_id(id).await.context("Failed to get tag")?;
        if let Some(ref t) = tag {
            let _ = region.set(&key, t).await;
        }
        Ok(tag)
    }

    async fn evict(&self, id: i64) {
        let _ = self.cache.region(regions::TAG).delete(&id.to_string()).await;
        let _ = self.cache.region(regions::ENTRY_TAGS).clear().await;
    }
}

fn validate(id: i64, input: TagInput) -> Result<Tag, EntityServiceError> {
    let name = min_length(input.name, "name", 2)?;

    let image = match input.image {
        Some(encoded) => Some(decode_image(&encoded).map_err(|e| {
            EntityServiceError::invalid(format!("'image' is not valid base64: {}", e))
        })?),
        None => None,
    };
    if image.is_some() && input.image_content_type.is_none() {
        return Err(EntityServiceError::invalid(
            "'imageContentType' is required when an image is present",
        ));
    }

    Ok(Tag {
        id,
        name,
        image,
        image_content_type: input.image_content_type,
    })
}
