//! Entry service
//!
//! Create, replace, read and delete blog entries.
//!
//! A cached entry lives in two regions: the entry itself under `Entry` and
//! its tags under `Entry.tags`. Reads always take the tags from the
//! association region, so a tag write only has to clear that region.

use crate::cache::{regions, CacheLayer, CacheManager};
use crate::db::repositories::EntryRepository;
use crate::models::{BlogRef, Entry, EntryInput, Tag};
use crate::services::error::required;
use crate::services::mapper::EntryDto;
use crate::services::{BlogService, EntityServiceError, TagService};
use anyhow::Context;
use std::sync::Arc;

const ENTITY: &str = "Entry";

pub struct EntryService {
    repo: Arc<dyn EntryRepository>,
    blogs: Arc<BlogService>,
    tags: Arc<TagService>,
    cache: Arc<CacheManager>,
}

impl EntryService {
    pub fn new(
        repo: Arc<dyn EntryRepository>,
        blogs: Arc<BlogService>,
        tags: Arc<TagService>,
        cache: Arc<CacheManager>,
    ) -> Self {
        Self {
            repo,
            blogs,
            tags,
            cache,
        }
    }

    /// Create an entry. The input must not carry an id.
    pub async fn create(&self, input: EntryInput) -> Result<EntryDto, EntityServiceError> {
        tracing::debug!("Request to save Entry: {:?}", input.title);
        if input.id.is_some() {
            return Err(EntityServiceError::invalid(
                "A new entry cannot already have an ID",
            ));
        }

        let entry = self.validate(0, input).await?;
        let created = self
            .repo
            .create(&entry)
            .await
            .context("Failed to create entry")?;
        self.store(&created).await;

        Ok(created.into())
    }

    /// Replace every field of an existing entry, tag links included
    pub async fn update(&self, input: EntryInput) -> Result<EntryDto, EntityServiceError> {
        tracing::debug!("Request to update Entry: {:?}", input.id);
        let id = input
            .id
            .ok_or_else(|| EntityServiceError::invalid("Invalid id"))?;

        let entry = self.validate(id, input).await?;
        if self.find(id).await?.is_none() {
            return Err(EntityServiceError::not_found(ENTITY, id));
        }

        self.repo
            .update(&entry)
            .await
            .context("Failed to update entry")?;
        self.evict(id).await;

        Ok(entry.into())
    }

    /// Get entry by ID, tags included
    pub async fn get_by_id(&self, id: i64) -> Result<Option<EntryDto>, EntityServiceError> {
        tracing::debug!("Request to get Entry: {}", id);
        Ok(self.find(id).await?.map(EntryDto::from))
    }

    /// Delete an entry. Deleting a missing entry succeeds.
    pub async fn delete(&self, id: i64) -> Result<(), EntityServiceError> {
        tracing::debug!("Request to delete Entry: {}", id);
        self.repo.delete(id).await.context("Failed to delete entry")?;
        self.evict(id).await;
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Option<Entry>, EntityServiceError> {
        let region = self.cache.region(regions::ENTRY);
        let key = id.to_string();

        let mut entry = match region.get::<Entry>(&key).await.ok().flatten() {
            Some(entry) => entry,
            None => {
                let loaded = self.repo.get_by_id(id).await.context("Failed to get entry")?;
                match loaded {
                    Some(entry) => {
                        self.store(&entry).await;
                        return Ok(Some(entry));
                    }
                    None => return Ok(None),
                }
            }
        };

        entry.tags = self.find_tags(id).await?;
        Ok(Some(entry))
    }

    async fn find_tags(&self, id: i64) -> Result<Vec<Tag>, EntityServiceError> {
        let region = self.cache.region(regions::ENTRY_TAGS);
        let key = id.to_string();
        if let Some(tags) = region.get::<Vec<Tag>>(&key).await.ok().flatten() {
            return Ok(tags);
        }

        let tags = self
            .repo
            .get_tags(id)
            .await
            .context("Failed to get entry tags")?;
        let _ = region.set(&key, &tags).await;
        Ok(tags)
    }

    async fn validate(&self, id: i64, input: EntryInput) -> Result<Entry, EntityServiceError> {
        let tag_ids = input.tag_ids().map_err(|index| {
            EntityServiceError::invalid(format!("Tag at position {} has no id", index))
        })?;
        let title = required(input.title, "title")?;
        let date = required(input.date, "date")?;
        let blog_id = required(input.blog_id, "blogId")?;

        let blog = self
            .blogs
            .find(blog_id)
            .await?
            .ok_or_else(|| EntityServiceError::invalid(format!("Blog {} does not exist", blog_id)))?;

        let tags = self.tags.find_all(&tag_ids).await?;
        if tags.len() != tag_ids.len() {
            let missing: Vec<String> = tag_ids
                .iter()
                .filter(|id| !tags.iter().any(|t| t.id == **id))
                .map(|id| id.to_string())
                .collect();
            return Err(EntityServiceError::invalid(format!(
                "Tags do not exist: {}",
                missing.join(", ")
            )));
        }

        Ok(Entry {
            id,
            title,
            content: input.content,
            date,
            blog: BlogRef {
                id: blog.id,
                name: blog.name,
            },
            tags,
        })
    }

    async fn store(&self, entry: &Entry) {
        let key = entry.id.to_string();
        let _ = self.cache.region(regions::ENTRY).set(&key, entry).await;
        let _ = self
            .cache
            .region(regions::ENTRY_TAGS)
            .set(&key, &entry.tags)
            .await;
    }

    async fn evict(&self, id: i64) {
        let key = id.to_string();
        let _ = self.cache.region(regions::ENTRY).delete(&key).await;
        let _ = self.cache.region(regions::ENTRY_TAGS).delete(&key).await;
    }
}
