//! Criteria query service
//!
//! One read-only service for every filterable entity. A query service is
//! bound to an entity schema and a repository; each call rebuilds the
//! predicate from the criteria, runs it, and maps the results to DTOs.

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Context;

use crate::criteria::{Criteria, EntitySchema, BLOG_SCHEMA, ENTRY_SCHEMA, TAG_SCHEMA};
use crate::db::repositories::CriteriaRepository;
use crate::models::{Blog, Entry, Page, PageRequest, SortOrder, Tag};
use crate::services::mapper::{BlogDto, EntryDto, TagDto};

/// Error types for criteria queries
#[derive(Debug, thiserror::Error)]
pub enum QueryServiceError {
    /// Criteria built for a different entity
    #[error("Criteria for '{actual}' cannot query '{expected}'")]
    WrongEntity {
        expected: &'static str,
        actual: &'static str,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Criteria queries for entity `E`, answered as DTOs `D`
pub struct QueryService<E, D> {
    schema: &'static EntitySchema,
    repo: Arc<dyn CriteriaRepository<E>>,
    _dto: PhantomData<fn() -> D>,
}

pub type BlogQueryService = QueryService<Blog, BlogDto>;
pub type EntryQueryService = QueryService<Entry, EntryDto>;
pub type TagQueryService = QueryService<Tag, TagDto>;

impl BlogQueryService {
    pub fn for_blogs(repo: Arc<dyn CriteriaRepository<Blog>>) -> Self {
        Self::new(&BLOG_SCHEMA, repo)
    }
}

impl EntryQueryService {
    pub fn for_entries(repo: Arc<dyn CriteriaRepository<Entry>>) -> Self {
        Self::new(&ENTRY_SCHEMA, repo)
    }
}

impl TagQueryService {
    pub fn for_tags(repo: Arc<dyn CriteriaRepository<Tag>>) -> Self {
        Self::new(&TAG_SCHEMA, repo)
    }
}

impl<E, D> QueryService<E, D>
where
    E: Send + 'static,
    D: From<E>,
{
    pub fn new(schema: &'static EntitySchema, repo: Arc<dyn CriteriaRepository<E>>) -> Self {
        Self {
            schema,
            repo,
            _dto: PhantomData,
        }
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// All matches, ordered by `sort` and then id
    pub async fn find_by_criteria(
        &self,
        criteria: &Criteria,
        sort: &[SortOrder],
    ) -> Result<Vec<D>, QueryServiceError> {
        self.check_entity(criteria)?;
        tracing::debug!("find by criteria: {} {:?}", self.schema.name, criteria.filters());

        let predicate = criteria.to_predicate();
        let items = self
            .repo
            .find_matching(&predicate, sort, None)
            .await
            .with_context(|| format!("Failed to find {} by criteria", self.schema.name))?;

        Ok(items.into_iter().map(D::from).collect())
    }

    /// One page of matches plus the total match count
    pub async fn find_page_by_criteria(
        &self,
        criteria: &Criteria,
        page: &PageRequest,
    ) -> Result<Page<D>, QueryServiceError> {
        self.check_entity(criteria)?;
        tracing::debug!(
            "find by criteria: {} {:?}, page: {:?}",
            self.schema.name,
            criteria.filters(),
            page
        );

        let predicate = criteria.to_predicate();
        let items = self
            .repo
            .find_matching(&predicate, &page.sort, Some(page))
            .await
            .with_context(|| format!("Failed to find {} page by criteria", self.schema.name))?;
        let total = self
            .repo
            .count_matching(&predicate)
            .await
            .with_context(|| format!("Failed to count {} by criteria", self.schema.name))?;

        Ok(Page::new(items, total, page).map(D::from))
    }

    /// Number of matches
    pub async fn count_by_criteria(&self, criteria: &Criteria) -> Result<i64, QueryServiceError> {
        self.check_entity(criteria)?;
        tracing::debug!("count by criteria: {} {:?}", self.schema.name, criteria.filters());

        let count = self
            .repo
            .count_matching(&criteria.to_predicate())
            .await
            .with_context(|| format!("Failed to count {} by criteria", self.schema.name))?;
        Ok(count)
    }

    fn check_entity(&self, criteria: &Criteria) -> Result<(), QueryServiceError> {
        if criteria.schema().name != self.schema.name {
            return Err(QueryServiceError::WrongEntity {
                expected: self.schema.name,
                actual: criteria.schema().name,
            });
        }
        Ok(())
    }
}
