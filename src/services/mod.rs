//! Services layer - Business logic
//!
//! This module contains the services of blogkit:
//! - Criteria queries for blogs, entries and tags (`query`)
//! - CRUD with validation and cache maintenance per entity
//! - Entity to DTO mapping (`mapper`)

pub mod blog;
pub mod entry;
pub mod error;
pub mod mapper;
pub mod query;
pub mod tag;
pub mod user;

pub use blog::BlogService;
pub use entry::EntryService;
pub use error::EntityServiceError;
pub use mapper::{BlogDto, EntryDto, TagDto, UserDto};
pub use query::{
    BlogQueryService, EntryQueryService, QueryService, QueryServiceError, TagQueryService,
};
pub use tag::TagService;
pub use user::UserService;
