//! Data models
//!
//! This module contains the data structures used throughout blogkit.
//! Models represent:
//! - Database entities (Blog, Entry, Tag, User, Authority)
//! - Write payloads accepted by the REST layer
//! - Page requests and paged results

mod blog;
mod entry;
mod page;
mod tag;
mod user;

pub use blog::{Blog, BlogInput, UserRef};
pub use entry::{BlogRef, Entry, EntryInput, TagLink};
pub use page::{Direction, Page, PageRequest, SortOrder};
pub use tag::{Tag, TagInput};
pub use user::{Authority, User};
