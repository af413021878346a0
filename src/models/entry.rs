//! Entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Blog entry.
///
/// `title` and `date` are always present; every entry belongs to exactly
/// one blog and carries an unordered set of tags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
    pub blog: BlogRef,
    pub tags: Vec<Tag>,
}

/// Id and name of the blog an entry belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogRef {
    pub id: i64,
    pub name: String,
}

/// Entry write payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInput {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub blog_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<TagLink>,
}

/// Reference to an existing tag inside an entry payload.
///
/// Clients usually echo whole tag objects back; only the id is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagLink {
    pub id: Option<i64>,
}

impl EntryInput {
    /// Distinct tag ids in first-seen order, or the first link missing an id
    pub fn tag_ids(&self) -> Result<Vec<i64>, usize> {
        let mut ids = Vec::with_capacity(self.tags.len());
        for (index, link) in self.tags.iter().enumerate() {
            let id = link.id.ok_or(index)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
