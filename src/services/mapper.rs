//! Entity to DTO mapping
//!
//! DTOs are what the REST layer serializes. Relationships are flattened to
//! the related id plus one display field, and tag images travel as base64.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Blog, Entry, Tag, User};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogDto {
    pub id: i64,
    pub name: String,
    pub handle: String,
    pub user_id: Option<i64>,
    pub user_login: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagDto {
    pub id: i64,
    pub name: String,
    /// Base64 of the image bytes
    pub image: Option<String>,
    pub image_content_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntryDto {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub date: DateTime<Utc>,
    pub blog_id: i64,
    pub blog_name: String,
    pub tags: Vec<TagDto>,
}

/// Public view of a user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub login: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub activated: bool,
    pub lang_key: Option<String>,
    pub created_date: DateTime<Utc>,
    pub authorities: Vec<String>,
}

impl From<Blog> for BlogDto {
    fn from(blog: Blog) -> Self {
        let (user_id, user_login) = match blog.user {
            Some(user) => (Some(user.id), Some(user.login)),
            None => (None, None),
        };
        Self {
            id: blog.id,
            name: blog.name,
            handle: blog.handle,
            user_id,
            user_login,
        }
    }
}

impl From<Tag> for TagDto {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
            image: tag.image.map(|bytes| STANDARD.encode(bytes)),
            image_content_type: tag.image_content_type,
        }
    }
}

impl From<Entry> for EntryDto {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            content: entry.content,
            date: entry.date,
            blog_id: entry.blog.id,
            blog_name: entry.blog.name,
            tags: entry.tags.into_iter().map(TagDto::from).collect(),
        }
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            activated: user.activated,
            lang_key: user.lang_key,
            created_date: user.created_at,
            authorities: user.authorities,
        }
    }
}

/// Decode a base64 tag image
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded.trim())
}
