//! Tag model

use serde::{Deserialize, Serialize};

/// Tag entity.
///
/// A tag may carry an image; `image_content_type` describes its bytes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// Tag name
    pub name: String,
    /// Raw image bytes
    pub image: Option<Vec<u8>>,
    /// MIME type of `image`
    pub image_content_type: Option<String>,
}

/// Tag write payload. `image` is base64 encoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInput {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub image_content_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_input_from_json() {
        let input: TagInput = serde_json::from_str(
            r#"{"id":4,"name":"rust","image":"AQ==","imageContentType":"image/jpg"}"#,
        )
        .unwrap();

        assert_eq!(input.id, Some(4));
        assert_eq!(input.image.as_deref(), Some("AQ=="));
        assert_eq!(input.image_content_type.as_deref(), Some("image/jpg"));
    }
}
