//! Blog model

use serde::{Deserialize, Serialize};

/// Blog entity.
///
/// A blog is optionally owned by one user; one user may own many blogs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Blog {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Short handle
    pub handle: String,
    /// Owning user, if any
    pub user: Option<UserRef>,
}

/// Id and login of a referenced user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRef {
    pub id: i64,
    pub login: String,
}

/// Blog write payload, as sent by clients on POST and PUT.
///
/// Every field is optional on the wire; the blog service decides which
/// ones are required. `userLogin` is accepted and ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogInput {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub handle: Option<String>,
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blog_input_from_camel_case_json() {
        let input: BlogInput = serde_json::from_str(
            r#"{"name":"AAAAAAAAAA","handle":"AAAAAAAAAA","userId":3,"userLogin":"admin"}"#,
        )
        .unwrap();

        assert_eq!(input.id, None);
        assert_eq!(input.name.as_deref(), Some("AAAAAAAAAA"));
        assert_eq!(input.user_id, Some(3));
    }

    #[test]
    fn test_blog_input_missing_fields_are_none() {
        let input: BlogInput = serde_json::from_str("{}").unwrap();
        assert!(input.name.is_none());
        assert!(input.handle.is_none());
        assert!(input.user_id.is_none());
    }
}
