//! Declarative entity schemas
//!
//! Each filterable entity is described once: its table, the alias its
//! queries use, and for every filter name the value kind plus where the
//! value lives (an own column, or the id of a related entity).

use super::filter::FieldKind;

/// How a related table is reached from the root entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPath {
    /// `root.column = target.id`
    ForeignKey { column: &'static str },
    /// `root.id = link.owner_column AND link.target_column = target.id`
    LinkTable {
        table: &'static str,
        alias: &'static str,
        owner_column: &'static str,
        target_column: &'static str,
    },
}

/// A relationship the criteria may filter through.
///
/// Relationship filters always compare against `alias.id` of the joined
/// table, reached through LEFT joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinDef {
    /// Relationship name, e.g. `tags`
    pub name: &'static str,
    pub table: &'static str,
    pub alias: &'static str,
    pub path: JoinPath,
}

impl JoinDef {
    /// To-many joins can repeat root rows
    pub fn is_to_many(&self) -> bool {
        matches!(self.path, JoinPath::LinkTable { .. })
    }
}

/// Where a filter's value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Column(&'static str),
    Join(JoinDef),
}

/// One filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Name used on the wire, e.g. `blogId`
    pub name: &'static str,
    pub kind: FieldKind,
    pub source: FieldSource,
}

impl FieldDef {
    const fn column(name: &'static str, kind: FieldKind, column: &'static str) -> Self {
        Self {
            name,
            kind,
            source: FieldSource::Column(column),
        }
    }

    const fn join(name: &'static str, join: JoinDef) -> Self {
        Self {
            name,
            kind: FieldKind::Long,
            source: FieldSource::Join(join),
        }
    }

    /// Own-column fields are the only sortable ones
    pub fn own_column(&self) -> Option<&'static str> {
        match self.source {
            FieldSource::Column(column) => Some(column),
            FieldSource::Join(_) => None,
        }
    }
}

/// Filter layout of one entity
#[derive(Debug, PartialEq, Eq)]
pub struct EntitySchema {
    /// Entity name used in messages and alert headers
    pub name: &'static str,
    pub table: &'static str,
    pub alias: &'static str,
    pub fields: &'static [FieldDef],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column for a sort property, if it names an own column
    pub fn sort_column(&self, property: &str) -> Option<&'static str> {
        self.field(property).and_then(FieldDef::own_column)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }
}

const USER_JOIN: JoinDef = JoinDef {
    name: "user",
    table: "users",
    alias: "u",
    path: JoinPath::ForeignKey { column: "user_id" },
};

const BLOG_JOIN: JoinDef = JoinDef {
    name: "blog",
    table: "blogs",
    alias: "b",
    path: JoinPath::ForeignKey { column: "blog_id" },
};

const TAGS_JOIN: JoinDef = JoinDef {
    name: "tags",
    table: "tags",
    alias: "t",
    path: JoinPath::LinkTable {
        table: "entry_tags",
        alias: "et",
        owner_column: "entry_id",
        target_column: "tag_id",
    },
};

pub static BLOG_SCHEMA: EntitySchema = EntitySchema {
    name: "blog",
    table: "blogs",
    alias: "bl",
    fields: &[
        FieldDef::column("id", FieldKind::Long, "id"),
        FieldDef::column("name", FieldKind::Text, "name"),
        FieldDef::column("handle", FieldKind::Text, "handle"),
        FieldDef::join("userId", USER_JOIN),
    ],
};

pub static ENTRY_SCHEMA: EntitySchema = EntitySchema {
    name: "entry",
    table: "entries",
    alias: "e",
    fields: &[
        FieldDef::column("id", FieldKind::Long, "id"),
        FieldDef::column("title", FieldKind::Text, "title"),
        FieldDef::column("date", FieldKind::Timestamp, "date"),
        FieldDef::join("blogId", BLOG_JOIN),
        FieldDef::join("tagId", TAGS_JOIN),
    ],
};

pub static TAG_SCHEMA: EntitySchema = EntitySchema {
    name: "tag",
    table: "tags",
    alias: "tg",
    fields: &[
        FieldDef::column("id", FieldKind::Long, "id"),
        FieldDef::column("name", FieldKind::Text, "name"),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let field = ENTRY_SCHEMA.field("tagId").unwrap();
        assert_eq!(field.kind, FieldKind::Long);
        assert!(matches!(field.source, FieldSource::Join(j) if j.is_to_many()));

        assert!(ENTRY_SCHEMA.field("content").is_none());
        assert!(TAG_SCHEMA.field("image").is_none());
    }

    #[test]
    fn test_sort_columns_are_own_columns() {
        assert_eq!(ENTRY_SCHEMA.sort_column("date"), Some("date"));
        assert_eq!(ENTRY_SCHEMA.sort_column("blogId"), None);
        assert_eq!(BLOG_SCHEMA.sort_column("handle"), Some("handle"));
    }

    #[test]
    fn test_aliases_do_not_collide() {
        for schema in [&BLOG_SCHEMA, &ENTRY_SCHEMA, &TAG_SCHEMA] {
            let mut aliases = vec![schema.alias];
            for field in schema.fields {
                if let FieldSource::Join(join) = field.source {
                    aliases.push(join.alias);
                    if let JoinPath::LinkTable { alias, .. } = join.path {
                        aliases.push(alias);
                    }
                }
            }
            let count = aliases.len();
            aliases.sort();
            aliases.dedup();
            assert_eq!(aliases.len(), count, "alias clash in {}", schema.name);
        }
    }
}
