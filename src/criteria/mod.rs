//! Criteria filtering
//!
//! One generic engine turns optional, typed per-field filters into a single
//! database predicate for any entity described by an [`EntitySchema`]:
//!
//! - [`filter`]: operators, operand values and per-field filters
//! - [`schema`]: the static field tables for blogs, entries and tags
//! - [`parse`]: `field.operator=value` query parameters into [`Criteria`]
//! - [`predicate`]: the predicate tree built from a criteria object
//! - [`sql`]: predicate to parameterised SQL for SQLite or MySQL
//!
//! ```ignore
//! let criteria = Criteria::new(&ENTRY_SCHEMA)
//!     .with("title", Filter::contains("Rust"))?
//!     .with("tagId", Filter::equals(3))?;
//! let entries = entry_query_service.find_by_criteria(&criteria, &[]).await?;
//! ```

pub mod filter;
pub mod parse;
pub mod predicate;
pub mod schema;
pub mod sql;

pub use filter::{FieldKind, Filter, FilterValue, Operator, RangeBounds};
pub use parse::{parse_query, ListQuery};
pub use predicate::Predicate;
pub use schema::{EntitySchema, FieldDef, BLOG_SCHEMA, ENTRY_SCHEMA, TAG_SCHEMA};
pub use sql::{CompiledQuery, CriteriaSql, Dialect};

/// Client errors raised while reading criteria and page parameters
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CriteriaError {
    #[error("Unknown filter field '{field}' for {entity}")]
    UnknownField { entity: &'static str, field: String },
    #[error("Unknown filter operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },
    #[error("Operator '{operator}' is not supported for {kind} field '{field}'")]
    OperatorNotAllowed {
        field: String,
        operator: String,
        kind: FieldKind,
    },
    #[error("Invalid value '{value}' for '{field}.{operator}': expected {expected}")]
    InvalidValue {
        field: String,
        operator: String,
        value: String,
        expected: String,
    },
    #[error("Field '{field}' already has a '{existing}' filter; '{operator}' cannot be combined with it")]
    ConflictingFilters {
        field: String,
        existing: String,
        operator: String,
    },
    #[error("Unknown query parameter '{0}'")]
    UnknownParameter(String),
    #[error("Invalid page parameter '{name}': '{value}'")]
    InvalidPageParameter { name: &'static str, value: String },
    #[error("Cannot sort by '{0}'")]
    InvalidSort(String),
}

/// A filter attached to one schema field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: &'static FieldDef,
    pub filter: Filter,
}

/// A bundle of per-field filters for one entity.
///
/// Fields without a filter are unconstrained; an empty criteria object
/// matches every row.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    schema: &'static EntitySchema,
    filters: Vec<FieldFilter>,
}

impl Criteria {
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            filters: Vec::new(),
        }
    }

    /// Attach a filter to `field`.
    ///
    /// Fails for unknown fields, operands of the wrong kind and fields that
    /// already carry a filter.
    pub fn with(mut self, field: &str, filter: Filter) -> Result<Self, CriteriaError> {
        let def = self
            .schema
            .field(field)
            .ok_or_else(|| CriteriaError::UnknownField {
                entity: self.schema.name,
                field: field.to_string(),
            })?;

        if let Err(operator) = filter.check_kind(def.kind) {
            return Err(CriteriaError::OperatorNotAllowed {
                field: field.to_string(),
                operator: operator.to_string(),
                kind: def.kind,
            });
        }

        if let Some(existing) = self.get(field) {
            return Err(CriteriaError::ConflictingFilters {
                field: field.to_string(),
                existing: existing.operator_name().to_string(),
                operator: filter.operator_name().to_string(),
            });
        }

        self.filters.push(FieldFilter { field: def, filter });
        Ok(self)
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn get(&self, field: &str) -> Option<&Filter> {
        self.filters
            .iter()
            .find(|f| f.field.name == field)
            .map(|f| &f.filter)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Build the predicate for these criteria
    pub fn to_predicate(&self) -> Predicate {
        Predicate::from_criteria(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_rejects_unknown_field() {
        let err = Criteria::new(&TAG_SCHEMA)
            .with("color", Filter::equals("red"))
            .unwrap_err();
        assert!(matches!(err, CriteriaError::UnknownField { entity: "tag", .. }));
    }

    #[test]
    fn test_with_rejects_wrong_kind() {
        let err = Criteria::new(&ENTRY_SCHEMA)
            .with("blogId", Filter::contains("1"))
            .unwrap_err();
        assert!(matches!(err, CriteriaError::OperatorNotAllowed { .. }));
    }

    #[test]
    fn test_with_rejects_second_filter_on_field() {
        let err = Criteria::new(&ENTRY_SCHEMA)
            .with("title", Filter::equals("A"))
            .unwrap()
            .with("title", Filter::any_of(["A", "B"]))
            .unwrap_err();
        assert!(matches!(err, CriteriaError::ConflictingFilters { .. }));
    }

    #[test]
    fn test_get_and_is_empty() {
        let criteria = Criteria::new(&BLOG_SCHEMA);
        assert!(criteria.is_empty());

        let criteria = criteria.with("userId", Filter::Specified(false)).unwrap();
        assert!(!criteria.is_empty());
        assert_eq!(criteria.get("userId"), Some(&Filter::Specified(false)));
        assert_eq!(criteria.get("name"), None);
    }
}
