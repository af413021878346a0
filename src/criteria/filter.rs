//! Typed per-field filters

use chrono::{DateTime, Utc};
use std::fmt;

use crate::db::SqlValue;

/// Value type of a filterable field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Identifiers and other integers
    Long,
    /// Strings, compared byte-wise
    Text,
    /// UTC instants
    Timestamp,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Long => write!(f, "integer"),
            FieldKind::Text => write!(f, "string"),
            FieldKind::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// A single filter operand
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Long(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FilterValue::Long(_) => FieldKind::Long,
            FilterValue::Text(_) => FieldKind::Text,
            FilterValue::Timestamp(_) => FieldKind::Timestamp,
        }
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Long(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(v)
    }
}

impl From<FilterValue> for SqlValue {
    fn from(v: FilterValue) -> Self {
        match v {
            FilterValue::Long(v) => SqlValue::Integer(v),
            FilterValue::Text(v) => SqlValue::Text(v),
            FilterValue::Timestamp(v) => SqlValue::Timestamp(v),
        }
    }
}

/// Operator names accepted as `field.operator=value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Specified,
    GreaterThan,
    GreaterOrEqualThan,
    LessThan,
    LessOrEqualThan,
    Contains,
    DoesNotContain,
}

impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "equals" => Operator::Equals,
            "notEquals" => Operator::NotEquals,
            "in" => Operator::In,
            "notIn" => Operator::NotIn,
            "specified" => Operator::Specified,
            "greaterThan" => Operator::GreaterThan,
            "greaterOrEqualThan" | "greaterThanOrEqual" => Operator::GreaterOrEqualThan,
            "lessThan" => Operator::LessThan,
            "lessOrEqualThan" | "lessThanOrEqual" => Operator::LessOrEqualThan,
            "contains" => Operator::Contains,
            "doesNotContain" => Operator::DoesNotContain,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Specified => "specified",
            Operator::GreaterThan => "greaterThan",
            Operator::GreaterOrEqualThan => "greaterOrEqualThan",
            Operator::LessThan => "lessThan",
            Operator::LessOrEqualThan => "lessOrEqualThan",
            Operator::Contains => "contains",
            Operator::DoesNotContain => "doesNotContain",
        }
    }

    /// Substring operators only apply to strings
    pub fn allowed_for(&self, kind: FieldKind) -> bool {
        match self {
            Operator::Contains | Operator::DoesNotContain => kind == FieldKind::Text,
            _ => true,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Operator::GreaterThan
                | Operator::GreaterOrEqualThan
                | Operator::LessThan
                | Operator::LessOrEqualThan
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Range bounds; any combination may be set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub greater_than: Option<FilterValue>,
    pub greater_or_equal: Option<FilterValue>,
    pub less_than: Option<FilterValue>,
    pub less_or_equal: Option<FilterValue>,
}

impl RangeBounds {
    pub fn is_empty(&self) -> bool {
        self.greater_than.is_none()
            && self.greater_or_equal.is_none()
            && self.less_than.is_none()
            && self.less_or_equal.is_none()
    }

    /// The slot a range operator writes to
    pub(crate) fn slot_mut(&mut self, op: Operator) -> Option<&mut Option<FilterValue>> {
        match op {
            Operator::GreaterThan => Some(&mut self.greater_than),
            Operator::GreaterOrEqualThan => Some(&mut self.greater_or_equal),
            Operator::LessThan => Some(&mut self.less_than),
            Operator::LessOrEqualThan => Some(&mut self.less_or_equal),
            _ => None,
        }
    }

    fn values(&self) -> impl Iterator<Item = &FilterValue> {
        [
            &self.greater_than,
            &self.greater_or_equal,
            &self.less_than,
            &self.less_or_equal,
        ]
        .into_iter()
        .flatten()
    }
}

/// One field's constraint. A field carries at most one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(FilterValue),
    NotEquals(FilterValue),
    In(Vec<FilterValue>),
    NotIn(Vec<FilterValue>),
    /// `true` matches non-null values, `false` matches nulls
    Specified(bool),
    Range(RangeBounds),
    Contains(String),
    DoesNotContain(String),
}

impl Filter {
    pub fn equals(value: impl Into<FilterValue>) -> Self {
        Filter::Equals(value.into())
    }

    pub fn not_equals(value: impl Into<FilterValue>) -> Self {
        Filter::NotEquals(value.into())
    }

    pub fn any_of<V: Into<FilterValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(values.into_iter().map(Into::into).collect())
    }

    pub fn none_of<V: Into<FilterValue>>(values: impl IntoIterator<Item = V>) -> Self {
        Filter::NotIn(values.into_iter().map(Into::into).collect())
    }

    pub fn greater_than(value: impl Into<FilterValue>) -> Self {
        Filter::Range(RangeBounds {
            greater_than: Some(value.into()),
            ..Default::default()
        })
    }

    pub fn less_than(value: impl Into<FilterValue>) -> Self {
        Filter::Range(RangeBounds {
            less_than: Some(value.into()),
            ..Default::default()
        })
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Filter::Contains(needle.into())
    }

    pub fn does_not_contain(needle: impl Into<String>) -> Self {
        Filter::DoesNotContain(needle.into())
    }

    /// Check that every operand matches `kind` and that the operator
    /// applies to it. Returns the offending operator name on mismatch.
    pub fn check_kind(&self, kind: FieldKind) -> Result<(), &'static str> {
        let values: Vec<&FilterValue> = match self {
            Filter::Equals(v) => vec![v],
            Filter::NotEquals(v) => vec![v],
            Filter::In(vs) if vs.is_empty() => return Err("in"),
            Filter::NotIn(vs) if vs.is_empty() => return Err("notIn"),
            Filter::In(vs) | Filter::NotIn(vs) => vs.iter().collect(),
            Filter::Specified(_) => Vec::new(),
            Filter::Range(bounds) if bounds.is_empty() => return Err("range"),
            Filter::Range(bounds) => bounds.values().collect(),
            Filter::Contains(_) | Filter::DoesNotContain(_) => {
                if kind == FieldKind::Text {
                    return Ok(());
                }
                return Err(self.operator_name());
            }
        };
        if values.iter().all(|v| v.kind() == kind) {
            Ok(())
        } else {
            Err(self.operator_name())
        }
    }

    pub fn operator_name(&self) -> &'static str {
        match self {
            Filter::Equals(_) => "equals",
            Filter::NotEquals(_) => "notEquals",
            Filter::In(_) => "in",
            Filter::NotIn(_) => "notIn",
            Filter::Specified(_) => "specified",
            Filter::Range(_) => "range",
            Filter::Contains(_) => "contains",
            Filter::DoesNotContain(_) => "doesNotContain",
        }
    }
}
