//! Predicate tree
//!
//! A predicate is built fresh from a criteria object on every query and
//! handed to the SQL compiler. It never holds literal SQL, only column
//! references and operand values.

use super::filter::{Filter, FilterValue, RangeBounds};
use super::schema::{FieldSource, JoinDef};
use super::{Criteria, FieldFilter};

/// A column qualified by its table alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub alias: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Ge,
    Lt,
    Le,
}

impl RangeOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            RangeOp::Gt => ">",
            RangeOp::Ge => ">=",
            RangeOp::Lt => "<",
            RangeOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row
    Always,
    And(Vec<Predicate>),
    Equals {
        column: ColumnRef,
        value: FilterValue,
    },
    NotEquals {
        column: ColumnRef,
        value: FilterValue,
    },
    In {
        column: ColumnRef,
        values: Vec<FilterValue>,
        negated: bool,
    },
    Range {
        column: ColumnRef,
        op: RangeOp,
        value: FilterValue,
    },
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    /// Case-sensitive substring test
    Contains {
        column: ColumnRef,
        needle: String,
        negated: bool,
    },
    /// `inner` is evaluated against the joined table
    Join {
        join: JoinDef,
        inner: Box<Predicate>,
    },
}

impl Predicate {
    /// Conjunction; `Always` is the identity
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::Always, p) | (p, Predicate::Always) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, q) => Predicate::And(vec![p, q]),
        }
    }

    /// Build the predicate for a whole criteria object
    pub fn from_criteria(criteria: &Criteria) -> Predicate {
        let alias = criteria.schema().alias;
        criteria
            .filters()
            .iter()
            .fold(Predicate::Always, |acc, f| acc.and(field_predicate(alias, f)))
    }
}

fn field_predicate(root_alias: &'static str, field_filter: &FieldFilter) -> Predicate {
    match field_filter.field.source {
        FieldSource::Column(column) => filter_predicate(
            ColumnRef {
                alias: root_alias,
                column,
            },
            &field_filter.filter,
        ),
        FieldSource::Join(join) => Predicate::Join {
            join,
            inner: Box::new(filter_predicate(
                ColumnRef {
                    alias: join.alias,
                    column: "id",
                },
                &field_filter.filter,
            )),
        },
    }
}

fn filter_predicate(column: ColumnRef, filter: &Filter) -> Predicate {
    match filter {
        Filter::Equals(value) => Predicate::Equals {
            column,
            value: value.clone(),
        },
        Filter::NotEquals(value) => Predicate::NotEquals {
            column,
            value: value.clone(),
        },
        Filter::In(values) => Predicate::In {
            column,
            values: values.clone(),
            negated: false,
        },
        Filter::NotIn(values) => Predicate::In {
            column,
            values: values.clone(),
            negated: true,
        },
        Filter::Specified(specified) => Predicate::IsNull {
            column,
            negated: *specified,
        },
        Filter::Range(bounds) => range_predicate(column, bounds),
        Filter::Contains(needle) => Predicate::Contains {
            column,
            needle: needle.clone(),
            negated: false,
        },
        Filter::DoesNotContain(needle) => Predicate::Contains {
            column,
            needle: needle.clone(),
            negated: true,
        },
    }
}

fn range_predicate(column: ColumnRef, bounds: &RangeBounds) -> Predicate {
    [
        (RangeOp::Gt, &bounds.greater_than),
        (RangeOp::Ge, &bounds.greater_or_equal),
        (RangeOp::Lt, &bounds.less_than),
        (RangeOp::Le, &bounds.less_or_equal),
    ]
    .into_iter()
    .filter_map(|(op, value)| {
        value.as_ref().map(|value| Predicate::Range {
            column,
            op,
            value: value.clone(),
        })
    })
    .fold(Predicate::Always, Predicate::and)
}
