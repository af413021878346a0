//! Query-string criteria
//!
//! List and count endpoints accept filters as `field.operator=value` pairs
//! next to the paging parameters `page`, `size` and `sort`:
//!
//! ```text
//! /api/entries?title.contains=rust&date.greaterThan=2024-01-01T00:00:00Z&tagId.in=1,2&sort=date,desc
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};

use super::filter::{FieldKind, Filter, FilterValue, Operator, RangeBounds};
use super::schema::{EntitySchema, FieldDef};
use super::{Criteria, CriteriaError};
use crate::config::PaginationConfig;
use crate::models::{Direction, PageRequest, SortOrder};

/// Accepted for client compatibility and otherwise ignored
const IGNORED_PARAMS: &[&str] = &["eagerload", "cacheBuster"];

/// Criteria and page request read from one query string
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub criteria: Criteria,
    pub page: PageRequest,
}

/// Read criteria and paging parameters for `schema` from decoded query pairs
pub fn parse_query(
    schema: &'static EntitySchema,
    pairs: &[(String, String)],
    pagination: &PaginationConfig,
) -> Result<ListQuery, CriteriaError> {
    let mut filters: Vec<(&'static FieldDef, Filter)> = Vec::new();
    let mut page = PageRequest {
        page: 0,
        size: pagination.default_size.max(1),
        sort: Vec::new(),
    };

    for (key, value) in pairs {
        if let Some((field_name, op_name)) = key.split_once('.') {
            let field = schema
                .field(field_name)
                .ok_or_else(|| CriteriaError::UnknownField {
                    entity: schema.name,
                    field: field_name.to_string(),
                })?;
            let op = Operator::parse(op_name).ok_or_else(|| CriteriaError::UnknownOperator {
                field: field_name.to_string(),
                operator: op_name.to_string(),
            })?;
            if !op.allowed_for(field.kind) {
                return Err(CriteriaError::OperatorNotAllowed {
                    field: field_name.to_string(),
                    operator: op_name.to_string(),
                    kind: field.kind,
                });
            }

            let filter = parse_filter(field, op, value)?;
            match filters.iter_mut().find(|(f, _)| f.name == field.name) {
                Some((_, existing)) => merge(field, existing, op, filter)?,
                None => filters.push((field, filter)),
            }
            continue;
        }

        match key.as_str() {
            "page" => {
                page.page = value
                    .trim()
                    .parse()
                    .map_err(|_| CriteriaError::InvalidPageParameter {
                        name: "page",
                        value: value.clone(),
                    })?;
            }
            "size" => {
                let size: u32 = value
                    .trim()
                    .parse()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| CriteriaError::InvalidPageParameter {
                        name: "size",
                        value: value.clone(),
                    })?;
                page.size = size.min(pagination.max_size.max(1));
            }
            "sort" => page.sort.push(parse_sort(schema, value)?),
            k if IGNORED_PARAMS.contains(&k) => {}
            _ => return Err(CriteriaError::UnknownParameter(key.clone())),
        }
    }

    let mut criteria = Criteria::new(schema);
    for (field, filter) in filters {
        criteria = criteria.with(field.name, filter)?;
    }

    Ok(ListQuery { criteria, page })
}

fn parse_filter(field: &FieldDef, op: Operator, raw: &str) -> Result<Filter, CriteriaError> {
    let value = |raw: &str| parse_value(field, op, raw);

    let filter = match op {
        Operator::Equals => Filter::Equals(value(raw)?),
        Operator::NotEquals => Filter::NotEquals(value(raw)?),
        Operator::In => Filter::In(raw.split(',').map(value).collect::<Result<_, _>>()?),
        Operator::NotIn => Filter::NotIn(raw.split(',').map(value).collect::<Result<_, _>>()?),
        Operator::Specified => match raw.trim() {
            "true" => Filter::Specified(true),
            "false" => Filter::Specified(false),
            _ => return Err(invalid(field, op, raw, "true or false")),
        },
        Operator::Contains => Filter::Contains(raw.to_string()),
        Operator::DoesNotContain => Filter::DoesNotContain(raw.to_string()),
        Operator::GreaterThan
        | Operator::GreaterOrEqualThan
        | Operator::LessThan
        | Operator::LessOrEqualThan => {
            let mut bounds = RangeBounds::default();
            if let Some(slot) = bounds.slot_mut(op) {
                *slot = Some(value(raw)?);
            }
            Filter::Range(bounds)
        }
    };
    Ok(filter)
}

/// Fold a repeated key into the field's existing filter.
///
/// Range bounds combine with each other and `in`/`notIn` lists extend;
/// anything else is a conflict.
fn merge(
    field: &FieldDef,
    existing: &mut Filter,
    op: Operator,
    incoming: Filter,
) -> Result<(), CriteriaError> {
    let conflict = CriteriaError::ConflictingFilters {
        field: field.name.to_string(),
        existing: existing.operator_name().to_string(),
        operator: op.name().to_string(),
    };

    match (existing, incoming) {
        (Filter::Range(bounds), Filter::Range(mut new)) => {
            match (bounds.slot_mut(op), new.slot_mut(op)) {
                (Some(slot), Some(value)) if slot.is_none() => {
                    *slot = value.take();
                    Ok(())
                }
                _ => Err(conflict),
            }
        }
        (Filter::In(values), Filter::In(more)) | (Filter::NotIn(values), Filter::NotIn(more)) => {
            values.extend(more);
            Ok(())
        }
        _ => Err(conflict),
    }
}

fn parse_value(field: &FieldDef, op: Operator, raw: &str) -> Result<FilterValue, CriteriaError> {
    match field.kind {
        FieldKind::Long => raw
            .trim()
            .parse::<i64>()
            .map(FilterValue::Long)
            .map_err(|_| invalid(field, op, raw, "an integer")),
        FieldKind::Text => Ok(FilterValue::Text(raw.to_string())),
        FieldKind::Timestamp => parse_timestamp(raw)
            .map(FilterValue::Timestamp)
            .ok_or_else(|| invalid(field, op, raw, "an RFC 3339 timestamp")),
    }
}

/// Parse an instant.
///
/// RFC 3339 first; then the same shape without an offset (read as UTC),
/// optionally with a trailing `Z` and with or without seconds. A `+` in
/// an unencoded query string arrives as a space and is put back.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if raw.contains(' ') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw.replace(' ', "+")) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
}

fn parse_sort(schema: &EntitySchema, raw: &str) -> Result<SortOrder, CriteriaError> {
    let (property, direction) = match raw.split_once(',') {
        Some((property, direction)) => {
            let direction = match direction.trim().to_ascii_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                _ => return Err(CriteriaError::InvalidSort(raw.to_string())),
            };
            (property.trim(), direction)
        }
        None => (raw.trim(), Direction::Asc),
    };

    if schema.sort_column(property).is_none() {
        return Err(CriteriaError::InvalidSort(raw.to_string()));
    }

    Ok(SortOrder {
        property: property.to_string(),
        direction,
    })
}

fn invalid(field: &FieldDef, op: Operator, raw: &str, expected: &str) -> CriteriaError {
    CriteriaError::InvalidValue {
        field: field.name.to_string(),
        operator: op.name().to_string(),
        value: raw.to_string(),
        expected: expected.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::schema::{BLOG_SCHEMA, ENTRY_SCHEMA, TAG_SCHEMA};
    use chrono::TimeZone;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse(schema: &'static EntitySchema, items: &[(&str, &str)]) -> Result<ListQuery, CriteriaError> {
        parse_query(schema, &pairs(items), &PaginationConfig::default())
    }

    #[test]
    fn test_empty_query() {
        let query = parse(&ENTRY_SCHEMA, &[]).unwrap();
        assert!(query.criteria.is_empty());
        assert_eq!(query.page, PageRequest::default());
    }

    #[test]
    fn test_equals_on_text() {
        let query = parse(&ENTRY_SCHEMA, &[("title.equals", "AAAAAAAAAA")]).unwrap();
        assert_eq!(
            query.criteria.get("title"),
            Some(&Filter::equals("AAAAAAAAAA"))
        );
    }

    #[test]
    fn test_in_splits_on_commas_and_repeats_extend() {
        let query = parse(
            &ENTRY_SCHEMA,
            &[("tagId.in", "1,2"), ("tagId.in", "3")],
        )
        .unwrap();
        assert_eq!(query.criteria.get("tagId"), Some(&Filter::any_of([1i64, 2, 3])));
    }

    #[test]
    fn test_range_bounds_combine() {
        let query = parse(
            &ENTRY_SCHEMA,
            &[
                ("date.greaterOrEqualThan", "1970-01-01T00:00:00Z"),
                ("date.lessThan", "1970-01-02T00:00:00Z"),
            ],
        )
        .unwrap();

        match query.criteria.get("date") {
            Some(Filter::Range(bounds)) => {
                assert_eq!(
                    bounds.greater_or_equal,
                    Some(FilterValue::Timestamp(Utc.timestamp_opt(0, 0).unwrap()))
                );
                assert_eq!(
                    bounds.less_than,
                    Some(FilterValue::Timestamp(Utc.timestamp_opt(86_400, 0).unwrap()))
                );
                assert!(bounds.greater_than.is_none());
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_range_alias_names() {
        let query = parse(&ENTRY_SCHEMA, &[("id.greaterThanOrEqual", "5")]).unwrap();
        match query.criteria.get("id") {
            Some(Filter::Range(bounds)) => {
                assert_eq!(bounds.greater_or_equal, Some(FilterValue::Long(5)))
            }
            other => panic!("expected range, got {:?}", other),
        }
    }

    #[test]
    fn test_same_bound_twice_conflicts() {
        let err = parse(
            &ENTRY_SCHEMA,
            &[("id.lessThan", "5"), ("id.lessThan", "6")],
        )
        .unwrap_err();
        assert!(matches!(err, CriteriaError::ConflictingFilters { .. }));
    }

    #[test]
    fn test_equals_with_in_conflicts() {
        let err = parse(
            &ENTRY_SCHEMA,
            &[("title.equals", "A"), ("title.in", "A,B")],
        )
        .unwrap_err();
        assert!(matches!(err, CriteriaError::ConflictingFilters { .. }));
    }

    #[test]
    fn test_specified_values() {
        let query = parse(&BLOG_SCHEMA, &[("userId.specified", "false")]).unwrap();
        assert_eq!(query.criteria.get("userId"), Some(&Filter::Specified(false)));

        let err = parse(&BLOG_SCHEMA, &[("userId.specified", "yes")]).unwrap_err();
        assert!(matches!(err, CriteriaError::InvalidValue { .. }));
    }

    #[test]
    fn test_unknown_field_operator_and_parameter() {
        assert!(matches!(
            parse(&TAG_SCHEMA, &[("color.equals", "red")]),
            Err(CriteriaError::UnknownField { .. })
        ));
        assert!(matches!(
            parse(&TAG_SCHEMA, &[("name.startsWith", "r")]),
            Err(CriteriaError::UnknownOperator { .. })
        ));
        assert!(matches!(
            parse(&TAG_SCHEMA, &[("filter", "")]),
            Err(CriteriaError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_contains_not_allowed_on_numbers() {
        let err = parse(&ENTRY_SCHEMA, &[("blogId.contains", "1")]).unwrap_err();
        assert!(matches!(err, CriteriaError::OperatorNotAllowed { .. }));
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(
            parse(&ENTRY_SCHEMA, &[("id.equals", "abc")]),
            Err(CriteriaError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&ENTRY_SCHEMA, &[("date.lessThan", "yesterday")]),
            Err(CriteriaError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse(&ENTRY_SCHEMA, &[("tagId.in", "1,,2")]),
            Err(CriteriaError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_ignored_parameters() {
        let query = parse(&ENTRY_SCHEMA, &[("eagerload", "true"), ("cacheBuster", "123")]).unwrap();
        assert!(query.criteria.is_empty());
    }

    #[test]
    fn test_paging_parameters() {
        let query = parse(
            &ENTRY_SCHEMA,
            &[("page", "2"), ("size", "5"), ("sort", "date,desc"), ("sort", "title")],
        )
        .unwrap();

        assert_eq!(query.page.page, 2);
        assert_eq!(query.page.size, 5);
        assert_eq!(
            query.page.sort,
            vec![
                SortOrder {
                    property: "date".to_string(),
                    direction: Direction::Desc
                },
                SortOrder {
                    property: "title".to_string(),
                    direction: Direction::Asc
                },
            ]
        );
    }

    #[test]
    fn test_largest_page_number_accepted() {
        let query = parse(&ENTRY_SCHEMA, &[("page", "4294967295")]).unwrap();
        assert_eq!(query.page.page, u32::MAX);

        assert!(parse(&ENTRY_SCHEMA, &[("page", "4294967296")]).is_err());
    }

    #[test]
    fn test_size_is_capped() {
        let query = parse(&ENTRY_SCHEMA, &[("size", "100000")]).unwrap();
        assert_eq!(query.page.size, 2000);

        assert!(parse(&ENTRY_SCHEMA, &[("size", "0")]).is_err());
        assert!(parse(&ENTRY_SCHEMA, &[("page", "-1")]).is_err());
    }

    #[test]
    fn test_sort_only_on_own_columns() {
        assert!(matches!(
            parse(&ENTRY_SCHEMA, &[("sort", "blogId,asc")]),
            Err(CriteriaError::InvalidSort(_))
        ));
        assert!(matches!(
            parse(&ENTRY_SCHEMA, &[("sort", "title,sideways")]),
            Err(CriteriaError::InvalidSort(_))
        ));
    }

    #[test]
    fn test_timestamp_formats() {
        let epoch = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(parse_timestamp("1970-01-01T00:00:00Z"), Some(epoch));
        assert_eq!(parse_timestamp("1970-01-01T00:00Z"), Some(epoch));
        assert_eq!(parse_timestamp("1970-01-01T01:00:00+01:00"), Some(epoch));
        assert_eq!(parse_timestamp("1970-01-01T01:00:00 01:00"), Some(epoch));
        assert_eq!(parse_timestamp("1970-01-01T00:00:00"), Some(epoch));
        assert_eq!(parse_timestamp("1970-01-01"), None);
    }
}
