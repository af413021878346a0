//! Predicate to SQL
//!
//! Produces SQL with `?` placeholders plus the values to bind, in order.
//! Operand values never reach the SQL text.
//!
//! To-one relationships become LEFT JOINs on the outer query. To-many
//! relationships are tested inside an id sub-select over the same LEFT
//! joins, so a root row is returned at most once and counts stay exact.

use super::predicate::{ColumnRef, Predicate};
use super::schema::{EntitySchema, JoinDef, JoinPath};
use crate::config::DatabaseDriver;
use crate::db::SqlValue;
use crate::models::{PageRequest, SortOrder};

/// SQL flavour to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Mysql,
}

impl From<DatabaseDriver> for Dialect {
    fn from(driver: DatabaseDriver) -> Self {
        match driver {
            DatabaseDriver::Sqlite => Dialect::Sqlite,
            DatabaseDriver::Mysql => Dialect::Mysql,
        }
    }
}

/// SQL text plus its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// The FROM/WHERE part of a criteria query, ready to be wrapped in a
/// SELECT or a COUNT.
#[derive(Debug, Clone)]
pub struct CriteriaSql {
    schema: &'static EntitySchema,
    joins: Vec<JoinDef>,
    where_sql: String,
    params: Vec<SqlValue>,
}

impl CriteriaSql {
    pub fn compile(schema: &'static EntitySchema, predicate: &Predicate, dialect: Dialect) -> Self {
        let mut compiler = Compiler {
            schema,
            dialect,
            joins: Vec::new(),
            params: Vec::new(),
        };
        let where_sql = compiler.expr(predicate);

        Self {
            schema,
            joins: compiler.joins,
            where_sql,
            params: compiler.params,
        }
    }

    pub fn where_sql(&self) -> &str {
        &self.where_sql
    }

    /// `SELECT columns` over the filtered rows.
    ///
    /// `extra_joins` is spliced in after the root table for joins the
    /// caller needs for its own columns; its aliases must not clash with
    /// the schema's. Ordering follows `sort` and always ends on the root
    /// id, ascending unless `sort` already names it.
    pub fn select(
        &self,
        columns: &str,
        extra_joins: &str,
        sort: &[SortOrder],
        page: Option<&PageRequest>,
    ) -> CompiledQuery {
        let alias = self.schema.alias;
        let mut sql = format!("SELECT {} FROM {} {}", columns, self.schema.table, alias);
        if !extra_joins.is_empty() {
            sql.push(' ');
            sql.push_str(extra_joins);
        }
        self.push_joins(&mut sql);
        sql.push_str(" WHERE ");
        sql.push_str(&self.where_sql);

        let mut order: Vec<String> = Vec::new();
        let mut has_id = false;
        for s in sort {
            if let Some(column) = self.schema.sort_column(&s.property) {
                has_id |= column == "id";
                order.push(format!("{}.{} {}", alias, column, s.direction.as_sql()));
            }
        }
        if !has_id {
            order.push(format!("{}.id ASC", alias));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        let mut params = self.params.clone();
        if let Some(page) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Integer(page.limit()));
            params.push(SqlValue::Integer(page.offset()));
        }

        CompiledQuery { sql, params }
    }

    /// Number of distinct root rows matching the predicate
    pub fn count(&self) -> CompiledQuery {
        let alias = self.schema.alias;
        let mut sql = format!(
            "SELECT COUNT(DISTINCT {}.id) FROM {} {}",
            alias, self.schema.table, alias
        );
        self.push_joins(&mut sql);
        sql.push_str(" WHERE ");
        sql.push_str(&self.where_sql);

        CompiledQuery {
            sql,
            params: self.params.clone(),
        }
    }

    fn push_joins(&self, sql: &mut String) {
        for join in &self.joins {
            if let JoinPath::ForeignKey { column } = join.path {
                sql.push_str(&format!(
                    " LEFT JOIN {} {} ON {}.id = {}.{}",
                    join.table, join.alias, join.alias, self.schema.alias, column
                ));
            }
        }
    }
}

struct Compiler {
    schema: &'static EntitySchema,
    dialect: Dialect,
    joins: Vec<JoinDef>,
    params: Vec<SqlValue>,
}

impl Compiler {
    fn expr(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Always => "1 = 1".to_string(),
            Predicate::And(parts) if parts.is_empty() => "1 = 1".to_string(),
            Predicate::And(parts) => parts
                .iter()
                .map(|p| format!("({})", self.expr(p)))
                .collect::<Vec<_>>()
                .join(" AND "),
            Predicate::Equals { column, value } => {
                self.params.push(value.clone().into());
                format!("{} = ?", col(column))
            }
            Predicate::NotEquals { column, value } => {
                self.params.push(value.clone().into());
                format!("{} <> ?", col(column))
            }
            Predicate::In {
                column,
                values,
                negated,
            } => {
                self.params.extend(values.iter().cloned().map(SqlValue::from));
                let placeholders = vec!["?"; values.len()].join(", ");
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", col(column), op, placeholders)
            }
            Predicate::Range { column, op, value } => {
                self.params.push(value.clone().into());
                format!("{} {} ?", col(column), op.as_sql())
            }
            Predicate::IsNull { column, negated } => {
                if *negated {
                    format!("{} IS NOT NULL", col(column))
                } else {
                    format!("{} IS NULL", col(column))
                }
            }
            Predicate::Contains {
                column,
                needle,
                negated,
            } => {
                self.params.push(SqlValue::Text(needle.clone()));
                let cmp = if *negated { "= 0" } else { "> 0" };
                match self.dialect {
                    Dialect::Sqlite => format!("instr({}, ?) {}", col(column), cmp),
                    Dialect::Mysql => format!("INSTR(BINARY {}, ?) {}", col(column), cmp),
                }
            }
            Predicate::Join { join, inner } => match join.path {
                JoinPath::ForeignKey { .. } => {
                    if !self.joins.iter().any(|j| j.alias == join.alias) {
                        self.joins.push(*join);
                    }
                    self.expr(inner)
                }
                JoinPath::LinkTable {
                    table: link_table,
                    alias: link_alias,
                    owner_column,
                    target_column,
                } => {
                    let root = self.schema.alias;
                    let sub = format!("{}_{}", root, join.alias);
                    let inner_sql = self.expr(inner);
                    format!(
                        "{root}.id IN (SELECT {sub}.id FROM {table} {sub} \
                         LEFT JOIN {link_table} {link_alias} ON {link_alias}.{owner_column} = {sub}.id \
                         LEFT JOIN {target} {target_alias} ON {target_alias}.id = {link_alias}.{target_column} \
                         WHERE {inner_sql})",
                        table = self.schema.table,
                        target = join.table,
                        target_alias = join.alias,
                    )
                }
            },
        }
    }
}

fn col(column: &ColumnRef) -> String {
    format!("{}.{}", column.alias, column.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::schema::{BLOG_SCHEMA, ENTRY_SCHEMA, TAG_SCHEMA};
    use crate::criteria::{Criteria, Filter};
    use crate::models::Direction;

    fn compile(criteria: &Criteria, dialect: Dialect) -> CriteriaSql {
        CriteriaSql::compile(criteria.schema(), &criteria.to_predicate(), dialect)
    }

    #[test]
    fn test_empty_criteria_selects_everything() {
        let sql = compile(&Criteria::new(&TAG_SCHEMA), Dialect::Sqlite);
        let query = sql.select("tg.id", "", &[], None);

        assert_eq!(
            query.sql,
            "SELECT tg.id FROM tags tg WHERE 1 = 1 ORDER BY tg.id ASC"
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_values_are_bound_not_inlined() {
        let criteria = Criteria::new(&TAG_SCHEMA)
            .with("name", Filter::equals("x' OR '1'='1"))
            .unwrap();
        let query = compile(&criteria, Dialect::Sqlite).select("tg.id", "", &[], None);

        assert!(!query.sql.contains("OR '1'"));
        assert_eq!(
            query.params,
            vec![SqlValue::Text("x' OR '1'='1".to_string())]
        );
    }

    #[test]
    fn test_to_one_join_is_left_join_on_id() {
        let criteria = Criteria::new(&BLOG_SCHEMA)
            .with("userId", Filter::equals(3))
            .unwrap();
        let query = compile(&criteria, Dialect::Sqlite).count();

        assert_eq!(
            query.sql,
            "SELECT COUNT(DISTINCT bl.id) FROM blogs bl LEFT JOIN users u ON u.id = bl.user_id WHERE u.id = ?"
        );
        assert_eq!(query.params, vec![SqlValue::Integer(3)]);
    }

    #[test]
    fn test_to_many_join_uses_id_subselect() {
        let criteria = Criteria::new(&ENTRY_SCHEMA)
            .with("tagId", Filter::any_of([1i64, 2]))
            .unwrap();
        let sql = compile(&criteria, Dialect::Sqlite);

        assert_eq!(
            sql.where_sql(),
            "e.id IN (SELECT e_t.id FROM entries e_t \
             LEFT JOIN entry_tags et ON et.entry_id = e_t.id \
             LEFT JOIN tags t ON t.id = et.tag_id \
             WHERE t.id IN (?, ?))"
        );
        assert!(sql
            .count()
            .sql
            .starts_with("SELECT COUNT(DISTINCT e.id) FROM entries e WHERE e.id IN (SELECT"));
    }

    #[test]
    fn test_contains_per_dialect() {
        let criteria = Criteria::new(&ENTRY_SCHEMA)
            .with("title", Filter::does_not_contain("AAA"))
            .unwrap();

        assert_eq!(
            compile(&criteria, Dialect::Sqlite).where_sql(),
            "instr(e.title, ?) = 0"
        );
        assert_eq!(
            compile(&criteria, Dialect::Mysql).where_sql(),
            "INSTR(BINARY e.title, ?) = 0"
        );
    }

    #[test]
    fn test_params_follow_placeholder_order() {
        let criteria = Criteria::new(&ENTRY_SCHEMA)
            .with("title", Filter::contains("A"))
            .unwrap()
            .with("tagId", Filter::equals(9))
            .unwrap()
            .with("id", Filter::less_than(100))
            .unwrap();
        let page = PageRequest::new(1, 10);
        let query = compile(&criteria, Dialect::Sqlite).select("e.id", "", &[], Some(&page));

        assert_eq!(query.sql.matches('?').count(), query.params.len());
        assert_eq!(
            query.params,
            vec![
                SqlValue::Text("A".to_string()),
                SqlValue::Integer(9),
                SqlValue::Integer(100),
                SqlValue::Integer(10),
                SqlValue::Integer(10),
            ]
        );
    }

    #[test]
    fn test_sort_with_id_tiebreaker() {
        let sql = compile(&Criteria::new(&ENTRY_SCHEMA), Dialect::Sqlite);

        let sort = vec![SortOrder {
            property: "date".to_string(),
            direction: Direction::Desc,
        }];
        let query = sql.select("e.id", "", &sort, None);
        assert!(query.sql.ends_with("ORDER BY e.date DESC, e.id ASC"));

        let sort = vec![SortOrder {
            property: "id".to_string(),
            direction: Direction::Desc,
        }];
        let query = sql.select("e.id", "", &sort, None);
        assert!(query.sql.ends_with("ORDER BY e.id DESC"));
    }

    #[test]
    fn test_extra_joins_precede_criteria_joins() {
        let criteria = Criteria::new(&ENTRY_SCHEMA)
            .with("blogId", Filter::Specified(true))
            .unwrap();
        let query = compile(&criteria, Dialect::Sqlite).select(
            "e.id, eb.name",
            "LEFT JOIN blogs eb ON eb.id = e.blog_id",
            &[],
            None,
        );

        assert_eq!(
            query.sql,
            "SELECT e.id, eb.name FROM entries e LEFT JOIN blogs eb ON eb.id = e.blog_id \
             LEFT JOIN blogs b ON b.id = e.blog_id WHERE b.id IS NOT NULL ORDER BY e.id ASC"
        );
    }
}
