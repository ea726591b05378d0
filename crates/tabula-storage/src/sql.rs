//! Renders query plans into parameterized SQL.
//!
//! Parameters are positional and appear in predicate order. An `in` lookup
//! contributes one parameter per element and `isnull` contributes none.
//! `UPDATE` binds its `SET` values before its `WHERE` values.

use tabula_core::{Attributes, Lookup, Predicate, QueryPlan, Value};

use crate::schema::quote_ident;

/// A rendered statement and its bound values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    fn new(sql: String) -> Self {
        Statement {
            sql,
            params: Vec::new(),
        }
    }
}

/// `SELECT * FROM t [WHERE ..] ORDER BY .. [LIMIT ..] [OFFSET ..]`.
///
/// An `ORDER BY` is always emitted so results come back in rowid order
/// when the plan sets none, and ties break by rowid when it does.
pub fn select(plan: &QueryPlan) -> Statement {
    let mut stmt = Statement::new(format!("SELECT * FROM {}", quote_ident(plan.table())));
    push_where(&mut stmt, plan.predicates());

    match plan.order() {
        Some(order) => {
            let direction = if order.descending { "DESC" } else { "ASC" };
            stmt.sql.push_str(&format!(
                " ORDER BY {} {direction}, rowid",
                quote_ident(&order.column)
            ));
        }
        None => stmt.sql.push_str(" ORDER BY rowid"),
    }

    match (plan.limit_value(), plan.offset_value()) {
        (Some(limit), Some(offset)) => {
            stmt.sql
                .push_str(&format!(" LIMIT {} OFFSET {}", clamp(limit), clamp(offset)))
        }
        (Some(limit), None) => stmt.sql.push_str(&format!(" LIMIT {}", clamp(limit))),
        (None, Some(offset)) => stmt.sql.push_str(&format!(" LIMIT -1 OFFSET {}", clamp(offset))),
        (None, None) => {}
    }
    stmt
}

/// `SELECT COUNT(*)`; ordering and pagination are ignored.
pub fn count(plan: &QueryPlan) -> Statement {
    let mut stmt = Statement::new(format!(
        "SELECT COUNT(*) FROM {}",
        quote_ident(plan.table())
    ));
    push_where(&mut stmt, plan.predicates());
    stmt
}

pub fn update(plan: &QueryPlan, changes: &Attributes) -> Statement {
    let assignments: Vec<String> = changes
        .keys()
        .map(|column| format!("{} = ?", quote_ident(column)))
        .collect();
    let mut stmt = Statement::new(format!(
        "UPDATE {} SET {}",
        quote_ident(plan.table()),
        assignments.join(", ")
    ));
    stmt.params.extend(changes.values().cloned());
    push_where(&mut stmt, plan.predicates());
    stmt
}

pub fn delete(plan: &QueryPlan) -> Statement {
    let mut stmt = Statement::new(format!("DELETE FROM {}", quote_ident(plan.table())));
    push_where(&mut stmt, plan.predicates());
    stmt
}

pub fn insert(table: &str, row: &Attributes) -> Statement {
    if row.is_empty() {
        return Statement::new(format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)));
    }
    let columns: Vec<String> = row.keys().map(|c| quote_ident(c)).collect();
    let placeholders = vec!["?"; row.len()].join(", ");
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote_ident(table),
            columns.join(", ")
        ),
        params: row.values().cloned().collect(),
    }
}

fn push_where(stmt: &mut Statement, predicates: &[Predicate]) {
    if predicates.is_empty() {
        return;
    }
    let clauses: Vec<String> = predicates
        .iter()
        .map(|p| condition(p, &mut stmt.params))
        .collect();
    stmt.sql.push_str(" WHERE ");
    stmt.sql.push_str(&clauses.join(" AND "));
}

fn condition(predicate: &Predicate, params: &mut Vec<Value>) -> String {
    let column = quote_ident(&predicate.column);
    let clause = match predicate.lookup {
        Lookup::IsNull => {
            let is_null = matches!(predicate.value, Value::Boolean(true));
            if is_null {
                format!("{column} IS NULL")
            } else {
                format!("{column} IS NOT NULL")
            }
        }
        Lookup::In => {
            let items = match &predicate.value {
                Value::List(items) => items.as_slice(),
                other => std::slice::from_ref(other),
            };
            params.extend(items.iter().cloned());
            format!("{column} IN ({})", vec!["?"; items.len()].join(", "))
        }
        lookup => {
            params.push(predicate.value.clone());
            match lookup {
                Lookup::IExact => format!("LOWER({column}) = LOWER(?)"),
                Lookup::IContains => format!("LOWER({column}) LIKE LOWER(?)"),
                Lookup::Contains | Lookup::StartsWith | Lookup::EndsWith => {
                    format!("{column} LIKE ?")
                }
                Lookup::Gt => format!("{column} > ?"),
                Lookup::Gte => format!("{column} >= ?"),
                Lookup::Lt => format!("{column} < ?"),
                Lookup::Lte => format!("{column} <= ?"),
                _ => format!("{column} = ?"),
            }
        }
    };
    if predicate.negated {
        format!("NOT ({clause})")
    } else {
        clause
    }
}

fn clamp(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{model, Model, ModelSchema};

    model! {
        #[derive(Debug, Default)]
        struct Person {
            #[db = "id,primary_key,auto_increment"]
            id: i64,
            #[db = "name"]
            name: String,
            #[db = "age"]
            age: i64,
        }
    }

    impl Model for Person {}

    fn plan() -> QueryPlan {
        QueryPlan::new(ModelSchema::of::<Person>().unwrap())
    }

    #[test]
    fn test_select_without_predicates() {
        let stmt = select(&plan());
        insta::assert_snapshot!(stmt.sql, @r#"SELECT * FROM "persons" ORDER BY rowid"#);
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_with_every_clause() {
        let q = plan()
            .filter("age__gte", 18)
            .unwrap()
            .exclude("name__icontains", "an")
            .unwrap()
            .filter("id__in", Value::list([1, 2, 3]))
            .unwrap()
            .filter("name__isnull", false)
            .unwrap()
            .order_by("-age")
            .unwrap()
            .limit(10)
            .offset(5);
        let stmt = select(&q);
        insta::assert_snapshot!(
            stmt.sql,
            @r#"SELECT * FROM "persons" WHERE "age" >= ? AND NOT (LOWER("name") LIKE LOWER(?)) AND "id" IN (?, ?, ?) AND "name" IS NOT NULL ORDER BY "age" DESC, rowid LIMIT 10 OFFSET 5"#
        );
        assert_eq!(
            stmt.params,
            vec![
                Value::Integer(18),
                Value::from("%an%"),
                Value::Integer(1),
                Value::Integer(2),
                Value::Integer(3),
            ]
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = select(&plan().offset(3));
        assert!(stmt.sql.ends_with("ORDER BY rowid LIMIT -1 OFFSET 3"));
    }

    #[test]
    fn test_count_ignores_window() {
        let q = plan().filter("age__lt", 18).unwrap().order_by("age").unwrap().limit(1);
        let stmt = count(&q);
        insta::assert_snapshot!(stmt.sql, @r#"SELECT COUNT(*) FROM "persons" WHERE "age" < ?"#);
    }

    #[test]
    fn test_update_binds_set_before_where() {
        let q = plan().filter("name__startswith", "A").unwrap();
        let mut changes = Attributes::new();
        changes.insert("age".into(), Value::Integer(40));
        changes.insert("name".into(), Value::from("Zed"));
        let stmt = update(&q, &changes);
        insta::assert_snapshot!(stmt.sql, @r#"UPDATE "persons" SET "age" = ?, "name" = ? WHERE "name" LIKE ?"#);
        assert_eq!(
            stmt.params,
            vec![Value::Integer(40), Value::from("Zed"), Value::from("A%")]
        );
    }

    #[test]
    fn test_delete_without_predicates_targets_all_rows() {
        let stmt = delete(&plan());
        assert_eq!(stmt.sql, r#"DELETE FROM "persons""#);
    }

    #[test]
    fn test_insert() {
        let mut row = Attributes::new();
        row.insert("name".into(), Value::from("Ann"));
        row.insert("age".into(), Value::Integer(17));
        let stmt = insert("persons", &row);
        assert_eq!(stmt.sql, r#"INSERT INTO "persons" ("name", "age") VALUES (?, ?)"#);
        assert_eq!(stmt.params.len(), 2);

        let stmt = insert("persons", &Attributes::new());
        assert_eq!(stmt.sql, r#"INSERT INTO "persons" DEFAULT VALUES"#);
    }
}
