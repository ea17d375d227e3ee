//! SELECT statement construction for table pages
//!
//! The page statement has a fixed shape on every engine:
//!
//! 1. the table's own columns, in position order
//! 2. one expression per outbound peek slot, read from a per-Fk join alias
//! 3. one `COUNT(*)` subquery per inbound foreign key
//! 4. `FROM <table> t` plus a `LEFT OUTER JOIN` per peeked foreign key
//! 5. parameterized equality filters
//! 6. ORDER BY in request order
//! 7. paging, where a zero limit means unlimited
//!
//! Items 2 and 3 are emitted by walking the [`Layout`], so the positions the
//! decoder reads are exactly the positions the statement produces.

pub mod dialect;

use serde::{Deserialize, Serialize};

use crate::graph::{Database, Table};
use crate::layout::Layout;

pub use dialect::{Dialect, MsSqlDialect, PostgresDialect, SqliteDialect};

/// Sort order for row queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality filter on a column position
///
/// Only the first value takes part in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: usize,
    pub values: Vec<String>,
}

/// One ORDER BY entry on a column position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortColumn {
    pub column: usize,
    pub order: SortOrder,
}

/// Filters, sorting and paging for a table page, already resolved to column positions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortColumn>,
    /// 0 means unlimited
    pub row_limit: u64,
    /// 0 means no skip
    pub skip_rows: u64,
}

/// SQL text and the values bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub values: Vec<String>,
}

/// Build the page statement for `table` producing exactly `layout`'s row shape
///
/// # Panics
///
/// If `layout` was built for another table, or a filter or sort column
/// position is not a column of `table`.
pub fn build_query(
    dialect: &dyn Dialect,
    database: &Database,
    table: &Table,
    params: &QueryParams,
    layout: &Layout,
) -> BuiltQuery {
    assert_eq!(
        layout.table(),
        table.id(),
        "layout was built for another table than {}",
        table.qualified_name()
    );

    let mut select = base_columns(dialect, table);
    let mut joins = String::new();

    for (ordinal, (fk, slots)) in layout.peek_groups().enumerate() {
        let fk = database.fk(fk);
        let destination = database.table(fk.destination_table());
        let alias = format!("p{}", ordinal);

        for slot in slots {
            let column = database.column(slot.column);
            select.push(dialect.select_column(
                format!("{}.{}", alias, dialect.quote_identifier(column.name())),
                column.type_name(),
            ));
        }

        let on = fk
            .column_pairs()
            .map(|(source, destination_column)| {
                format!(
                    "{}.{} = t.{}",
                    alias,
                    dialect.quote_identifier(destination.columns()[destination_column].name()),
                    dialect.quote_identifier(table.columns()[source].name())
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        joins.push_str(&format!(
            " LEFT OUTER JOIN {} {} ON {}",
            dialect.qualified_table(destination),
            alias,
            on
        ));
    }

    for (ordinal, fk) in layout.inbound_fks().iter().enumerate() {
        let fk = database.fk(*fk);
        let source = database.table(fk.source_table());
        let alias = format!("i{}", ordinal);
        let predicate = fk
            .column_pairs()
            .map(|(source_column, destination_column)| {
                format!(
                    "{}.{} = t.{}",
                    alias,
                    dialect.quote_identifier(source.columns()[source_column].name()),
                    dialect.quote_identifier(table.columns()[destination_column].name())
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        select.push(format!(
            "(SELECT COUNT(*) FROM {} {} WHERE {})",
            dialect.qualified_table(source),
            alias,
            predicate
        ));
    }

    let mut sql = format!(
        "SELECT {} FROM {} t{}",
        select.join(", "),
        dialect.qualified_table(table),
        joins
    );

    let values = push_where_clause(&mut sql, dialect, table, params);
    push_order_clause(&mut sql, dialect, database, table, params);

    if let Some(paging) = dialect.paging_clause(params.row_limit, params.skip_rows) {
        sql.push(' ');
        sql.push_str(&paging);
    }

    tracing::debug!(dialect = dialect.name(), %sql, bound = values.len(), "Built page query");

    BuiltQuery { sql, values }
}

/// Build `SELECT COUNT(*)` over the filtered page statement
///
/// Peek joins, inbound counts, ordering and paging are left out since none
/// of them changes the number of rows. With empty params this is the table's
/// total row count.
pub fn build_count_query(
    dialect: &dyn Dialect,
    table: &Table,
    params: &QueryParams,
) -> BuiltQuery {
    let mut inner = format!(
        "SELECT {} FROM {} t",
        base_columns(dialect, table).join(", "),
        dialect.qualified_table(table)
    );
    let values = push_where_clause(&mut inner, dialect, table, params);

    let sql = format!("SELECT COUNT(*) FROM ({}) c", inner);
    tracing::debug!(dialect = dialect.name(), %sql, "Built count query");

    BuiltQuery { sql, values }
}

fn base_columns(dialect: &dyn Dialect, table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .map(|column| {
            dialect.select_column(
                format!("t.{}", dialect.quote_identifier(column.name())),
                column.type_name(),
            )
        })
        .collect()
}

fn column_name<'a>(table: &'a Table, position: usize) -> &'a str {
    match table.columns().get(position) {
        Some(column) => column.name(),
        None => panic!(
            "column position {} is out of range for {}",
            position,
            table.qualified_name()
        ),
    }
}

fn push_where_clause(
    sql: &mut String,
    dialect: &dyn Dialect,
    table: &Table,
    params: &QueryParams,
) -> Vec<String> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    for filter in &params.filters {
        let name = column_name(table, filter.column);
        let Some(value) = filter.values.first() else {
            continue;
        };
        if filter.values.len() > 1 {
            tracing::warn!(
                column = name,
                ignored = filter.values.len() - 1,
                "Only the first value of a multi-value filter is applied"
            );
        }

        values.push(value.clone());
        conditions.push(dialect.filter_predicate(
            &format!("t.{}", dialect.quote_identifier(name)),
            &dialect.placeholder(values.len()),
        ));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    values
}

fn push_order_clause(
    sql: &mut String,
    dialect: &dyn Dialect,
    database: &Database,
    table: &Table,
    params: &QueryParams,
) {
    let mut terms: Vec<String> = params
        .sort
        .iter()
        .map(|sort| {
            let direction = match sort.order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            format!(
                "t.{} {}",
                dialect.quote_identifier(column_name(table, sort.column)),
                direction
            )
        })
        .collect();

    let paging = params.row_limit > 0 || params.skip_rows > 0;
    if terms.is_empty() && paging && !database.features().paging_without_sort {
        terms = match table.pk() {
            Some(pk) => pk
                .columns()
                .iter()
                .map(|position| {
                    format!(
                        "t.{} ASC",
                        dialect.quote_identifier(table.columns()[*position].name())
                    )
                })
                .collect(),
            None => vec![dialect.arbitrary_order().to_string()],
        };
    }

    if !terms.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ColumnRecord, SchemaBuilder, SupportedFeatures, TableRecord};
    use crate::test_support::{shop_database, shop_with_peeks, shop_with_schemas};

    fn sort_filter_database(features: SupportedFeatures) -> Database {
        let mut builder = SchemaBuilder::new("", features);
        builder
            .add_table(TableRecord {
                name: "SortFilterTest".to_string(),
                ..TableRecord::default()
            })
            .unwrap();
        for (name, type_name) in [("pattern", "text"), ("size", "integer"), ("colour", "text")] {
            builder
                .add_column(ColumnRecord {
                    table_name: "SortFilterTest".to_string(),
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                    nullable: true,
                    ..ColumnRecord::default()
                })
                .unwrap();
        }
        builder.into_constraints().finish()
    }

    fn sort_filter_params(row_limit: u64, skip_rows: u64) -> QueryParams {
        QueryParams {
            filters: vec![Filter {
                column: 0,
                values: vec!["plain".to_string()],
            }],
            sort: vec![
                SortColumn {
                    column: 2,
                    order: SortOrder::Ascending,
                },
                SortColumn {
                    column: 1,
                    order: SortOrder::Descending,
                },
            ],
            row_limit,
            skip_rows,
        }
    }

    fn build(dialect: &dyn Dialect, database: &Database, path: &str, params: &QueryParams) -> BuiltQuery {
        let table = database.find_table_by_path(path).unwrap();
        let layout = Layout::build(database, table);
        build_query(dialect, database, table, params, &layout)
    }

    /// Select list items of a built page statement
    fn select_items(sql: &str, from: &str) -> Vec<String> {
        let start = "SELECT ".len();
        let end = sql.find(from).unwrap();
        sql[start..end].split(", ").map(str::to_string).collect()
    }

    #[test]
    fn test_sort_filter_scenario() {
        let database = sort_filter_database(SupportedFeatures {
            paging_without_sort: true,
            ..SupportedFeatures::default()
        });
        let query = build(&SqliteDialect, &database, "SortFilterTest", &sort_filter_params(10, 0));

        assert_eq!(
            query.sql,
            "SELECT t.\"pattern\", t.\"size\", t.\"colour\" FROM \"SortFilterTest\" t \
             WHERE CAST(t.\"pattern\" AS TEXT) = ? ORDER BY t.\"colour\" ASC, t.\"size\" DESC LIMIT 10"
        );
        assert_eq!(query.values, vec!["plain".to_string()]);
    }

    #[test]
    fn test_limit_and_offset_sentinels() {
        let database = sort_filter_database(SupportedFeatures {
            paging_without_sort: true,
            ..SupportedFeatures::default()
        });

        let unlimited = build(&PostgresDialect, &database, "SortFilterTest", &sort_filter_params(0, 0));
        assert!(!unlimited.sql.contains("LIMIT"));
        assert!(!unlimited.sql.contains("OFFSET"));

        let first_page = build(&PostgresDialect, &database, "SortFilterTest", &sort_filter_params(10, 0));
        assert!(first_page.sql.ends_with(" LIMIT 10"));
        assert!(!first_page.sql.contains("OFFSET"));

        let skipped = build(&PostgresDialect, &database, "SortFilterTest", &sort_filter_params(0, 20));
        assert!(skipped.sql.ends_with(" OFFSET 20"));
        assert!(!skipped.sql.contains("LIMIT"));

        let both = build(&PostgresDialect, &database, "SortFilterTest", &sort_filter_params(10, 20));
        assert!(both.sql.ends_with(" LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_postgres_filters_compare_as_text() {
        let database = sort_filter_database(SupportedFeatures::default());
        let mut params = sort_filter_params(0, 0);
        params.filters.push(Filter {
            column: 1,
            values: vec!["23".to_string()],
        });
        let query = build(&PostgresDialect, &database, "SortFilterTest", &params);
        assert!(query
            .sql
            .contains("WHERE CAST(t.\"pattern\" AS text) = $1 AND CAST(t.\"size\" AS text) = $2"));
        assert_eq!(query.values, vec!["plain".to_string(), "23".to_string()]);
    }

    #[test]
    fn test_multi_value_filter_uses_first_value_only() {
        let database = sort_filter_database(SupportedFeatures::default());
        let params = QueryParams {
            filters: vec![
                Filter {
                    column: 2,
                    values: vec!["blue".to_string(), "green".to_string()],
                },
                Filter {
                    column: 0,
                    values: Vec::new(),
                },
            ],
            ..QueryParams::default()
        };
        let query = build(&SqliteDialect, &database, "SortFilterTest", &params);
        assert!(query.sql.ends_with("WHERE CAST(t.\"colour\" AS TEXT) = ?"));
        assert_eq!(query.values, vec!["blue".to_string()]);
    }

    #[test]
    fn test_filter_values_are_never_interpolated() {
        let database = sort_filter_database(SupportedFeatures::default());
        let params = QueryParams {
            filters: vec![Filter {
                column: 0,
                values: vec!["x'; DROP TABLE t; --".to_string()],
            }],
            ..QueryParams::default()
        };
        let query = build(&SqliteDialect, &database, "SortFilterTest", &params);
        assert!(!query.sql.contains("DROP"));
        assert_eq!(query.values.len(), 1);
    }

    #[test]
    fn test_emitted_order_matches_layout() {
        let database = shop_with_peeks();
        let orders = database.find_table("", "orders").unwrap();
        let layout = Layout::build(&database, orders);
        let query = build_query(&SqliteDialect, &database, orders, &QueryParams::default(), &layout);

        let items = select_items(&query.sql, " FROM \"orders\" t");
        assert_eq!(items.len(), layout.total_slots());

        for (position, column) in orders.columns().iter().enumerate() {
            assert_eq!(items[position], format!("t.\"{}\"", column.name()));
        }
        for slot in layout.peek_slots() {
            let expected = format!("p0.\"{}\"", database.column(slot.column).name());
            assert_eq!(items[layout.find(slot.fk, slot.column)], expected);
        }
        for fk in orders.inbound_fks() {
            let source = database.table(database.fk(*fk).source_table());
            let item = &items[layout.find_inbound(*fk)];
            assert!(
                item.starts_with(&format!("(SELECT COUNT(*) FROM \"{}\" ", source.name())),
                "{} does not count {}",
                item,
                source.name()
            );
        }

        assert!(query.sql.contains(
            "LEFT OUTER JOIN \"customers\" p0 ON p0.\"id\" = t.\"customer_id\""
        ));
        assert!(query
            .sql
            .contains("(SELECT COUNT(*) FROM \"order_notes\" i0 WHERE i0.\"order_id\" = t.\"id\")"));
        assert!(query
            .sql
            .contains("(SELECT COUNT(*) FROM \"returns\" i1 WHERE i1.\"order_id\" = t.\"id\")"));
    }

    #[test]
    fn test_peeks_through_two_fks_accumulate_slots() {
        let mut database = shop_with_peeks();
        let products = database.find_table("", "products").unwrap().id();
        database
            .set_peek_columns(products, &["title".to_string(), "price".to_string()])
            .unwrap();

        let orders = database.find_table("", "orders").unwrap();
        let layout = Layout::build(&database, orders);
        let query = build_query(&SqliteDialect, &database, orders, &QueryParams::default(), &layout);
        let items = select_items(&query.sql, " FROM \"orders\" t");

        assert_eq!(layout.outbound_peek_start(), 4);
        assert_eq!(layout.inbound_start() - layout.outbound_peek_start(), 4);
        assert_eq!(items.len(), layout.total_slots());

        let [customer_fk, product_fk] = orders.fks() else {
            panic!("orders should have two foreign keys");
        };
        let expected = [
            (*customer_fk, "customers", "name", "p0.\"name\""),
            (*customer_fk, "customers", "email", "p0.\"email\""),
            (*product_fk, "products", "title", "p1.\"title\""),
            (*product_fk, "products", "price", "p1.\"price\""),
        ];
        for (slot, (fk, table, column, item)) in expected.into_iter().enumerate() {
            let destination = database.find_table("", table).unwrap();
            let (position, _) = destination.find_column(column).unwrap();
            let index = layout.find(fk, destination.column_ref(position));
            assert_eq!(index, layout.outbound_peek_start() + slot);
            assert_eq!(items[index], item);
        }

        assert!(query
            .sql
            .contains("LEFT OUTER JOIN \"products\" p1 ON p1.\"id\" = t.\"product_id\""));
    }

    #[test]
    fn test_postgres_selects_numeric_peeks_as_text() {
        let mut database = shop_with_peeks();
        let products = database.find_table("", "products").unwrap().id();
        database
            .set_peek_columns(products, &["title".to_string(), "price".to_string()])
            .unwrap();

        let query = build(&PostgresDialect, &database, "orders", &QueryParams::default());
        assert!(query
            .sql
            .starts_with("SELECT t.\"id\", t.\"customer_id\", t.\"product_id\", t.\"quantity\", "));
        assert!(query.sql.contains("p1.\"title\", CAST(p1.\"price\" AS text), "));

        let product_page = build(&PostgresDialect, &database, "products", &QueryParams::default());
        assert!(product_page.sql.contains("t.\"title\", CAST(t.\"price\" AS text)"));
    }

    #[test]
    fn test_same_destination_through_two_fks_gets_two_aliases() {
        let mut database = shop_database();
        let employees = database.find_table("", "employees").unwrap().id();
        database
            .set_peek_columns(employees, &["name".to_string()])
            .unwrap();

        let query = build(&SqliteDialect, &database, "employees", &QueryParams::default());
        assert_eq!(
            query.sql,
            "SELECT t.\"id\", t.\"manager_id\", t.\"name\", p0.\"name\", \
             (SELECT COUNT(*) FROM \"employees\" i0 WHERE i0.\"manager_id\" = t.\"id\") \
             FROM \"employees\" t LEFT OUTER JOIN \"employees\" p0 ON p0.\"id\" = t.\"manager_id\""
        );
    }

    #[test]
    fn test_statement_shape_is_shared_across_dialects() {
        let database = shop_with_peeks();
        let params = QueryParams {
            filters: vec![Filter {
                column: 3,
                values: vec!["2".to_string()],
            }],
            sort: vec![SortColumn {
                column: 0,
                order: SortOrder::Descending,
            }],
            row_limit: 5,
            skip_rows: 0,
        };
        let sqlite = build(&SqliteDialect, &database, "orders", &params);
        let mssql = build(&MsSqlDialect, &database, "orders", &params);

        let normalize = |sql: &str| sql.replace(['[', ']'], "\"").replace("@p1", "?");
        let sqlite_body = sqlite
            .sql
            .trim_end_matches(" LIMIT 5")
            .replace("CAST(t.\"quantity\" AS TEXT)", "t.\"quantity\"");
        let mssql_body = mssql
            .sql
            .trim_end_matches(" OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY");
        assert_eq!(normalize(mssql_body), sqlite_body);
    }

    #[test]
    fn test_paging_without_sort_support_orders_by_primary_key() {
        let mut database = shop_database();
        database.features.paging_without_sort = false;
        let params = QueryParams {
            row_limit: 10,
            ..QueryParams::default()
        };
        let query = build(&MsSqlDialect, &database, "customers", &params);
        assert!(query
            .sql
            .ends_with("ORDER BY t.[id] ASC OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"));

        let unpaged = build(&MsSqlDialect, &database, "customers", &QueryParams::default());
        assert!(!unpaged.sql.contains("ORDER BY"));
    }

    #[test]
    fn test_paging_without_sort_or_primary_key_uses_arbitrary_order() {
        let database = sort_filter_database(SupportedFeatures::default());
        let params = QueryParams {
            skip_rows: 3,
            ..QueryParams::default()
        };
        let query = build(&MsSqlDialect, &database, "SortFilterTest", &params);
        assert!(query.sql.ends_with("ORDER BY (SELECT NULL) OFFSET 3 ROWS"));
    }

    #[test]
    fn test_schema_qualified_names() {
        let database = shop_with_schemas();
        let query = build(&PostgresDialect, &database, "sales.orders", &QueryParams::default());
        assert_eq!(
            query.sql,
            "SELECT t.\"id\", t.\"customer_id\" FROM \"sales\".\"orders\" t"
        );

        let customers = build(&PostgresDialect, &database, "customers", &QueryParams::default());
        assert!(customers.sql.contains(
            "(SELECT COUNT(*) FROM \"sales\".\"orders\" i0 WHERE i0.\"customer_id\" = t.\"id\")"
        ));
    }

    #[test]
    fn test_count_query_wraps_filtered_statement() {
        let database = sort_filter_database(SupportedFeatures::default());
        let table = database.find_table("", "SortFilterTest").unwrap();

        let filtered = build_count_query(&SqliteDialect, table, &sort_filter_params(10, 20));
        assert_eq!(
            filtered.sql,
            "SELECT COUNT(*) FROM (SELECT t.\"pattern\", t.\"size\", t.\"colour\" \
             FROM \"SortFilterTest\" t WHERE CAST(t.\"pattern\" AS TEXT) = ?) c"
        );
        assert_eq!(filtered.values, vec!["plain".to_string()]);

        let total = build_count_query(&SqliteDialect, table, &QueryParams::default());
        assert!(!total.sql.contains("WHERE"));
        assert!(total.values.is_empty());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_unresolved_sort_column_panics() {
        let database = sort_filter_database(SupportedFeatures::default());
        let params = QueryParams {
            sort: vec![SortColumn {
                column: 9,
                order: SortOrder::Ascending,
            }],
            ..QueryParams::default()
        };
        build(&SqliteDialect, &database, "SortFilterTest", &params);
    }

    #[test]
    #[should_panic(expected = "another table")]
    fn test_layout_of_other_table_panics() {
        let database = shop_database();
        let orders = database.find_table("", "orders").unwrap();
        let customers = database.find_table("", "customers").unwrap();
        let layout = Layout::build(&database, customers);
        build_query(&SqliteDialect, &database, orders, &QueryParams::default(), &layout);
    }
}
