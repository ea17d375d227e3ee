//! Schema graphs shared by unit tests

use crate::graph::{
    ColumnRecord, Database, ForeignKeyRecord, KeyColumnRecord, SchemaBuilder, SupportedFeatures,
    TableRecord,
};

const SHOP: &[(&str, &[(&str, &str)])] = &[
    ("customers", &[("id", "integer"), ("name", "text"), ("email", "varchar(120)")]),
    ("products", &[("id", "integer"), ("title", "text"), ("price", "decimal(10,2)")]),
    (
        "orders",
        &[
            ("id", "integer"),
            ("customer_id", "integer"),
            ("product_id", "integer"),
            ("quantity", "integer"),
        ],
    ),
    ("order_notes", &[("id", "integer"), ("order_id", "integer"), ("note", "text")]),
    ("returns", &[("id", "integer"), ("order_id", "integer"), ("reason", "text")]),
    ("employees", &[("id", "integer"), ("manager_id", "integer"), ("name", "text")]),
];

const SHOP_FKS: &[(&str, &str, &str, &str)] = &[
    ("orders", "customer_id", "customers", "id"),
    ("orders", "product_id", "products", "id"),
    ("order_notes", "order_id", "orders", "id"),
    ("returns", "order_id", "orders", "id"),
    ("employees", "manager_id", "employees", "id"),
];

/// Unnamed-schema shop: customers, products, orders and their dependants
pub(crate) fn shop_database() -> Database {
    let features = SupportedFeatures {
        paging_without_sort: true,
        ..SupportedFeatures::default()
    };
    let mut builder = SchemaBuilder::new("", features);
    for (table, columns) in SHOP {
        builder
            .add_table(TableRecord {
                name: table.to_string(),
                ..TableRecord::default()
            })
            .unwrap();
        for (name, type_name) in columns.iter() {
            builder
                .add_column(ColumnRecord {
                    table_name: table.to_string(),
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                    nullable: *name != "id",
                    ..ColumnRecord::default()
                })
                .unwrap();
        }
    }

    let mut builder = builder.into_constraints();
    for (table, _) in SHOP {
        builder
            .add_primary_key_column(KeyColumnRecord {
                table_name: table.to_string(),
                column_name: "id".to_string(),
                ordinal: 1,
                ..KeyColumnRecord::default()
            })
            .unwrap();
    }
    for (table, column, destination, destination_column) in SHOP_FKS {
        builder
            .add_foreign_key(ForeignKeyRecord {
                name: format!("fk_{}_{}", table, column),
                table_name: table.to_string(),
                column_name: column.to_string(),
                destination_table_name: destination.to_string(),
                destination_column_name: destination_column.to_string(),
                ..ForeignKeyRecord::default()
            })
            .unwrap();
    }
    builder.finish()
}

/// Shop with `customers.name` and `customers.email` as peek columns
pub(crate) fn shop_with_peeks() -> Database {
    let mut database = shop_database();
    let customers = database.find_table("", "customers").unwrap().id();
    database
        .set_peek_columns(customers, &["name".to_string(), "email".to_string()])
        .unwrap();
    database
}

/// `public.customers` and `sales.orders` on a schema-aware engine
pub(crate) fn shop_with_schemas() -> Database {
    let features = SupportedFeatures {
        schemas: true,
        descriptions: true,
        named_fks: true,
        paging_without_sort: true,
    };
    let mut builder = SchemaBuilder::new("public", features);
    for (schema_name, table, columns) in [
        ("public", "customers", ["id", "name"]),
        ("sales", "orders", ["id", "customer_id"]),
    ] {
        builder
            .add_table(TableRecord {
                schema_name: schema_name.to_string(),
                name: table.to_string(),
                description: None,
            })
            .unwrap();
        for name in columns {
            builder
                .add_column(ColumnRecord {
                    schema_name: schema_name.to_string(),
                    table_name: table.to_string(),
                    name: name.to_string(),
                    type_name: "integer".to_string(),
                    ..ColumnRecord::default()
                })
                .unwrap();
        }
    }

    let mut builder = builder.into_constraints();
    builder
        .add_foreign_key(ForeignKeyRecord {
            name: "orders_customer_id_fkey".to_string(),
            schema_name: "sales".to_string(),
            table_name: "orders".to_string(),
            column_name: "customer_id".to_string(),
            destination_schema_name: "public".to_string(),
            destination_table_name: "customers".to_string(),
            destination_column_name: "id".to_string(),
        })
        .unwrap();
    builder.finish()
}
