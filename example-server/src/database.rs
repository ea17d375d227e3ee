use sqlx::sqlite::SqlitePool;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT UNIQUE NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        price REAL NOT NULL,
        category TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        status TEXT DEFAULT 'pending',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_lines (
        order_id INTEGER NOT NULL REFERENCES orders(id),
        line_number INTEGER NOT NULL,
        product_id INTEGER NOT NULL REFERENCES products(id),
        quantity INTEGER NOT NULL,
        PRIMARY KEY (order_id, line_number)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS order_lines_product ON order_lines (product_id)",
    r#"
    CREATE TABLE IF NOT EXISTS SortFilterTest (
        id INTEGER PRIMARY KEY,
        pattern TEXT NOT NULL,
        colour TEXT NOT NULL,
        size INTEGER NOT NULL
    )
    "#,
];

pub async fn setup(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in TABLES {
        sqlx::query(statement).execute(pool).await?;
    }

    // Seed sample data if tables are empty
    seed_sample_data(pool).await?;

    Ok(())
}

async fn seed_sample_data(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let customer_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
        .fetch_one(pool)
        .await?;
    if customer_count.0 > 0 {
        tracing::info!("Sample data already present, skipping seed");
        return Ok(());
    }

    for index in 1..=50 {
        sqlx::query("INSERT INTO customers (name, email) VALUES (?, ?)")
            .bind(format!("Customer {}", index))
            .bind(format!("customer{}@example.com", index))
            .execute(pool)
            .await?;
    }

    let categories = ["Electronics", "Books", "Garden", "Toys", "Kitchen"];
    for index in 1..=40 {
        sqlx::query("INSERT INTO products (name, price, category) VALUES (?, ?, ?)")
            .bind(format!("Product {}", index))
            .bind(4.99 + (index as f64) * 3.25)
            .bind(categories[index % categories.len()])
            .execute(pool)
            .await?;
    }

    let statuses = ["pending", "shipped", "completed", "cancelled"];
    for index in 0..300_i64 {
        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (customer_id, status) VALUES (?, ?) RETURNING id",
        )
        .bind(index % 50 + 1)
        .bind(statuses[(index as usize) % statuses.len()])
        .fetch_one(pool)
        .await?;

        for line_number in 1..=(index % 3 + 1) {
            sqlx::query(
                "INSERT INTO order_lines (order_id, line_number, product_id, quantity) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(line_number)
            .bind((index + line_number) % 40 + 1)
            .bind(line_number * 2)
            .execute(pool)
            .await?;
        }
    }

    let shirts = [
        ("plain", "blue", 23),
        ("plain", "blue", 21),
        ("striped", "red", 30),
        ("plain", "green", 2),
        ("plain", "blue", 22),
        ("dotted", "blue", 25),
    ];
    for (pattern, colour, size) in shirts {
        sqlx::query("INSERT INTO SortFilterTest (pattern, colour, size) VALUES (?, ?, ?)")
            .bind(pattern)
            .bind(colour)
            .bind(size)
            .execute(pool)
            .await?;
    }

    tracing::info!(
        "Sample data seeded: 50 customers, 40 products, 300 orders with lines, 6 SortFilterTest rows"
    );
    Ok(())
}
