use axum::{extract::State, http::StatusCode, routing::get, Router};
use axum_sql_browser::{BrowserConfig, SqlBrowserLayer};
use sqlx::sqlite::SqlitePool;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

mod database;

#[derive(Clone)]
struct ApplicationState {
    pool: SqlitePool,
}

/// Configuration file from `SQL_BROWSER_CONFIG`, or peek columns for the seeded tables
fn load_config() -> BrowserConfig {
    match std::env::var("SQL_BROWSER_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path).expect("Failed to read SQL_BROWSER_CONFIG");
            BrowserConfig::from_json(&text).expect("Invalid SQL_BROWSER_CONFIG")
        }
        Err(_) => BrowserConfig::default()
            .with_peek_columns("customers", ["name", "email"])
            .with_peek_columns("products", ["name"])
            .with_peek_columns("orders", ["status"]),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Initialize SQLite database
    // Use path relative to example-server crate
    std::fs::create_dir_all("./data").expect("Failed to create data directory");
    let database_url = "sqlite:./data/example.db?mode=rwc";
    let pool = SqlitePool::connect(database_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run database setup and seed sample data
    database::setup(&pool)
        .await
        .expect("Failed to setup database");

    let config = load_config();
    let base_path = config.base_path.clone();
    let browser = SqlBrowserLayer::sqlite(pool.clone(), config)
        .await
        .expect("Failed to load database schema");

    let application_state = ApplicationState { pool };

    // SqlBrowserLayer must be merged after with_state() since it returns a stateless Router
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/api/health", get(health_handler))
        .with_state(application_state)
        .merge(browser.into_router())
        .layer(CorsLayer::permissive());

    // Bind to local address and start server
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running at http://127.0.0.1:3000");
    tracing::info!("Health check at http://127.0.0.1:3000/api/health");
    tracing::info!("SQL browser API at http://127.0.0.1:3000{}/api/tables", base_path);

    axum::serve(listener, app).await.expect("Server error");
}

async fn root_handler() -> &'static str {
    "Welcome to axum-sql-browser example server"
}

async fn health_handler(
    State(state): State<ApplicationState>,
) -> Result<(StatusCode, &'static str), StatusCode> {
    // Try to verify database connectivity
    sqlx::query("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((StatusCode::OK, "Server is healthy"))
}
