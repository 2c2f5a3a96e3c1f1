use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use dotenvy::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower_http::trace::TraceLayer;

use campushub::database::schema;
use campushub::web::{self, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://campushub.db".to_string());
    tracing::info!(db_url = %db_url, "connecting to database");

    let options = SqliteConnectOptions::from_str(&db_url)
        .expect("DATABASE_URL must be a sqlite URL")
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .expect("failed to connect to database");

    schema::apply_schema(&pool)
        .await
        .expect("failed to apply schema");

    let state = AppState::new(pool);
    let app = web::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .expect("BIND_ADDR must be host:port");

    tracing::info!(%addr, "campushub listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .await
        .expect("server error");
}
