mod auth;
mod db;
mod error;
mod handlers;
mod journal;
mod ledger;
mod market;
mod models;
mod portfolio;
mod valuation;

use crate::auth::{current_user, login, logout};
use crate::db::DatabasePool;
use crate::handlers::{
    club::{
        list_announcements, list_notices, list_recaps, post_announcement, post_notice, post_recap,
    },
    market::{get_intraday, get_prices, get_watchlist},
    portfolio::{get_dashboard, get_transactions},
    trading::{add_stock, remove_stock, update_shares},
};
use axum::http::header::{ACCESS_CONTROL_ALLOW_CREDENTIALS, CONTENT_TYPE, COOKIE};
use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Method;
use rusqlite::Connection;
use time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::{self, TraceLayer};
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_rusqlite_store::RusqliteStore;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set the log level based on the first argument
    let args: Vec<String> = std::env::args().collect();
    let mut log_level = Level::INFO;
    if args.len() >= 2 {
        log_level = match args[1].as_str() {
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_max_level(log_level)
        .init();

    tracing::info!("Log level set to: {}", log_level);

    // Initalize dotenv so we can read .env file
    dotenv::dotenv().ok();

    // Initialize our session store as a SQLite database
    let conn = Connection::open("sessions.db")?;
    let session_store = RusqliteStore::new(conn.into());
    session_store.migrate().await?;

    // Start a task to delete expired sessions every 5 seconds
    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(5)),
    );

    // Create session layer with some configuration
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_expiry(Expiry::OnInactivity(Duration::days(7)))
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/");

    let origin = dotenv::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

    // Initialize CORS layer
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods(vec![Method::GET, Method::POST])
        .allow_headers(vec![ACCESS_CONTROL_ALLOW_CREDENTIALS, CONTENT_TYPE, COOKIE]);

    // Open the portfolio database and make sure the schema exists
    let db_path = dotenv::var("DATABASE_PATH").unwrap_or_else(|_| "portfolio.db".to_string());
    let pool = DatabasePool::new(&db_path)?;

    // Build application with routes
    let app = Router::new()
        // Dashboard and journal
        .route("/", get(get_dashboard))
        .route("/transactions", get(get_transactions))
        // Portfolio mutations (club heads only)
        .route("/add-stock", post(add_stock))
        .route("/remove-stock", post(remove_stock))
        .route("/update-shares", post(update_shares))
        // Market data
        .route("/stocks", get(get_watchlist))
        .route("/api/prices", get(get_prices))
        .route("/api/intraday/:ticker", get(get_intraday))
        // Club news
        .route("/announcements", get(list_announcements).post(post_announcement))
        .route("/recaps", get(list_recaps).post(post_recap))
        .route("/notices", get(list_notices).post(post_notice))
        // Auth routes
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/user", get(current_user))
        // Database app state
        .with_state(pool)
        // Session, CORS, and tracing layers
        .layer(session_layer)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        );

    // Run server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;

    tracing::info!("Listening on: {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    deletion_task.await??;

    Ok(())
}
