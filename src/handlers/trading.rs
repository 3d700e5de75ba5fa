use axum::{extract::State, http::StatusCode, Json};
use tower_sessions::Session;

use crate::auth;
use crate::db::DatabasePool;
use crate::error::AppError;
use crate::market;
use crate::models::{AddStockRequest, RemoveStockRequest, Transaction, UpdateSharesRequest};
use crate::portfolio;

fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("ticker is required".to_string()));
    }
    Ok(ticker)
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// `POST /add-stock`: buy at the current market price. Aborts before any
/// write when the provider cannot price the ticker.
pub async fn add_stock(
    State(pool): State<DatabasePool>,
    session: Session,
    Json(req): Json<AddStockRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let caps = auth::member_caps(&session).await?;
    let ticker = normalize_ticker(&req.ticker)?;
    if req.shares <= 0.0 {
        return Err(AppError::Validation("shares must be positive".to_string()));
    }

    let price = market::current_price(&ticker).await;

    let mut conn = pool.0.lock().await;
    let record = portfolio::buy_at_market(
        &mut conn,
        &caps,
        &ticker,
        req.shares,
        price,
        &today(),
        req.notes.as_deref().unwrap_or(""),
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /remove-stock`: liquidate a position. Logs the SELL at the
/// recorded cost basis, so no market call is made.
pub async fn remove_stock(
    State(pool): State<DatabasePool>,
    session: Session,
    Json(req): Json<RemoveStockRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let caps = auth::member_caps(&session).await?;
    let ticker = normalize_ticker(&req.ticker)?;

    let mut conn = pool.0.lock().await;
    let record = portfolio::liquidate(
        &mut conn,
        &caps,
        &ticker,
        &today(),
        req.notes.as_deref().unwrap_or(""),
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /update-shares`: apply a signed share delta at the current
/// market price. Aborts before any write when the provider cannot price
/// the ticker.
pub async fn update_shares(
    State(pool): State<DatabasePool>,
    session: Session,
    Json(req): Json<UpdateSharesRequest>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let caps = auth::member_caps(&session).await?;
    let ticker = normalize_ticker(&req.ticker)?;

    let price = market::current_price(&ticker).await;

    let mut conn = pool.0.lock().await;
    let record = portfolio::adjust_at_market(
        &mut conn,
        &caps,
        &ticker,
        req.shares_change,
        price,
        &today(),
        req.notes.as_deref().unwrap_or(""),
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}
