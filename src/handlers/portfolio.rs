use axum::{extract::State, Json};
use std::collections::HashMap;

use crate::db::DatabasePool;
use crate::error::AppError;
use crate::handlers::club;
use crate::ledger;
use crate::market;
use crate::models::{Dashboard, Transaction};
use crate::valuation;

/// `GET /`: the club dashboard, a live valuation snapshot plus the latest
/// announcements. Public.
pub async fn get_dashboard(
    State(pool): State<DatabasePool>,
) -> Result<Json<Dashboard>, AppError> {
    let conn = pool.0.lock().await;
    let holdings = ledger::list(&conn)?;
    let announcements = club::recent_announcements(&conn, 5)?;
    drop(conn);

    // One price (and, when priced, one sector) round-trip per holding.
    let mut prices: HashMap<String, f64> = HashMap::new();
    let mut sectors: HashMap<String, String> = HashMap::new();
    for holding in &holdings {
        let Some(price) = market::current_price(&holding.ticker).await else {
            tracing::warn!("no price for {}; excluded from snapshot", holding.ticker);
            continue;
        };
        prices.insert(holding.ticker.clone(), price);
        sectors.insert(holding.ticker.clone(), market::sector(&holding.ticker).await);
    }

    let snapshot = valuation::compute_snapshot(
        &holdings,
        |ticker| prices.get(ticker).copied(),
        |ticker| sectors.get(ticker).cloned(),
    );

    Ok(Json(Dashboard {
        snapshot,
        holdings,
        announcements,
    }))
}

/// `GET /transactions`: the full trade journal, newest first. Public.
pub async fn get_transactions(
    State(pool): State<DatabasePool>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let conn = pool.0.lock().await;
    Ok(Json(crate::journal::list_descending(&conn)?))
}
