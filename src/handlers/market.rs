use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::db::DatabasePool;
use crate::error::AppError;
use crate::ledger;
use crate::market;
use crate::models::{IntradayResponse, WatchQuote};

/// `GET /api/prices`: ticker -> current price for every held ticker plus
/// the fixed watchlist. Unresolvable tickers map to the "N/A" sentinel.
pub async fn get_prices(
    State(pool): State<DatabasePool>,
) -> Result<Json<BTreeMap<String, Value>>, AppError> {
    let held: Vec<String> = {
        let conn = pool.0.lock().await;
        ledger::list(&conn)?.into_iter().map(|h| h.ticker).collect()
    };

    let mut symbols: BTreeSet<String> = held.into_iter().collect();
    symbols.extend(market::WATCHLIST.iter().map(|s| s.to_string()));

    let mut prices = BTreeMap::new();
    for symbol in symbols {
        let value = match market::current_price(&symbol).await {
            Some(price) => json!(price),
            None => json!("N/A"),
        };
        prices.insert(symbol, value);
    }
    Ok(Json(prices))
}

/// `GET /api/intraday/{ticker}`: today's 5-minute closes for a chart, or
/// a market-data error when the provider has nothing for the symbol.
pub async fn get_intraday(
    Path(ticker): Path<String>,
) -> Result<Json<IntradayResponse>, AppError> {
    let ticker = ticker.trim().to_uppercase();
    let series = market::intraday_series(&ticker).await;
    if series.is_empty() {
        return Err(AppError::MarketData(ticker));
    }
    let (labels, values) = series.into_iter().unzip();
    Ok(Json(IntradayResponse { labels, values }))
}

/// `GET /stocks`: the watchlist quote board. Symbols the provider cannot
/// quote still get a row, with null fields.
pub async fn get_watchlist() -> Json<Vec<WatchQuote>> {
    let mut board = Vec::with_capacity(market::WATCHLIST.len());
    for symbol in market::WATCHLIST {
        let quote = market::quote(symbol).await;
        board.push(WatchQuote {
            ticker: symbol.to_string(),
            name: market::company_name(symbol).await,
            price: quote.as_ref().map(|q| q.c),
            change: quote.as_ref().map(|q| q.d),
            change_percent: quote.as_ref().map(|q| q.dp),
        });
    }
    Json(board)
}
