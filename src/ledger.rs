//! Holdings ledger: the mutable set of current positions, one row per
//! ticker. Every function takes the connection explicitly so callers can
//! run ledger updates and journal appends inside one transaction.

use rusqlite::Connection;

use crate::error::AppError;
use crate::models::{Holding, TradeAction};

fn row_to_holding(row: &rusqlite::Row<'_>) -> rusqlite::Result<Holding> {
    Ok(Holding {
        ticker: row.get(0)?,
        shares: row.get(1)?,
        cost_basis: row.get(2)?,
        acquired_on: row.get(3)?,
    })
}

/// Fetch a single holding, `None` if the ticker is not held.
pub fn get(conn: &Connection, ticker: &str) -> Result<Option<Holding>, AppError> {
    match conn.query_row(
        "SELECT ticker, shares, cost_basis, acquired_on FROM holdings WHERE ticker = ?1",
        [ticker],
        row_to_holding,
    ) {
        Ok(holding) => Ok(Some(holding)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All current holdings in ticker order. The order carries no meaning but
/// is kept stable for display and tests.
pub fn list(conn: &Connection) -> Result<Vec<Holding>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT ticker, shares, cost_basis, acquired_on FROM holdings ORDER BY ticker",
    )?;
    let holdings = stmt
        .query_map([], row_to_holding)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(holdings)
}

/// Open a new position or add to an existing one.
///
/// Re-buys accumulate: the share counts add and the cost basis becomes the
/// share-weighted average of the old basis and the new buy price. The
/// acquisition date moves to the latest buy.
pub fn add_or_increase_position(
    conn: &Connection,
    ticker: &str,
    shares: f64,
    price: f64,
    date: &str,
) -> Result<Holding, AppError> {
    if shares <= 0.0 {
        return Err(AppError::Validation("shares must be positive".to_string()));
    }

    conn.execute(
        "INSERT INTO holdings (ticker, shares, cost_basis, acquired_on)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(ticker)
         DO UPDATE SET
             cost_basis = ((holdings.shares * holdings.cost_basis) + (excluded.shares * excluded.cost_basis))
                          / (holdings.shares + excluded.shares),
             shares = holdings.shares + excluded.shares,
             acquired_on = excluded.acquired_on",
        rusqlite::params![ticker, shares, price, date],
    )?;

    let holding = conn.query_row(
        "SELECT ticker, shares, cost_basis, acquired_on FROM holdings WHERE ticker = ?1",
        [ticker],
        row_to_holding,
    )?;
    Ok(holding)
}

/// Delete a position entirely, returning its prior (shares, cost_basis)
/// so the caller can journal the liquidation.
pub fn remove_position(conn: &Connection, ticker: &str) -> Result<(f64, f64), AppError> {
    let prior = match conn.query_row(
        "SELECT shares, cost_basis FROM holdings WHERE ticker = ?1",
        [ticker],
        |row| Ok((row.get::<_, f64>(0)?, row.get::<_, f64>(1)?)),
    ) {
        Ok(prior) => prior,
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(AppError::NotFound(format!(
                "ticker '{}' not found in portfolio",
                ticker
            )));
        }
        Err(e) => return Err(e.into()),
    };

    conn.execute("DELETE FROM holdings WHERE ticker = ?1", [ticker])?;
    Ok(prior)
}

/// Apply a signed share delta to an existing position. Driving the count
/// to exactly zero deletes the row; driving it negative is rejected with
/// the holding untouched. Cost basis never changes here.
///
/// Returns the journal classification for the move: BUY for a positive
/// delta, SELL for a negative one. A zero delta is rejected outright so no
/// zero-magnitude entries ever reach the journal.
pub fn adjust_shares(conn: &Connection, ticker: &str, delta: f64) -> Result<TradeAction, AppError> {
    if delta == 0.0 {
        return Err(AppError::Validation(
            "shares change must be non-zero".to_string(),
        ));
    }

    let current: f64 = match conn.query_row(
        "SELECT shares FROM holdings WHERE ticker = ?1",
        [ticker],
        |row| row.get(0),
    ) {
        Ok(shares) => shares,
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            return Err(AppError::NotFound(format!(
                "ticker '{}' not found in portfolio",
                ticker
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let new_shares = current + delta;
    if new_shares < 0.0 {
        return Err(AppError::Validation(
            "cannot reduce shares below zero".to_string(),
        ));
    }

    if new_shares == 0.0 {
        conn.execute("DELETE FROM holdings WHERE ticker = ?1", [ticker])?;
    } else {
        conn.execute(
            "UPDATE holdings SET shares = ?1 WHERE ticker = ?2",
            rusqlite::params![new_shares, ticker],
        )?;
    }

    Ok(if delta > 0.0 {
        TradeAction::Buy
    } else {
        TradeAction::Sell
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn add_then_list_round_trips() {
        let conn = conn();
        add_or_increase_position(&conn, "XYZ", 10.0, 50.0, "2024-01-01").unwrap();

        let holdings = list(&conn).unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].ticker, "XYZ");
        assert_eq!(holdings[0].shares, 10.0);
        assert_eq!(holdings[0].cost_basis, 50.0);
        assert_eq!(holdings[0].acquired_on, "2024-01-01");
    }

    #[test]
    fn rebuy_accumulates_with_weighted_average_basis() {
        let conn = conn();
        add_or_increase_position(&conn, "AAPL", 10.0, 100.0, "2024-01-01").unwrap();
        let holding = add_or_increase_position(&conn, "AAPL", 10.0, 200.0, "2024-02-01").unwrap();

        assert_eq!(holding.shares, 20.0);
        assert!((holding.cost_basis - 150.0).abs() < 1e-9);
        assert_eq!(holding.acquired_on, "2024-02-01");
        assert_eq!(list(&conn).unwrap().len(), 1);
    }

    #[test]
    fn add_rejects_non_positive_shares() {
        let conn = conn();
        let err = add_or_increase_position(&conn, "XYZ", 0.0, 50.0, "2024-01-01").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(list(&conn).unwrap().is_empty());
    }

    #[test]
    fn remove_returns_prior_state_and_clears_row() {
        let conn = conn();
        add_or_increase_position(&conn, "MSFT", 4.0, 300.0, "2024-01-01").unwrap();

        let (shares, basis) = remove_position(&conn, "MSFT").unwrap();
        assert_eq!(shares, 4.0);
        assert_eq!(basis, 300.0);
        assert!(list(&conn).unwrap().iter().all(|h| h.ticker != "MSFT"));
    }

    #[test]
    fn remove_unknown_ticker_is_not_found() {
        let conn = conn();
        let err = remove_position(&conn, "NOPE").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn adjust_to_zero_deletes_and_second_removal_fails() {
        let conn = conn();
        add_or_increase_position(&conn, "TSLA", 10.0, 200.0, "2024-01-01").unwrap();

        let action = adjust_shares(&conn, "TSLA", -10.0).unwrap();
        assert_eq!(action, TradeAction::Sell);
        assert!(get(&conn, "TSLA").unwrap().is_none());

        let err = remove_position(&conn, "TSLA").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn adjust_below_zero_fails_and_leaves_holding_unchanged() {
        let conn = conn();
        add_or_increase_position(&conn, "NVDA", 5.0, 400.0, "2024-01-01").unwrap();

        let err = adjust_shares(&conn, "NVDA", -6.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let holding = get(&conn, "NVDA").unwrap().unwrap();
        assert_eq!(holding.shares, 5.0);
        assert_eq!(holding.cost_basis, 400.0);
    }

    #[test]
    fn adjust_classifies_direction_and_keeps_basis() {
        let conn = conn();
        add_or_increase_position(&conn, "JPM", 10.0, 150.0, "2024-01-01").unwrap();

        assert_eq!(adjust_shares(&conn, "JPM", 5.0).unwrap(), TradeAction::Buy);
        assert_eq!(adjust_shares(&conn, "JPM", -3.0).unwrap(), TradeAction::Sell);

        let holding = get(&conn, "JPM").unwrap().unwrap();
        assert_eq!(holding.shares, 12.0);
        assert_eq!(holding.cost_basis, 150.0);
    }

    #[test]
    fn adjust_rejects_zero_delta() {
        let conn = conn();
        add_or_increase_position(&conn, "WMT", 2.0, 60.0, "2024-01-01").unwrap();
        let err = adjust_shares(&conn, "WMT", 0.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn adjust_unknown_ticker_is_not_found() {
        let conn = conn();
        let err = adjust_shares(&conn, "NOPE", 1.0).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn list_is_ticker_ordered() {
        let conn = conn();
        add_or_increase_position(&conn, "MSFT", 1.0, 1.0, "2024-01-01").unwrap();
        add_or_increase_position(&conn, "AAPL", 1.0, 1.0, "2024-01-01").unwrap();
        add_or_increase_position(&conn, "GOOGL", 1.0, 1.0, "2024-01-01").unwrap();

        let tickers: Vec<_> = list(&conn).unwrap().into_iter().map(|h| h.ticker).collect();
        assert_eq!(tickers, vec!["AAPL", "GOOGL", "MSFT"]);
    }
}
