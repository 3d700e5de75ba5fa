//! Portfolio mutation service. Each operation checks the caller's
//! capability, then runs the ledger update and the journal append inside
//! one database transaction so they succeed or fail together. Price
//! resolution happens before these are called; a failed lookup never
//! reaches this layer.

use rusqlite::Connection;

use crate::error::AppError;
use crate::journal;
use crate::ledger;
use crate::models::{TradeAction, Transaction};

/// What the calling member is allowed to do. Decouples the mutation core
/// from any particular credential scheme; the HTTP layer derives this from
/// the session.
#[derive(Debug, Clone, Copy)]
pub struct MemberCaps {
    pub can_mutate_portfolio: bool,
}

impl MemberCaps {
    pub const CLUB_HEAD: MemberCaps = MemberCaps {
        can_mutate_portfolio: true,
    };
    pub const READ_ONLY: MemberCaps = MemberCaps {
        can_mutate_portfolio: false,
    };
}

fn require_mutate(caps: &MemberCaps) -> Result<(), AppError> {
    if caps.can_mutate_portfolio {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "only club heads can change the portfolio".to_string(),
        ))
    }
}

/// Buy `shares` of `ticker` at the resolved market price, or abort before
/// any write when the provider could not price it. This is the entry point
/// the HTTP layer uses, so the no-partial-state guarantee lives here and
/// not in the handler.
pub fn buy_at_market(
    conn: &mut Connection,
    caps: &MemberCaps,
    ticker: &str,
    shares: f64,
    price: Option<f64>,
    date: &str,
    notes: &str,
) -> Result<Transaction, AppError> {
    let price = price.ok_or_else(|| AppError::MarketData(ticker.to_string()))?;
    buy(conn, caps, ticker, shares, price, date, notes)
}

/// Adjust an existing position at the resolved market price, aborting
/// before any write when the price did not resolve.
pub fn adjust_at_market(
    conn: &mut Connection,
    caps: &MemberCaps,
    ticker: &str,
    delta: f64,
    price: Option<f64>,
    date: &str,
    notes: &str,
) -> Result<Transaction, AppError> {
    let price = price.ok_or_else(|| AppError::MarketData(ticker.to_string()))?;
    adjust(conn, caps, ticker, delta, price, date, notes)
}

/// Buy `shares` of `ticker` at `price`: create or grow the holding and
/// journal a BUY of the same magnitude.
pub fn buy(
    conn: &mut Connection,
    caps: &MemberCaps,
    ticker: &str,
    shares: f64,
    price: f64,
    date: &str,
    notes: &str,
) -> Result<Transaction, AppError> {
    require_mutate(caps)?;

    let tx = conn.transaction()?;
    ledger::add_or_increase_position(&tx, ticker, shares, price, date)?;
    let record = journal::append(&tx, ticker, TradeAction::Buy, shares, price, date, notes)?;
    tx.commit()?;

    tracing::info!("bought {} shares of {} at {}", shares, ticker, price);
    Ok(record)
}

/// Close out a position entirely. The SELL entry records the full prior
/// share count at the recorded cost basis; removal does not consult the
/// market.
pub fn liquidate(
    conn: &mut Connection,
    caps: &MemberCaps,
    ticker: &str,
    date: &str,
    notes: &str,
) -> Result<Transaction, AppError> {
    require_mutate(caps)?;

    let tx = conn.transaction()?;
    let (shares, cost_basis) = ledger::remove_position(&tx, ticker)?;
    let record = journal::append(
        &tx,
        ticker,
        TradeAction::Sell,
        shares,
        cost_basis,
        date,
        notes,
    )?;
    tx.commit()?;

    tracing::info!("removed {} from the portfolio", ticker);
    Ok(record)
}

/// Apply a signed share delta to an existing position and journal the
/// move with magnitude `|delta|` at the supplied market price.
pub fn adjust(
    conn: &mut Connection,
    caps: &MemberCaps,
    ticker: &str,
    delta: f64,
    price: f64,
    date: &str,
    notes: &str,
) -> Result<Transaction, AppError> {
    require_mutate(caps)?;

    let tx = conn.transaction()?;
    let action = ledger::adjust_shares(&tx, ticker, delta)?;
    let record = journal::append(&tx, ticker, action, delta.abs(), price, date, notes)?;
    tx.commit()?;

    tracing::info!("adjusted {} by {} shares", ticker, delta);
    Ok(record)
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
    fn buy_creates_holding_and_journals_it() {
        let mut conn = conn();
        let record = buy(
            &mut conn,
            &MemberCaps::CLUB_HEAD,
            "AAPL",
            10.0,
            180.0,
            "2024-03-01",
            "first club buy",
        )
        .unwrap();

        assert_eq!(record.action, TradeAction::Buy);
        assert_eq!(record.shares, 10.0);

        let holding = ledger::get(&conn, "AAPL").unwrap().unwrap();
        assert_eq!(holding.shares, 10.0);

        let journaled = journal::list_descending(&conn).unwrap();
        assert_eq!(journaled.len(), 1);
        assert_eq!(journaled[0].notes, "first club buy");
    }

    #[test]
    fn liquidate_sells_full_position_at_cost_basis() {
        let mut conn = conn();
        buy(&mut conn, &MemberCaps::CLUB_HEAD, "MSFT", 6.0, 310.0, "2024-03-01", "").unwrap();

        let record =
            liquidate(&mut conn, &MemberCaps::CLUB_HEAD, "MSFT", "2024-04-01", "").unwrap();
        assert_eq!(record.action, TradeAction::Sell);
        assert_eq!(record.shares, 6.0);
        assert_eq!(record.price, 310.0);
        assert!(ledger::get(&conn, "MSFT").unwrap().is_none());
    }

    #[test]
    fn selling_out_via_adjust_removes_holding_and_journals_sell() {
        let mut conn = conn();
        buy(&mut conn, &MemberCaps::CLUB_HEAD, "AAPL", 10.0, 150.0, "2024-03-01", "").unwrap();

        let record = adjust(
            &mut conn,
            &MemberCaps::CLUB_HEAD,
            "AAPL",
            -10.0,
            182.5,
            "2024-04-01",
            "",
        )
        .unwrap();

        assert_eq!(record.action, TradeAction::Sell);
        assert_eq!(record.shares, 10.0);
        assert_eq!(record.price, 182.5);
        assert!(ledger::get(&conn, "AAPL").unwrap().is_none());
    }

    #[test]
    fn failed_adjust_writes_nothing() {
        let mut conn = conn();
        buy(&mut conn, &MemberCaps::CLUB_HEAD, "NVDA", 3.0, 500.0, "2024-03-01", "").unwrap();

        let err = adjust(
            &mut conn,
            &MemberCaps::CLUB_HEAD,
            "NVDA",
            -4.0,
            510.0,
            "2024-04-01",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // Holding untouched, no SELL journaled.
        assert_eq!(ledger::get(&conn, "NVDA").unwrap().unwrap().shares, 3.0);
        assert_eq!(journal::list_descending(&conn).unwrap().len(), 1);
    }

    #[test]
    fn unpriceable_buy_aborts_before_any_write() {
        let mut conn = conn();
        let err = buy_at_market(
            &mut conn,
            &MemberCaps::CLUB_HEAD,
            "DARK",
            10.0,
            None,
            "2024-03-01",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::MarketData(_)));

        // No holding and no journal entry came out of the aborted buy.
        assert!(ledger::list(&conn).unwrap().is_empty());
        assert!(journal::list_descending(&conn).unwrap().is_empty());
    }

    #[test]
    fn unpriceable_adjust_aborts_before_any_write() {
        let mut conn = conn();
        buy(&mut conn, &MemberCaps::CLUB_HEAD, "AAPL", 10.0, 150.0, "2024-03-01", "").unwrap();

        let err = adjust_at_market(
            &mut conn,
            &MemberCaps::CLUB_HEAD,
            "AAPL",
            -4.0,
            None,
            "2024-04-01",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::MarketData(_)));

        assert_eq!(ledger::get(&conn, "AAPL").unwrap().unwrap().shares, 10.0);
        assert_eq!(journal::list_descending(&conn).unwrap().len(), 1);
    }

    #[test]
    fn read_only_caps_cannot_mutate() {
        let mut conn = conn();
        let err = buy(
            &mut conn,
            &MemberCaps::READ_ONLY,
            "AAPL",
            1.0,
            180.0,
            "2024-03-01",
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(ledger::list(&conn).unwrap().is_empty());
        assert!(journal::list_descending(&conn).unwrap().is_empty());
    }
}
