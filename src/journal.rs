//! Append-only trade journal. Entries are never updated or deleted; the
//! journal is the audit trail and is independent of the current holdings.

use rusqlite::Connection;

use crate::error::AppError;
use crate::models::{TradeAction, Transaction};

/// Record one trade. `shares` is stored as an absolute magnitude whatever
/// the caller passes.
pub fn append(
    conn: &Connection,
    ticker: &str,
    action: TradeAction,
    shares: f64,
    price: f64,
    date: &str,
    notes: &str,
) -> Result<Transaction, AppError> {
    if ticker.trim().is_empty() {
        return Err(AppError::Validation("ticker is required".to_string()));
    }

    let transaction = Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        ticker: ticker.to_string(),
        action,
        shares: shares.abs(),
        price,
        date: date.to_string(),
        notes: notes.to_string(),
    };

    conn.execute(
        "INSERT INTO transactions (id, ticker, action, shares, price, date, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            transaction.id,
            transaction.ticker,
            transaction.action.as_str(),
            transaction.shares,
            transaction.price,
            transaction.date,
            transaction.notes,
        ],
    )?;

    Ok(transaction)
}

/// All journal entries, newest date first. Same-day entries are returned
/// most-recently-inserted first, since the date string alone cannot order
/// them.
pub fn list_descending(conn: &Connection) -> Result<Vec<Transaction>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, ticker, action, shares, price, date, notes
         FROM transactions
         ORDER BY date DESC, rowid DESC",
    )?;
    let transactions = stmt
        .query_map([], |row| {
            let action: String = row.get(2)?;
            Ok(Transaction {
                id: row.get(0)?,
                ticker: row.get(1)?,
                action: TradeAction::parse(&action).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        format!("unknown trade action '{}'", action).into(),
                    )
                })?,
                shares: row.get(3)?,
                price: row.get(4)?,
                date: row.get(5)?,
                notes: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transactions)
}
