use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A current position in one ticker. At most one holding per ticker exists
/// at any time; a holding reduced to zero shares is deleted, never kept as
/// a zero row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub shares: f64,
    /// Price per share recorded at acquisition (weighted across buys).
    pub cost_basis: f64,
    /// Date of the most recent buy, `YYYY-MM-DD`.
    pub acquired_on: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(TradeAction::Buy),
            "SELL" => Some(TradeAction::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable entry in the append-only trade journal. `shares` is the
/// magnitude moved, never a signed delta.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub ticker: String,
    pub action: TradeAction,
    pub shares: f64,
    pub price: f64,
    pub date: String,
    pub notes: String,
}

/// Point-in-time valuation computed from the current holdings and a
/// price/sector lookup. Never persisted; recomputed on every request.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ValuationSnapshot {
    pub total_value: f64,
    /// Sector name -> percentage of total value. Percentages sum to 100
    /// when `total_value > 0`, and are each 0 when it is 0.
    pub sector_breakdown: BTreeMap<String, f64>,
    /// Ticker -> (current price - cost basis) * shares.
    pub gain_loss: BTreeMap<String, f64>,
    /// Ticker -> resolved price. Tickers the provider could not price are
    /// omitted here and excluded from every other field.
    pub current_prices: BTreeMap<String, f64>,
}

#[derive(Deserialize, Debug)]
pub struct AddStockRequest {
    pub ticker: String,
    pub shares: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct RemoveStockRequest {
    pub ticker: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UpdateSharesRequest {
    pub ticker: String,
    /// Signed share delta: positive buys, negative sells.
    pub shares_change: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct Announcement {
    pub id: i64,
    pub content: String,
    pub posted_by: String,
    pub posted_at: String,
}

#[derive(Serialize, Debug)]
pub struct Recap {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub posted_by: String,
    pub posted_at: String,
}

#[derive(Serialize, Debug)]
pub struct Notice {
    pub id: i64,
    pub content: String,
    pub posted_by: String,
    pub posted_at: String,
}

#[derive(Deserialize, Debug)]
pub struct PostContentRequest {
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct PostRecapRequest {
    pub title: String,
    pub content: String,
}

/// Payload for `GET /`: the live snapshot plus the latest club news.
#[derive(Serialize, Debug)]
pub struct Dashboard {
    pub snapshot: ValuationSnapshot,
    pub holdings: Vec<Holding>,
    pub announcements: Vec<Announcement>,
}

#[derive(Serialize, Debug)]
pub struct IntradayResponse {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// One row of the watchlist quote board on `/stocks`. Fields the provider
/// could not supply serialize as null.
#[derive(Serialize, Debug)]
pub struct WatchQuote {
    pub ticker: String,
    pub name: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
}
