//! Market data gateway backed by the Finnhub REST API.
//!
//! Every function here treats provider errors, timeouts, and absent data
//! the same way: the caller sees `None` (or an empty series / "Unknown"),
//! never an error. Quotes are cached for five minutes per symbol; the
//! cache is an optimization only and does not change any valuation
//! semantics.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Fixed watchlist shown on the quote board and included in `/api/prices`.
pub const WATCHLIST: [&str; 10] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "JPM", "WMT", "V",
];

const QUOTE_TTL: Duration = Duration::from_secs(300);

/// Quote fields returned by Finnhub's /quote endpoint.
#[derive(Deserialize, Clone)]
pub struct Quote {
    pub c: f64,  // Current price
    pub d: f64,  // Day change
    pub dp: f64, // Day change percentage
}

#[derive(Deserialize)]
struct CompanyProfile {
    name: Option<String>,
    #[serde(rename = "finnhubIndustry")]
    industry: Option<String>,
}

#[derive(Deserialize, Default)]
struct Candles {
    #[serde(default)]
    s: String,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    t: Vec<i64>,
}

// One shared client with a bounded timeout; a hung provider call must not
// hang a request indefinitely.
lazy_static::lazy_static! {
    static ref CLIENT: reqwest::Client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("failed to build http client");
    static ref QUOTE_CACHE: Mutex<HashMap<String, (Quote, Instant)>> = Mutex::new(HashMap::new());
}

fn api_key() -> Option<String> {
    match dotenv::var("FINNHUB_API_KEY") {
        Ok(key) if !key.is_empty() => Some(key),
        _ => {
            tracing::warn!("FINNHUB_API_KEY is not set; market data unavailable");
            None
        }
    }
}

async fn get_json<T: serde::de::DeserializeOwned>(url: &str, symbol: &str) -> Option<T> {
    let response = match CLIENT.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("market data request failed for {}: {}", symbol, e);
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::warn!(
            "market data request for {} returned HTTP {}",
            symbol,
            response.status()
        );
        return None;
    }
    response.json().await.ok()
}

/// Fetch the full quote for a symbol, consulting the cache first. A quote
/// with a non-positive price is treated as no data.
pub async fn quote(symbol: &str) -> Option<Quote> {
    let now = Instant::now();

    let mut cache = QUOTE_CACHE.lock().await;
    if let Some((quote, fetched_at)) = cache.get(symbol) {
        if now.duration_since(*fetched_at) < QUOTE_TTL {
            return Some(quote.clone());
        }
    }

    let url = format!(
        "https://finnhub.io/api/v1/quote?symbol={}&token={}",
        symbol,
        api_key()?
    );
    let quote: Quote = get_json(&url, symbol).await?;
    if quote.c <= 0.0 {
        return None;
    }

    cache.insert(symbol.to_string(), (quote.clone(), now));
    Some(quote)
}

/// Current price for a symbol, or `None` when the provider cannot price it.
pub async fn current_price(symbol: &str) -> Option<f64> {
    quote(symbol).await.map(|q| q.c)
}

/// Sector classification for a symbol, defaulting to "Unknown" when the
/// provider fails or has no classification.
pub async fn sector(symbol: &str) -> String {
    match profile(symbol).await.and_then(|p| p.industry) {
        Some(industry) if !industry.is_empty() => industry,
        _ => "Unknown".to_string(),
    }
}

/// Company display name, defaulting to "Unknown".
pub async fn company_name(symbol: &str) -> String {
    match profile(symbol).await.and_then(|p| p.name) {
        Some(name) if !name.is_empty() => name,
        _ => "Unknown".to_string(),
    }
}

async fn profile(symbol: &str) -> Option<CompanyProfile> {
    let url = format!(
        "https://finnhub.io/api/v1/stock/profile2?symbol={}&token={}",
        symbol,
        api_key()?
    );
    get_json(&url, symbol).await
}

/// Today's intraday closes at 5-minute resolution as (timestamp, price)
/// pairs, oldest first. Empty on any failure or when the provider has no
/// candles for the symbol.
pub async fn intraday_series(symbol: &str) -> Vec<(String, f64)> {
    let Some(key) = api_key() else {
        return Vec::new();
    };
    let to = chrono::Utc::now().timestamp();
    let from = to - 24 * 3600;
    let url = format!(
        "https://finnhub.io/api/v1/stock/candle?symbol={}&resolution=5&from={}&to={}&token={}",
        symbol, from, to, key
    );
    let Some(candles) = get_json::<Candles>(&url, symbol).await else {
        return Vec::new();
    };
    if candles.s != "ok" {
        return Vec::new();
    }
    candles
        .t
        .iter()
        .zip(candles.c.iter())
        .filter_map(|(ts, close)| {
            chrono::DateTime::from_timestamp(*ts, 0)
                .map(|dt| (dt.format("%Y-%m-%d %H:%M").to_string(), *close))
        })
        .collect()
}
