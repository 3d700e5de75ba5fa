//! Valuation engine. Pure: identical holdings and identical lookup answers
//! always produce an identical snapshot.

use crate::models::{Holding, ValuationSnapshot};
use std::collections::BTreeMap;

/// Value the portfolio against the supplied price and sector lookups.
///
/// A holding whose price does not resolve is silently excluded from the
/// total, the sector breakdown, and the gain/loss map for this pass; a
/// stale or unreachable provider should not corrupt the whole snapshot.
/// The displayed total therefore understates true exposure during provider
/// outages. A resolvable holding whose sector does not resolve is bucketed
/// under "Unknown".
///
/// Costs one price and one sector lookup per holding per call, so a naive
/// caller makes O(holdings) provider round-trips per snapshot; batching or
/// caching upstream is fine as long as the answers are unchanged.
pub fn compute_snapshot<P, S>(
    holdings: &[Holding],
    price_lookup: P,
    sector_lookup: S,
) -> ValuationSnapshot
where
    P: Fn(&str) -> Option<f64>,
    S: Fn(&str) -> Option<String>,
{
    let mut total_value = 0.0;
    let mut sector_values: BTreeMap<String, f64> = BTreeMap::new();
    let mut gain_loss = BTreeMap::new();
    let mut current_prices = BTreeMap::new();

    for holding in holdings {
        let Some(price) = price_lookup(&holding.ticker) else {
            continue;
        };
        current_prices.insert(holding.ticker.clone(), price);

        let value = holding.shares * price;
        total_value += value;

        let sector = sector_lookup(&holding.ticker).unwrap_or_else(|| "Unknown".to_string());
        *sector_values.entry(sector).or_insert(0.0) += value;

        gain_loss.insert(
            holding.ticker.clone(),
            (price - holding.cost_basis) * holding.shares,
        );
    }

    let sector_breakdown = sector_values
        .into_iter()
        .map(|(sector, value)| {
            let pct = if total_value > 0.0 {
                value / total_value * 100.0
            } else {
                0.0
            };
            (sector, pct)
        })
        .collect();

    ValuationSnapshot {
        total_value,
        sector_breakdown,
        gain_loss,
        current_prices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn holding(ticker: &str, shares: f64, cost_basis: f64) -> Holding {
        Holding {
            ticker: ticker.to_string(),
            shares,
            cost_basis,
            acquired_on: "2024-01-01".to_string(),
        }
    }

    #[test]
    fn single_holding_scenario() {
        let holdings = vec![holding("AAPL", 10.0, 150.0)];
        let snapshot = compute_snapshot(
            &holdings,
            |t| (t == "AAPL").then_some(180.0),
            |t| (t == "AAPL").then(|| "Technology".to_string()),
        );

        assert_eq!(snapshot.total_value, 1800.0);
        assert_eq!(snapshot.gain_loss["AAPL"], 300.0);
        assert_eq!(snapshot.sector_breakdown["Technology"], 100.0);
        assert_eq!(snapshot.current_prices["AAPL"], 180.0);
    }

    #[test]
    fn sector_percentages_sum_to_one_hundred() {
        let holdings = vec![
            holding("AAPL", 10.0, 150.0),
            holding("JPM", 5.0, 140.0),
            holding("XOM", 8.0, 90.0),
        ];
        let prices: HashMap<&str, f64> =
            [("AAPL", 180.0), ("JPM", 200.0), ("XOM", 110.0)].into();
        let sectors: HashMap<&str, &str> = [
            ("AAPL", "Technology"),
            ("JPM", "Financial Services"),
            ("XOM", "Energy"),
        ]
        .into();

        let snapshot = compute_snapshot(
            &holdings,
            |t| prices.get(t).copied(),
            |t| sectors.get(t).map(|s| s.to_string()),
        );

        let sum: f64 = snapshot.sector_breakdown.values().sum();
        assert!((sum - 100.0).abs() < 1e-9, "sector sum was {}", sum);
        assert_eq!(snapshot.sector_breakdown.len(), 3);
    }

    #[test]
    fn every_lookup_failing_yields_empty_snapshot() {
        let holdings = vec![holding("AAPL", 10.0, 150.0), holding("JPM", 5.0, 140.0)];
        let snapshot = compute_snapshot(&holdings, |_| None, |_| None);

        assert_eq!(snapshot.total_value, 0.0);
        assert!(snapshot.sector_breakdown.is_empty());
        assert!(snapshot.gain_loss.is_empty());
        assert!(snapshot.current_prices.is_empty());
    }

    #[test]
    fn unpriceable_holding_is_excluded_not_fatal() {
        let holdings = vec![holding("AAPL", 10.0, 150.0), holding("DARK", 100.0, 1.0)];
        let snapshot = compute_snapshot(
            &holdings,
            |t| (t == "AAPL").then_some(180.0),
            |_| Some("Technology".to_string()),
        );

        assert_eq!(snapshot.total_value, 1800.0);
        assert!(!snapshot.current_prices.contains_key("DARK"));
        assert!(!snapshot.gain_loss.contains_key("DARK"));
        assert_eq!(snapshot.sector_breakdown["Technology"], 100.0);
    }

    #[test]
    fn missing_sector_defaults_to_unknown() {
        let holdings = vec![holding("ODD", 2.0, 10.0)];
        let snapshot = compute_snapshot(&holdings, |_| Some(20.0), |_| None);

        assert_eq!(snapshot.sector_breakdown["Unknown"], 100.0);
        assert_eq!(snapshot.gain_loss["ODD"], 20.0);
    }

    #[test]
    fn empty_holdings_yield_default_snapshot() {
        let snapshot = compute_snapshot(&[], |_| Some(1.0), |_| None);
        assert_eq!(snapshot, ValuationSnapshot::default());
    }

    #[test]
    fn gain_loss_can_be_negative() {
        let holdings = vec![holding("TSLA", 4.0, 300.0)];
        let snapshot = compute_snapshot(&holdings, |_| Some(250.0), |_| None);
        assert_eq!(snapshot.gain_loss["TSLA"], -200.0);
    }
}
