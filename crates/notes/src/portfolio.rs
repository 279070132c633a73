//! Portfolio analytics derived from a user's trade logs.
//!
//! Every view here is a pure function over the notes a user owns. Nothing is
//! cached: the API reloads the notes and recomputes on each request.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use cin_common::types::{NoteWithTrades, Trade, TradeType};

/// Quantities below this are treated as a closed position.
const POSITION_EPSILON: f64 = 1e-9;

/// Headline trading totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_buy_volume: f64,
    pub total_sell_volume: f64,
    pub average_trade_size: f64,
    pub total_trades: usize,
}

/// Position in one symbol reconstructed from its trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Holding {
    pub symbol: String,
    pub bought_quantity: f64,
    pub sold_quantity: f64,
    pub net_quantity: f64,
    /// Volume-weighted price over every buy
    pub average_buy_price: f64,
    /// Running average cost of the open position
    pub average_cost: f64,
    /// Open quantity valued at `average_cost`
    pub cost_basis: f64,
    pub realized_pnl: f64,
    pub trade_count: usize,
}

/// Share of one open holding in the portfolio, valued at cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationSlice {
    pub symbol: String,
    pub value: f64,
    pub percentage: f64,
}

/// Trade volume bucketed by calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub volume: f64,
    pub trades: usize,
}

/// A trade as listed in the trading history.
#[derive(Debug, Clone, Serialize)]
pub struct TradeEntry {
    #[serde(flatten)]
    pub trade: Trade,
    pub note_title: String,
    pub total: Option<f64>,
}

/// Trade direction filter for the trading history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeTypeFilter {
    #[default]
    All,
    Buy,
    Sell,
}

impl TradeTypeFilter {
    fn accepts(self, trade_type: TradeType) -> bool {
        match self {
            TradeTypeFilter::All => true,
            TradeTypeFilter::Buy => trade_type == TradeType::Buy,
            TradeTypeFilter::Sell => trade_type == TradeType::Sell,
        }
    }
}

fn all_trades(notes: &[NoteWithTrades]) -> impl Iterator<Item = &Trade> {
    notes.iter().flat_map(|n| n.trades.iter())
}

/// Buy/sell volume, trade count and average trade size.
///
/// Every trade record counts toward `total_trades`; records without a finite
/// volume are left out of the volume sums.
pub fn performance_metrics(notes: &[NoteWithTrades]) -> PerformanceMetrics {
    let mut metrics = PerformanceMetrics::default();

    for trade in all_trades(notes) {
        metrics.total_trades += 1;

        let Some(volume) = trade.volume() else {
            tracing::warn!(
                trade_id = %trade.id,
                amount = trade.amount,
                price = trade.price,
                "Skipping trade with invalid amount or price"
            );
            continue;
        };

        match trade.trade_type {
            TradeType::Buy => metrics.total_buy_volume += volume,
            TradeType::Sell => metrics.total_sell_volume += volume,
        }
    }

    if metrics.total_trades > 0 {
        metrics.average_trade_size =
            (metrics.total_buy_volume + metrics.total_sell_volume) / metrics.total_trades as f64;
    }

    metrics
}

/// Per-symbol positions, largest cost basis first.
///
/// Trades are replayed in trade-date order; sells realize PnL against the
/// running average cost of the position.
pub fn holdings(notes: &[NoteWithTrades]) -> Vec<Holding> {
    let mut trades: Vec<&Trade> = all_trades(notes).filter(|t| t.volume().is_some()).collect();
    trades.sort_by(|a, b| {
        a.trade_date
            .cmp(&b.trade_date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });

    let mut positions: HashMap<String, Holding> = HashMap::new();
    let mut buy_volume: HashMap<String, f64> = HashMap::new();

    for trade in trades {
        let pos = positions
            .entry(trade.symbol.clone())
            .or_insert_with(|| Holding {
                symbol: trade.symbol.clone(),
                ..Holding::default()
            });
        pos.trade_count += 1;

        match trade.trade_type {
            TradeType::Buy => {
                let held = pos.net_quantity.max(0.0);
                pos.average_cost = weighted_avg(pos.average_cost, held, trade.price, trade.amount);
                pos.net_quantity += trade.amount;
                pos.bought_quantity += trade.amount;
                *buy_volume.entry(trade.symbol.clone()).or_default() += trade.amount * trade.price;
            }
            TradeType::Sell => {
                let closed = trade.amount.min(pos.net_quantity.max(0.0));
                pos.realized_pnl += (trade.price - pos.average_cost) * closed;
                pos.net_quantity -= trade.amount;
                pos.sold_quantity += trade.amount;
                if pos.net_quantity <= POSITION_EPSILON {
                    pos.average_cost = 0.0;
                }
            }
        }
    }

    let mut result: Vec<Holding> = positions
        .into_values()
        .map(|mut pos| {
            if pos.bought_quantity > 0.0 {
                pos.average_buy_price =
                    buy_volume.get(&pos.symbol).copied().unwrap_or_default() / pos.bought_quantity;
            }
            if pos.net_quantity.abs() <= POSITION_EPSILON {
                pos.net_quantity = 0.0;
            }
            pos.cost_basis = pos.net_quantity.max(0.0) * pos.average_cost;
            pos
        })
        .collect();

    result.sort_by(|a, b| {
        b.cost_basis
            .total_cmp(&a.cost_basis)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    result
}

/// Percentage split of open positions by cost basis.
pub fn allocation(holdings: &[Holding]) -> Vec<AllocationSlice> {
    let open: Vec<&Holding> = holdings.iter().filter(|h| h.cost_basis > 0.0).collect();
    let total: f64 = open.iter().map(|h| h.cost_basis).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    open.into_iter()
        .map(|h| AllocationSlice {
            symbol: h.symbol.clone(),
            value: h.cost_basis,
            percentage: h.cost_basis / total * 100.0,
        })
        .collect()
}

/// Every trade, newest trade date first.
pub fn trade_history(notes: &[NoteWithTrades], filter: TradeTypeFilter) -> Vec<TradeEntry> {
    let mut entries: Vec<TradeEntry> = notes
        .iter()
        .flat_map(|n| {
            n.trades
                .iter()
                .filter(move |t| filter.accepts(t.trade_type))
                .map(move |t| TradeEntry {
                    trade: t.clone(),
                    note_title: n.note.title.clone(),
                    total: t.volume(),
                })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.trade
            .trade_date
            .cmp(&a.trade.trade_date)
            .then_with(|| b.trade.created_at.cmp(&a.trade.created_at))
    });
    entries
}

/// Volume and trade count per month, oldest month first.
pub fn monthly_summary(notes: &[NoteWithTrades]) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<(i32, u32), MonthlySummary> = BTreeMap::new();

    for trade in all_trades(notes) {
        let key = (trade.trade_date.year(), trade.trade_date.month());
        let bucket = months.entry(key).or_insert_with(|| MonthlySummary {
            month: format!("{:04}-{:02}", key.0, key.1),
            buy_volume: 0.0,
            sell_volume: 0.0,
            volume: 0.0,
            trades: 0,
        });

        bucket.trades += 1;
        if let Some(volume) = trade.volume() {
            bucket.volume += volume;
            match trade.trade_type {
                TradeType::Buy => bucket.buy_volume += volume,
                TradeType::Sell => bucket.sell_volume += volume,
            }
        }
    }

    months.into_values().collect()
}

fn weighted_avg(avg: f64, qty: f64, price: f64, add_qty: f64) -> f64 {
    let total = qty + add_qty;
    if total <= 0.0 {
        price
    } else {
        ((avg * qty) + (price * add_qty)) / total
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use uuid::Uuid;

    use cin_common::types::Note;

    use super::*;

    fn trade(symbol: &str, trade_type: TradeType, amount: f64, price: f64, date: (i32, u32, u32)) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            note_id: Uuid::nil(),
            symbol: symbol.to_string(),
            trade_type,
            amount,
            price,
            trade_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            memo: String::new(),
            created_at: Utc::now(),
        }
    }

    fn note_with(title: &str, trades: Vec<Trade>) -> NoteWithTrades {
        NoteWithTrades {
            note: Note {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                title: title.to_string(),
                content: String::new(),
                category: "Other".to_string(),
                tags: Vec::new(),
                is_public: false,
                views: 0,
                likes: 0,
                created_at: Utc::now() - Duration::days(1),
                updated_at: Utc::now(),
            },
            trades,
        }
    }

    fn sample_notes() -> Vec<NoteWithTrades> {
        vec![
            note_with(
                "BTC swing",
                vec![
                    trade("BTC", TradeType::Buy, 0.5, 43_800.0, (2024, 1, 20)),
                    trade("BTC", TradeType::Sell, 0.5, 46_200.0, (2024, 1, 30)),
                ],
            ),
            note_with(
                "Alt basket",
                vec![
                    trade("ETH", TradeType::Buy, 8.0, 2_900.0, (2024, 1, 25)),
                    trade("SOL", TradeType::Buy, 50.0, 98.0, (2024, 1, 10)),
                    trade("ADA", TradeType::Sell, 5_000.0, 0.52, (2023, 12, 15)),
                ],
            ),
            note_with("Thoughts only", Vec::new()),
        ]
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_metrics_empty() {
        let metrics = performance_metrics(&[]);
        assert_eq!(metrics, PerformanceMetrics::default());
    }

    #[test]
    fn test_metrics_sums_buy_and_sell_volume() {
        let metrics = performance_metrics(&sample_notes());
        assert_eq!(metrics.total_trades, 5);
        assert!(approx(metrics.total_buy_volume, 21_900.0 + 23_200.0 + 4_900.0));
        assert!(approx(metrics.total_sell_volume, 23_100.0 + 2_600.0));
        assert!(approx(
            metrics.average_trade_size,
            (50_000.0 + 25_700.0) / 5.0
        ));
    }

    #[test]
    fn test_metrics_counts_but_skips_invalid_trades() {
        let notes = vec![note_with(
            "bad data",
            vec![
                trade("BTC", TradeType::Buy, 1.0, 100.0, (2024, 1, 1)),
                trade("BTC", TradeType::Buy, f64::NAN, 100.0, (2024, 1, 2)),
            ],
        )];
        let metrics = performance_metrics(&notes);
        assert_eq!(metrics.total_trades, 2);
        assert!(approx(metrics.total_buy_volume, 100.0));
        assert!(approx(metrics.average_trade_size, 50.0));
    }

    #[test]
    fn test_holdings_realize_pnl_and_close_positions() {
        let holdings = holdings(&sample_notes());
        let btc = holdings.iter().find(|h| h.symbol == "BTC").unwrap();
        assert!(approx(btc.net_quantity, 0.0));
        assert!(approx(btc.realized_pnl, (46_200.0 - 43_800.0) * 0.5));
        assert!(approx(btc.cost_basis, 0.0));
        assert!(approx(btc.average_buy_price, 43_800.0));
        assert_eq!(btc.trade_count, 2);

        let eth = holdings.iter().find(|h| h.symbol == "ETH").unwrap();
        assert!(approx(eth.cost_basis, 23_200.0));
        assert_eq!(holdings[0].symbol, "ETH");
    }

    #[test]
    fn test_holdings_sell_without_position_goes_short() {
        let holdings = holdings(&sample_notes());
        let ada = holdings.iter().find(|h| h.symbol == "ADA").unwrap();
        assert!(approx(ada.net_quantity, -5_000.0));
        assert!(approx(ada.realized_pnl, 0.0));
        assert!(approx(ada.cost_basis, 0.0));
    }

    #[test]
    fn test_holdings_average_cost_weighted() {
        let notes = vec![note_with(
            "dca",
            vec![
                trade("ETH", TradeType::Buy, 1.0, 2_000.0, (2024, 1, 1)),
                trade("ETH", TradeType::Buy, 3.0, 3_000.0, (2024, 1, 2)),
                trade("ETH", TradeType::Sell, 2.0, 3_500.0, (2024, 1, 3)),
            ],
        )];
        let holdings = holdings(&notes);
        let eth = &holdings[0];
        assert!(approx(eth.average_cost, 2_750.0));
        assert!(approx(eth.net_quantity, 2.0));
        assert!(approx(eth.cost_basis, 5_500.0));
        assert!(approx(eth.realized_pnl, (3_500.0 - 2_750.0) * 2.0));
    }

    #[test]
    fn test_allocation_percentages_sum_to_hundred() {
        let slices = allocation(&holdings(&sample_notes()));
        let symbols: Vec<_> = slices.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, ["ETH", "SOL"]);

        let total: f64 = slices.iter().map(|s| s.percentage).sum();
        assert!(approx(total, 100.0));
        assert!(approx(slices[0].percentage, 23_200.0 / 28_100.0 * 100.0));
    }

    #[test]
    fn test_allocation_empty_without_open_positions() {
        assert!(allocation(&[]).is_empty());
    }

    #[test]
    fn test_trade_history_sorted_and_filtered() {
        let notes = sample_notes();
        let all = trade_history(&notes, TradeTypeFilter::All);
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].trade.symbol, "BTC");
        assert_eq!(all[0].trade.trade_type, TradeType::Sell);
        assert_eq!(all[0].note_title, "BTC swing");
        assert_eq!(all[4].trade.symbol, "ADA");

        let sells = trade_history(&notes, TradeTypeFilter::Sell);
        assert_eq!(sells.len(), 2);
        assert!(sells.iter().all(|e| e.trade.trade_type == TradeType::Sell));
        assert_eq!(sells[0].total, Some(23_100.0));
    }

    #[test]
    fn test_monthly_summary_buckets_by_month() {
        let months = monthly_summary(&sample_notes());
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2023-12");
        assert_eq!(months[0].trades, 1);
        assert!(approx(months[0].sell_volume, 2_600.0));
        assert_eq!(months[1].month, "2024-01");
        assert_eq!(months[1].trades, 4);
        assert!(approx(months[1].volume, 21_900.0 + 23_100.0 + 23_200.0 + 4_900.0));
    }

    #[test]
    fn test_weighted_avg() {
        assert!(approx(weighted_avg(0.0, 0.0, 100.0, 2.0), 100.0));
        assert!(approx(weighted_avg(100.0, 2.0, 200.0, 2.0), 150.0));
    }
}
