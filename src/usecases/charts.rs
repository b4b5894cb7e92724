//! Derived views over loaded snapshot batches.
//!
//! Every function here is pure. Batches are taken in the order the store
//! returns them (newest first); each view collapses rows by symbol itself, so
//! passing already-collapsed batches is harmless.

use crate::domain::models::{
    Asset, AssetAction, AssetChangeData, AssetChangePoint, AssetPercentage, AssetPrice, AssetRow,
    CoinAmountSeries, CoinPercentageSeries, CoinRankSeries, HistoricalData, PercentagePoint,
    PnlData, PnlPoint, RankPoint, TopCoinsPercentageChangeData, TopCoinsRankData,
    TotalValueData, TotalValuePoint, WalletAssetsChange, WalletInfo,
};
use crate::utils::color::generate_colors;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

pub const TOP_COINS_LIMIT: usize = 10;
pub const PNL_MIN_HISTORY: usize = 35;
pub const MATERIALITY_THRESHOLD_USD: f64 = 10.0;
// keeps percentages finite when every holding is worth zero
const ZERO_TOTAL_EPSILON: f64 = 1e-21;

/// Group rows by symbol, summing amount and value across wallets.
///
/// The first row of each symbol (in order of first appearance) supplies
/// every other field, price included.
pub fn collapse(rows: &[AssetRow]) -> Vec<AssetRow> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<AssetRow> = Vec::new();
    for row in rows {
        match index.get(row.symbol.as_str()) {
            Some(&i) => {
                out[i].amount += row.amount;
                out[i].value += row.value;
            }
            None => {
                index.insert(row.symbol.as_str(), out.len());
                out.push(row.clone());
            }
        }
    }
    out
}

pub fn collapse_all(batches: &[Vec<AssetRow>]) -> Vec<Vec<AssetRow>> {
    batches.iter().map(|b| collapse(b)).collect()
}

fn batch_value(batch: &[AssetRow]) -> f64 {
    batch.iter().map(|a| a.value).sum()
}

fn batch_timestamp(batch: &[AssetRow]) -> Option<i64> {
    batch.first().map(|a| a.created_at.timestamp_millis())
}

// Collapsed, non-empty batches, oldest first
fn chronological(batches: &[Vec<AssetRow>]) -> Vec<Vec<AssetRow>> {
    batches
        .iter()
        .rev()
        .filter(|b| !b.is_empty())
        .map(|b| collapse(b))
        .collect()
}

fn sorted_by_value_desc(batch: &[AssetRow]) -> Vec<&AssetRow> {
    let mut sorted: Vec<&AssetRow> = batch.iter().collect();
    sorted.sort_by(|a, b| b.value.total_cmp(&a.value));
    sorted
}

/// Union of each batch's top `limit` symbols by value, in order of first
/// appearance. `None` takes every symbol.
pub fn top_coins(batches: &[Vec<AssetRow>], limit: Option<usize>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut coins = Vec::new();
    for batch in batches {
        let sorted = sorted_by_value_desc(batch);
        let take = limit.unwrap_or(sorted.len());
        for asset in sorted.into_iter().take(take) {
            if seen.insert(asset.symbol.clone()) {
                coins.push(asset.symbol.clone());
            }
        }
    }
    coins
}

fn unique_timestamps(batches: &[Vec<AssetRow>]) -> Vec<i64> {
    let mut seen = HashSet::new();
    batches
        .iter()
        .flatten()
        .map(|a| a.created_at.timestamp_millis())
        .filter(|ts| seen.insert(*ts))
        .collect()
}

pub fn total_value(batches: &[Vec<AssetRow>]) -> TotalValueData {
    TotalValueData {
        total_value: batches.first().map(|b| batch_value(b)).unwrap_or(0.0),
        prev_total_value: batches.get(1).map(|b| batch_value(b)).unwrap_or(0.0),
    }
}

/// Batches to load for `pnl(size)`: one extra for the first delta, and
/// never fewer than needed for the 30 day figure.
pub fn pnl_query_size(size: usize) -> usize {
    (size + 1).max(PNL_MIN_HISTORY)
}

pub fn pnl(batches: &[Vec<AssetRow>], size: usize) -> PnlData {
    let data: Vec<TotalValuePoint> = chronological(batches)
        .iter()
        .filter_map(|b| {
            batch_timestamp(b).map(|timestamp| TotalValuePoint {
                total_value: batch_value(b),
                timestamp,
            })
        })
        .collect();

    let pnl_over = |days: usize| -> Option<PnlPoint> {
        if data.len() < days + 1 {
            return None;
        }
        let picked = &data[data.len() - days - 1];
        let latest = &data[data.len() - 1];
        Some(PnlPoint {
            value: latest.total_value - picked.total_value,
            timestamp: picked.timestamp,
        })
    };
    let today_pnl = pnl_over(1);
    let seven_day_pnl = pnl_over(8);
    let thirty_day_pnl = pnl_over(31);

    let keep = size + 1;
    let data = if data.len() > keep {
        data[data.len() - keep..].to_vec()
    } else {
        data
    };

    PnlData {
        data,
        today_pnl,
        seven_day_pnl,
        thirty_day_pnl,
    }
}

pub fn top_coins_rank(batches: &[Vec<AssetRow>]) -> TopCoinsRankData {
    let ordered = chronological(batches);
    let coins = top_coins(&ordered, Some(TOP_COINS_LIMIT));
    let colors = generate_colors(coins.len());

    let rank_data = |symbol: &str| -> Vec<RankPoint> {
        ordered
            .iter()
            .filter_map(|batch| {
                let position = sorted_by_value_desc(batch)
                    .iter()
                    .position(|a| a.symbol == symbol)?;
                let rank = position + 1;
                Some(RankPoint {
                    timestamp: batch_timestamp(batch)?,
                    rank: (rank <= TOP_COINS_LIMIT).then_some(rank),
                })
            })
            .collect()
    };

    TopCoinsRankData {
        timestamps: unique_timestamps(&ordered),
        coins: coins
            .iter()
            .zip(colors)
            .map(|(coin, color)| CoinRankSeries {
                coin: coin.clone(),
                line_color: color.to_rgba(),
                rank_data: rank_data(coin),
            })
            .collect(),
    }
}

fn percentage_from(first: f64, cur: f64) -> Option<f64> {
    if first == 0.0 {
        return None;
    }
    Some((cur - first) / first * 100.0)
}

pub fn top_coins_percentage_change(batches: &[Vec<AssetRow>]) -> TopCoinsPercentageChangeData {
    let ordered = chronological(batches);
    let coins = top_coins(&ordered, Some(TOP_COINS_LIMIT));
    let colors = generate_colors(coins.len());

    let percentage_data = |symbol: &str| -> Vec<PercentagePoint> {
        let appearances: Vec<&AssetRow> = ordered
            .iter()
            .filter_map(|b| b.iter().find(|a| a.symbol == symbol))
            .collect();
        let Some(first) = appearances.first() else {
            return vec![];
        };
        appearances
            .iter()
            .map(|a| PercentagePoint {
                timestamp: a.created_at.timestamp_millis(),
                value: percentage_from(first.value, a.value),
                price: percentage_from(first.price, a.price),
            })
            .collect()
    };

    TopCoinsPercentageChangeData {
        timestamps: unique_timestamps(&ordered),
        coins: coins
            .iter()
            .zip(colors)
            .map(|(coin, color)| CoinPercentageSeries {
                coin: coin.clone(),
                line_color: color.to_rgba(),
                percentage_data: percentage_data(coin),
            })
            .collect(),
    }
}

pub fn latest_assets_percentage(batches: &[Vec<AssetRow>]) -> Vec<AssetPercentage> {
    let Some(latest) = batches.first() else {
        return vec![];
    };
    let latest = collapse(latest);
    let total = batch_value(&latest) + ZERO_TOTAL_EPSILON;

    let mut res: Vec<(String, f64, f64, f64)> = latest
        .iter()
        .map(|a| (a.symbol.clone(), a.amount, a.value, a.value / total * 100.0))
        .collect();
    res.sort_by(|a, b| b.3.total_cmp(&a.3));

    let colors = generate_colors(res.len());
    res.into_iter()
        .zip(colors)
        .map(|((coin, amount, value, percentage), color)| AssetPercentage {
            coin,
            amount,
            value,
            percentage,
            chart_color: color.to_rgba(),
        })
        .collect()
}

fn take_last<T: Clone>(items: &[T], size: usize) -> Vec<T> {
    items[items.len().saturating_sub(size)..].to_vec()
}

/// Amount/value series for every coin seen in the window, each keeping its
/// most recent `size` points in chronological order.
pub fn coins_amount_change(batches: &[Vec<AssetRow>], size: usize) -> Vec<CoinAmountSeries> {
    let ordered = chronological(batches);
    let coins = top_coins(&ordered, None);
    let colors = generate_colors(coins.len());

    coins
        .into_iter()
        .zip(colors)
        .map(|(coin, color)| {
            let points: Vec<&AssetRow> = ordered
                .iter()
                .filter_map(|b| b.iter().find(|a| a.symbol == coin))
                .collect();
            let amounts: Vec<f64> = points.iter().map(|a| a.amount).collect();
            let values: Vec<f64> = points.iter().map(|a| a.value).collect();
            let timestamps: Vec<i64> = points
                .iter()
                .map(|a| a.created_at.timestamp_millis())
                .collect();
            CoinAmountSeries {
                coin,
                line_color: color.to_rgba(),
                amounts: take_last(&amounts, size),
                values: take_last(&values, size),
                timestamps: take_last(&timestamps, size),
            }
        })
        .collect()
}

pub fn asset_change(batches: &[Vec<AssetRow>]) -> AssetChangeData {
    let ordered = chronological(batches);
    AssetChangeData {
        timestamps: unique_timestamps(&ordered),
        data: ordered
            .iter()
            .map(|b| AssetChangePoint {
                usd_value: batch_value(b),
                btc_price: b.iter().find(|a| a.symbol == "BTC").map(|a| a.price),
            })
            .collect(),
    }
}

/// Buy/sell events for `symbol`, inferred from consecutive snapshots.
///
/// `batches` must be unfiltered so a snapshot in which the symbol vanished
/// still separates its neighbours. The oldest snapshot is the baseline and
/// emits nothing. Per (wallet, symbol) in the newer snapshot: absent before
/// means a full-amount entry; otherwise a delta is emitted when
/// `|delta| * price` exceeds the materiality threshold or the price is zero.
/// Holdings that disappear emit a negative full-amount exit stamped with the
/// last row that held them (id, uuid and createdAt alike). Prices come
/// from the latest override for the row when there is one.
pub fn asset_actions(
    batches: &[Vec<AssetRow>],
    symbol: &str,
    overrides: &[AssetPrice],
) -> Vec<AssetAction> {
    let mut latest_overrides: Vec<&AssetPrice> = overrides.iter().collect();
    latest_overrides.sort_by_key(|p| p.updated_at);
    let price_of: HashMap<(&str, i64), f64> = latest_overrides
        .into_iter()
        .map(|p| ((p.uuid.as_str(), p.asset_id), p.price))
        .collect();
    let resolved_price =
        |row: &AssetRow| price_of.get(&(row.uuid.as_str(), row.id)).copied().unwrap_or(row.price);

    let snapshots: Vec<(DateTime<Utc>, Vec<&AssetRow>)> = batches
        .iter()
        .rev()
        .filter_map(|b| {
            let created_at = b.first()?.created_at;
            Some((created_at, b.iter().filter(|a| a.symbol == symbol).collect()))
        })
        .collect();

    let mut actions = Vec::new();
    for pair in snapshots.windows(2) {
        let (_, prev) = &pair[0];
        let (_, cur) = &pair[1];
        let find_in = |rows: &[&AssetRow], target: &AssetRow| -> Option<f64> {
            rows.iter()
                .find(|r| r.symbol == target.symbol && r.wallet == target.wallet)
                .map(|r| r.amount)
        };

        for c in cur {
            let price = resolved_price(c);
            let amount = match find_in(prev, c) {
                None => c.amount,
                Some(before) => {
                    let delta = c.amount - before;
                    if price != 0.0 && delta.abs() * price <= MATERIALITY_THRESHOLD_USD {
                        continue;
                    }
                    delta
                }
            };
            actions.push(AssetAction {
                asset_id: c.id,
                uuid: c.uuid.clone(),
                changed_at: c.created_at,
                symbol: c.symbol.clone(),
                amount,
                price,
                wallet: c.wallet.clone(),
            });
        }

        for p in prev {
            if find_in(cur, p).is_none() {
                actions.push(AssetAction {
                    asset_id: p.id,
                    uuid: p.uuid.clone(),
                    changed_at: p.created_at,
                    symbol: p.symbol.clone(),
                    amount: -p.amount,
                    price: resolved_price(p),
                    wallet: p.wallet.clone(),
                });
            }
        }
    }
    actions
}

pub fn historical_data(batches: &[Vec<AssetRow>], gather: bool) -> Vec<HistoricalData> {
    batches
        .iter()
        .filter_map(|b| {
            let assets = if gather { collapse(b) } else { b.clone() };
            let first = assets.first()?;
            Some(HistoricalData {
                id: first.uuid.clone(),
                created_at: first.created_at,
                total: batch_value(&assets),
                assets,
            })
        })
        .collect()
}

fn values_by_wallet(batch: &[AssetRow]) -> HashMap<&str, f64> {
    let mut values: HashMap<&str, f64> = HashMap::new();
    for row in batch {
        *values.entry(row.wallet.as_str()).or_default() += row.value;
    }
    values
}

/// Value change per wallet between the two newest batches.
///
/// Wallets present in either batch are reported, richest current wallet
/// first. A wallet with nothing before and something now reads as +100%.
/// Type and alias come from `infos`; unknown wallets carry neither.
pub fn wallet_assets_change(
    batches: &[Vec<AssetRow>],
    infos: &HashMap<String, WalletInfo>,
) -> Vec<WalletAssetsChange> {
    let mut present = batches.iter().filter(|b| !b.is_empty());
    let Some(latest) = present.next() else {
        return Vec::new();
    };
    let current = values_by_wallet(latest);
    let previous = present.next().map(|b| values_by_wallet(b)).unwrap_or_default();

    let mut wallets: Vec<&str> = current.keys().chain(previous.keys()).copied().collect();
    wallets.sort_unstable();
    wallets.dedup();
    wallets.sort_by(|a, b| {
        let va = current.get(a).copied().unwrap_or_default();
        let vb = current.get(b).copied().unwrap_or_default();
        vb.total_cmp(&va)
    });

    wallets
        .into_iter()
        .map(|wallet| {
            let cur = current.get(wallet).copied().unwrap_or_default();
            let prev = previous.get(wallet).copied().unwrap_or_default();
            let change_percentage = if prev != 0.0 {
                (cur - prev) / prev * 100.0
            } else if cur > 0.0 {
                100.0
            } else {
                0.0
            };
            let info = infos.get(wallet).cloned().unwrap_or_default();
            WalletAssetsChange {
                wallet: wallet.to_string(),
                wallet_type: info.wallet_type,
                wallet_alias: info.wallet_alias,
                change_value: cur - prev,
                change_percentage,
            }
        })
        .collect()
}

/// Per-symbol holdings of one batch.
pub fn coin_data(rows: &[AssetRow]) -> Vec<Asset> {
    collapse(rows)
        .into_iter()
        .map(|m| Asset {
            symbol: m.symbol,
            amount: m.amount,
            value: m.value,
            price: m.price,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn row(id: i64, day: i64, symbol: &str, wallet: &str, amount: f64, price: f64) -> AssetRow {
        AssetRow {
            id,
            uuid: format!("batch-{}", day),
            created_at: at(day),
            symbol: symbol.to_string(),
            wallet: wallet.to_string(),
            amount,
            price,
            value: amount * price,
        }
    }

    fn valued(day: i64, symbol: &str, value: f64) -> AssetRow {
        AssetRow {
            value,
            ..row(0, day, symbol, "w", 1.0, value)
        }
    }

    // store order: newest first
    fn newest_first(mut chronological: Vec<Vec<AssetRow>>) -> Vec<Vec<AssetRow>> {
        chronological.reverse();
        chronological
    }

    #[test]
    fn collapse_sums_wallets_and_keeps_first_price() {
        let rows = vec![
            row(1, 0, "BTC", "w1", 1.0, 100.0),
            row(2, 0, "ETH", "w1", 2.0, 10.0),
            row(3, 0, "BTC", "w2", 0.5, 90.0),
        ];
        let collapsed = collapse(&rows);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].symbol, "BTC");
        assert_eq!(collapsed[0].amount, 1.5);
        assert_eq!(collapsed[0].value, 145.0);
        assert_eq!(collapsed[0].price, 100.0);
        assert_eq!(collapse(&collapsed), collapsed);
    }

    #[test]
    fn total_value_of_single_snapshot() {
        let batches = vec![vec![valued(0, "BTC", 100.0), valued(0, "ETH", 50.0)]];
        let total = total_value(&batches);
        assert_eq!(total.total_value, 150.0);
        assert_eq!(total.prev_total_value, 0.0);

        let two = newest_first(vec![vec![valued(0, "BTC", 80.0)], batches[0].clone()]);
        assert_eq!(total_value(&two).prev_total_value, 80.0);
        assert_eq!(total_value(&[]).total_value, 0.0);
    }

    #[test]
    fn pnl_loads_at_least_35_batches() {
        assert_eq!(pnl_query_size(10), 35);
        assert_eq!(pnl_query_size(0), 35);
        assert_eq!(pnl_query_size(50), 51);
    }

    #[test]
    fn pnl_windows_and_trimmed_series() {
        let history: Vec<Vec<AssetRow>> = (0..40)
            .map(|d| vec![valued(d, "BTC", 100.0 + d as f64)])
            .collect();
        let data = pnl(&newest_first(history), 10);

        assert_eq!(data.data.len(), 11);
        assert_eq!(data.data.last().unwrap().total_value, 139.0);
        assert_eq!(data.data[0].total_value, 129.0);
        assert_eq!(data.today_pnl.as_ref().unwrap().value, 1.0);
        assert_eq!(data.seven_day_pnl.as_ref().unwrap().value, 8.0);
        let thirty = data.thirty_day_pnl.unwrap();
        assert_eq!(thirty.value, 31.0);
        assert_eq!(thirty.timestamp, at(8).timestamp_millis());
    }

    #[test]
    fn pnl_omits_windows_without_history() {
        let history = vec![vec![valued(0, "BTC", 10.0)], vec![valued(1, "BTC", 15.0)]];
        let data = pnl(&newest_first(history), 10);
        assert_eq!(data.data.len(), 2);
        assert_eq!(data.today_pnl.unwrap().value, 5.0);
        assert!(data.seven_day_pnl.is_none());
        assert!(data.thirty_day_pnl.is_none());
    }

    #[test]
    fn rank_beyond_ten_is_absent() {
        // day 0: C00 is the largest of twelve; day 1: C00 drops to last place
        let day0: Vec<AssetRow> = (0..12)
            .map(|i| valued(0, &format!("C{:02}", i), 1000.0 - i as f64))
            .collect();
        let day1: Vec<AssetRow> = (0..12)
            .map(|i| valued(1, &format!("C{:02}", i), if i == 0 { 1.0 } else { 1000.0 - i as f64 }))
            .collect();
        let data = top_coins_rank(&newest_first(vec![day0, day1]));

        assert_eq!(data.timestamps, vec![at(0).timestamp_millis(), at(1).timestamp_millis()]);
        let c00 = data.coins.iter().find(|c| c.coin == "C00").unwrap();
        assert_eq!(c00.rank_data[0].rank, Some(1));
        assert_eq!(c00.rank_data[1].rank, None);
        // C10 enters the top ten on day 1 once C00 falls out
        let c10 = data.coins.iter().find(|c| c.coin == "C10").unwrap();
        assert_eq!(c10.rank_data[0].rank, None);
        assert_eq!(c10.rank_data[1].rank, Some(10));
        assert!(data.coins.iter().all(|c| c.coin != "C11"));
    }

    #[test]
    fn rank_series_skips_days_a_coin_was_absent() {
        let history = vec![
            vec![valued(0, "BTC", 10.0)],
            vec![valued(1, "BTC", 10.0), valued(1, "ETH", 20.0)],
        ];
        let data = top_coins_rank(&newest_first(history));
        let eth = data.coins.iter().find(|c| c.coin == "ETH").unwrap();
        assert_eq!(eth.rank_data.len(), 1);
        assert_eq!(eth.rank_data[0].rank, Some(1));
        let btc = data.coins.iter().find(|c| c.coin == "BTC").unwrap();
        assert_eq!(btc.rank_data[1].rank, Some(2));
    }

    #[test]
    fn percentage_change_relative_to_first_appearance() {
        let history = vec![
            vec![row(1, 0, "BTC", "w", 1.0, 100.0), row(2, 0, "DOT", "w", 0.0, 5.0)],
            vec![row(3, 1, "BTC", "w", 1.5, 120.0), row(4, 1, "DOT", "w", 1.0, 5.0)],
        ];
        let data = top_coins_percentage_change(&newest_first(history));
        let btc = data.coins.iter().find(|c| c.coin == "BTC").unwrap();
        assert_eq!(btc.percentage_data[0].value, Some(0.0));
        assert_eq!(btc.percentage_data[1].value, Some(80.0));
        assert_eq!(btc.percentage_data[1].price, Some(20.0));

        let dot = data.coins.iter().find(|c| c.coin == "DOT").unwrap();
        assert_eq!(dot.percentage_data[1].value, None);
        assert_eq!(dot.percentage_data[1].price, Some(0.0));
    }

    #[test]
    fn latest_percentage_sorted_and_zero_safe() {
        let batches = vec![vec![valued(0, "ETH", 25.0), valued(0, "BTC", 75.0)]];
        let res = latest_assets_percentage(&batches);
        assert_eq!(res[0].coin, "BTC");
        assert!((res[0].percentage - 75.0).abs() < 1e-9);
        assert_ne!(res[0].chart_color, res[1].chart_color);

        let zeros = vec![vec![valued(0, "ETH", 0.0), valued(0, "BTC", 0.0)]];
        let res = latest_assets_percentage(&zeros);
        let sum: f64 = res.iter().map(|r| r.percentage).sum();
        assert!(!sum.is_nan());
        assert!(sum.abs() < 1e-9);
        assert!(latest_assets_percentage(&[]).is_empty());
    }

    #[test]
    fn coins_amount_change_keeps_most_recent_points() {
        let history: Vec<Vec<AssetRow>> = (0..5)
            .map(|d| {
                let mut b = vec![row(d, d, "BTC", "w", d as f64, 10.0)];
                if d == 4 {
                    b.push(row(100, d, "ETH", "w", 3.0, 2.0));
                }
                b
            })
            .collect();
        let series = coins_amount_change(&newest_first(history), 3);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].coin, "BTC");
        assert_eq!(series[0].amounts, vec![2.0, 3.0, 4.0]);
        assert_eq!(series[0].timestamps.len(), 3);
        assert_eq!(series[0].timestamps[2], at(4).timestamp_millis());
        assert_eq!(series[1].values, vec![6.0]);
    }

    #[test]
    fn asset_change_tracks_btc_price() {
        let history = vec![
            vec![row(1, 0, "ETH", "w", 1.0, 10.0)],
            vec![row(2, 1, "BTC", "w", 0.0, 40000.0), row(3, 1, "ETH", "w", 1.0, 12.0)],
        ];
        let data = asset_change(&newest_first(history));
        assert_eq!(data.timestamps.len(), 2);
        assert_eq!(data.data[0].btc_price, None);
        assert_eq!(data.data[1].btc_price, Some(40000.0));
        assert_eq!(data.data[1].usd_value, 12.0);
    }

    #[test]
    fn material_delta_emits_one_action() {
        let history = vec![
            vec![row(1, 0, "BTC", "w1", 1.0, 100.0)],
            vec![row(2, 1, "BTC", "w1", 2.0, 100.0)],
        ];
        let actions = asset_actions(&newest_first(history), "BTC", &[]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].amount, 1.0);
        assert_eq!(actions[0].symbol, "BTC");
        assert_eq!(actions[0].wallet, "w1");
        assert_eq!(actions[0].asset_id, 2);
    }

    #[test]
    fn immaterial_delta_is_ignored_unless_price_is_zero() {
        let history = vec![
            vec![row(1, 0, "BTC", "w1", 1.0, 100.0)],
            vec![row(2, 1, "BTC", "w1", 1.05, 100.0)],
        ];
        assert!(asset_actions(&newest_first(history), "BTC", &[]).is_empty());

        let zero_price = vec![
            vec![row(1, 0, "XYZ", "w1", 1.0, 0.0)],
            vec![row(2, 1, "XYZ", "w1", 1.0, 0.0)],
        ];
        let actions = asset_actions(&newest_first(zero_price), "XYZ", &[]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].amount, 0.0);
    }

    #[test]
    fn entry_and_exit_actions() {
        let history = vec![
            vec![row(1, 0, "BTC", "w1", 1.0, 100.0), row(2, 0, "ETH", "w1", 1.0, 10.0)],
            vec![row(3, 1, "ETH", "w1", 1.0, 10.0)],
            vec![row(4, 2, "BTC", "w2", 0.3, 100.0), row(5, 2, "ETH", "w1", 1.0, 10.0)],
        ];
        let actions = asset_actions(&newest_first(history), "BTC", &[]);
        assert_eq!(actions.len(), 2);

        assert_eq!(actions[0].amount, -1.0);
        assert_eq!(actions[0].asset_id, 1);
        assert_eq!(actions[0].uuid, "batch-0");
        // every field of an exit comes from the row that disappeared
        assert_eq!(actions[0].changed_at, at(0));

        assert_eq!(actions[1].amount, 0.3);
        assert_eq!(actions[1].wallet, "w2");
        assert_eq!(actions[1].changed_at, at(2));
    }

    #[test]
    fn price_override_drives_materiality() {
        let history = vec![
            vec![row(1, 0, "BTC", "w1", 1.0, 100.0)],
            vec![row(2, 1, "BTC", "w1", 1.05, 100.0)],
        ];
        let overrides = vec![AssetPrice {
            id: 1,
            uuid: "batch-1".to_string(),
            asset_id: 2,
            symbol: "BTC".to_string(),
            price: 1000.0,
            asset_created_at: at(1),
            updated_at: at(2),
        }];
        let actions = asset_actions(&newest_first(history), "BTC", &overrides);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].price, 1000.0);
        assert!((actions[0].amount - 0.05).abs() < 1e-9);
    }

    #[test]
    fn historical_data_gathers_by_symbol() {
        let batches = vec![vec![
            row(1, 0, "BTC", "w1", 1.0, 100.0),
            row(2, 0, "BTC", "w2", 1.0, 100.0),
        ]];
        let gathered = historical_data(&batches, true);
        assert_eq!(gathered[0].assets.len(), 1);
        assert_eq!(gathered[0].total, 200.0);
        assert_eq!(gathered[0].id, "batch-0");
        assert_eq!(historical_data(&batches, false)[0].assets.len(), 2);
        assert_eq!(coin_data(&batches[0])[0].amount, 2.0);
    }

    #[test]
    fn wallet_change_between_newest_two_batches() {
        let batches = newest_first(vec![
            vec![
                row(1, 0, "BTC", "cold", 1.0, 100.0),
                row(2, 0, "ETH", "hot", 1.0, 50.0),
            ],
            vec![
                row(3, 1, "BTC", "cold", 1.0, 150.0),
                row(4, 1, "ETH", "cold", 1.0, 50.0),
                row(5, 1, "SOL", "new", 2.0, 5.0),
            ],
        ]);
        let mut infos = HashMap::new();
        infos.insert(
            "cold".to_string(),
            WalletInfo {
                wallet_type: Some("BTC".to_string()),
                wallet_alias: Some("vault".to_string()),
            },
        );

        let changes = wallet_assets_change(&batches, &infos);
        let wallets: Vec<&str> = changes.iter().map(|c| c.wallet.as_str()).collect();
        assert_eq!(wallets, vec!["cold", "new", "hot"]);

        assert_eq!(changes[0].change_value, 100.0);
        assert_eq!(changes[0].change_percentage, 100.0);
        assert_eq!(changes[0].wallet_alias.as_deref(), Some("vault"));
        assert_eq!(changes[0].wallet_type.as_deref(), Some("BTC"));

        assert_eq!(changes[1].change_percentage, 100.0);
        assert_eq!(changes[1].wallet_type, None);

        assert_eq!(changes[2].change_value, -50.0);
        assert_eq!(changes[2].change_percentage, -100.0);
    }

    #[test]
    fn single_batch_compares_against_nothing() {
        let batches = vec![vec![row(1, 0, "BTC", "w1", 0.0, 100.0)], vec![]];
        let changes = wallet_assets_change(&batches, &HashMap::new());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_percentage, 0.0);
        assert!(wallet_assets_change(&[], &HashMap::new()).is_empty());
    }
}
