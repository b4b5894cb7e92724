use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Balance reported by a source adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletCoin {
    pub symbol: String,
    pub amount: f64,
    pub wallet: String,
    // USD price when the source already knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl WalletCoin {
    pub fn new(symbol: impl Into<String>, amount: f64, wallet: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            amount,
            wallet: wallet.into(),
            price: None,
        }
    }
}

// Valued holding produced by the aggregator, not yet stamped with a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinValue {
    pub symbol: String,
    pub wallet: String,
    pub amount: f64,
    pub price: f64,
    pub value: f64,
}

// Persisted snapshot row (assets_v2)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssetRow {
    pub id: i64,
    pub uuid: String,
    pub created_at: DateTime<Utc>,
    pub symbol: String,
    pub wallet: String,
    pub amount: f64,
    pub price: f64,
    pub value: f64,
}

/// Row to insert; also the export/import shape (an `AssetRow` without `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub uuid: String,
    pub created_at: DateTime<Utc>,
    pub symbol: String,
    pub wallet: String,
    pub amount: f64,
    pub price: f64,
    pub value: f64,
}

impl AssetRecord {
    pub fn from_coin(uuid: &str, created_at: DateTime<Utc>, coin: CoinValue) -> Self {
        Self {
            uuid: uuid.to_string(),
            created_at,
            symbol: coin.symbol,
            wallet: coin.wallet,
            amount: coin.amount,
            price: coin.price,
            value: coin.value,
        }
    }
}

impl From<AssetRow> for AssetRecord {
    fn from(row: AssetRow) -> Self {
        Self {
            uuid: row.uuid,
            created_at: row.created_at,
            symbol: row.symbol,
            wallet: row.wallet,
            amount: row.amount,
            price: row.price,
            value: row.value,
        }
    }
}

// Corrected price for one asset row (asset_prices)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssetPrice {
    pub id: i64,
    pub uuid: String,
    #[serde(rename = "assetID")]
    pub asset_id: i64,
    pub symbol: String,
    pub price: f64,
    pub asset_created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssetPrice {
    pub uuid: String,
    #[serde(rename = "assetID")]
    pub asset_id: i64,
    pub symbol: String,
    pub price: f64,
    pub asset_created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AssetPriceFilter {
    pub symbol: Option<String>,
    pub asset_created_after: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
}

/// Holding change of one (symbol, wallet) between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAction {
    #[serde(rename = "assetID")]
    pub asset_id: i64,
    pub uuid: String,
    pub changed_at: DateTime<Utc>,
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
    pub wallet: String,
}

// Read models for the chart endpoints

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub amount: f64,
    pub value: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalValueData {
    pub total_value: f64,
    pub prev_total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalValuePoint {
    pub total_value: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    pub value: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlData {
    pub data: Vec<TotalValuePoint>,
    pub today_pnl: Option<PnlPoint>,
    pub seven_day_pnl: Option<PnlPoint>,
    pub thirty_day_pnl: Option<PnlPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankPoint {
    pub timestamp: i64,
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinRankSeries {
    pub coin: String,
    pub line_color: String,
    pub rank_data: Vec<RankPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCoinsRankData {
    pub timestamps: Vec<i64>,
    pub coins: Vec<CoinRankSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentagePoint {
    pub timestamp: i64,
    // None when the first value in the window is zero
    pub value: Option<f64>,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinPercentageSeries {
    pub coin: String,
    pub line_color: String,
    pub percentage_data: Vec<PercentagePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCoinsPercentageChangeData {
    pub timestamps: Vec<i64>,
    pub coins: Vec<CoinPercentageSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPercentage {
    pub coin: String,
    pub amount: f64,
    pub value: f64,
    pub percentage: f64,
    pub chart_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinAmountSeries {
    pub coin: String,
    pub line_color: String,
    pub amounts: Vec<f64>,
    pub values: Vec<f64>,
    pub timestamps: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetChangePoint {
    pub usd_value: f64,
    pub btc_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetChangeData {
    pub timestamps: Vec<i64>,
    pub data: Vec<AssetChangePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalData {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub assets: Vec<AssetRow>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDate {
    pub id: String,
    pub date: String,
}

/// Export/import document: `{"historicalData": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalExport {
    pub historical_data: Vec<AssetRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSummary {
    pub uuid: String,
    pub created_at: DateTime<Utc>,
    pub rows: usize,
    pub total_value: f64,
}

/// Where a wallet string comes from in the portfolio configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub wallet_type: Option<String>,
    pub wallet_alias: Option<String>,
}

/// Value change of one wallet between the two newest snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAssetsChange {
    pub wallet: String,
    pub wallet_type: Option<String>,
    pub wallet_alias: Option<String>,
    pub change_value: f64,
    pub change_percentage: f64,
}
