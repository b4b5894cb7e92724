use crate::api_client::PriceProvider;
use crate::config::{DEFAULT_QUERY_SIZE, GlobalConfig};
use crate::domain::models::{
    Asset, AssetAction, AssetChangeData, AssetPercentage, AssetPrice, AssetPriceFilter,
    AssetRecord, AssetRow, CoinAmountSeries, DataDate, HistoricalData, HistoricalExport,
    NewAssetPrice, PnlData, RefreshSummary, TopCoinsPercentageChangeData, TopCoinsRankData,
    TotalValueData, WalletAssetsChange,
};
use crate::domain::repository::SnapshotRepo;
use crate::error::{AppError, RepoResult};
use crate::sources::AnalyzerFactory;
use crate::usecases::aggregate::Aggregator;
use crate::usecases::charts;
use crate::utils::date::timestamp_to_date;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Keys every imported row must carry.
pub const IMPORT_REQUIRED_KEYS: [&str; 7] =
    ["uuid", "createdAt", "symbol", "wallet", "amount", "price", "value"];

pub struct HistoryService {
    pub repo: Arc<dyn SnapshotRepo>,
    pub aggregator: Aggregator,
    pub analyzers: Arc<dyn AnalyzerFactory>,
}

impl HistoryService {
    pub fn new(
        repo: Arc<dyn SnapshotRepo>,
        price_provider: Arc<dyn PriceProvider>,
        analyzers: Arc<dyn AnalyzerFactory>,
    ) -> Self {
        Self {
            repo,
            aggregator: Aggregator::new(price_provider),
            analyzers,
        }
    }

    async fn require_configuration(&self) -> RepoResult<GlobalConfig> {
        self.repo
            .get_configuration()
            .await?
            .ok_or(AppError::ConfigurationMissing)
    }

    /// Requested window, or the configured `querySize` when none is given.
    pub async fn resolve_size(&self, size: Option<usize>) -> RepoResult<usize> {
        if let Some(size) = size {
            return Ok(size);
        }
        Ok(self
            .repo
            .get_configuration()
            .await?
            .map(|c| c.configs.query_size)
            .unwrap_or(DEFAULT_QUERY_SIZE))
    }

    /// Aggregate every source and persist the result as one new snapshot.
    pub async fn refresh_all_data(&self) -> RepoResult<RefreshSummary> {
        let config = self.require_configuration().await?;
        let analyzers = self.analyzers.build(&config);
        let coins = self.aggregator.query_coins_data(&config, &analyzers).await?;

        let uuid = uuid::Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let records: Vec<AssetRecord> = coins
            .into_iter()
            .map(|c| AssetRecord::from_coin(&uuid, created_at, c))
            .collect();
        self.repo.save_assets(&records).await?;

        let total_value = records.iter().map(|r| r.value).sum();
        info!(uuid = %uuid, rows = records.len(), total_value, "Saved snapshot");
        Ok(RefreshSummary {
            uuid,
            created_at,
            rows: records.len(),
            total_value,
        })
    }

    pub async fn query_total_value(&self) -> RepoResult<TotalValueData> {
        let batches = self.repo.query_assets(2, None).await?;
        Ok(charts::total_value(&batches))
    }

    pub async fn query_pnl(&self, size: usize) -> RepoResult<PnlData> {
        let batches = self
            .repo
            .query_assets(charts::pnl_query_size(size) as i64, None)
            .await?;
        Ok(charts::pnl(&batches, size))
    }

    pub async fn query_top_coins_rank(&self, size: usize) -> RepoResult<TopCoinsRankData> {
        let batches = self.repo.query_assets(size as i64, None).await?;
        Ok(charts::top_coins_rank(&batches))
    }

    pub async fn query_top_coins_percentage_change(
        &self,
        size: usize,
    ) -> RepoResult<TopCoinsPercentageChangeData> {
        let batches = self.repo.query_assets(size as i64, None).await?;
        Ok(charts::top_coins_percentage_change(&batches))
    }

    pub async fn query_latest_assets_percentage(&self) -> RepoResult<Vec<AssetPercentage>> {
        let batches = self.repo.query_assets(1, None).await?;
        Ok(charts::latest_assets_percentage(&batches))
    }

    pub async fn query_coins_amount_change(&self, size: usize) -> RepoResult<Vec<CoinAmountSeries>> {
        let batches = self.repo.query_assets(size as i64, None).await?;
        Ok(charts::coins_amount_change(&batches, size))
    }

    pub async fn query_asset_change(&self, size: usize) -> RepoResult<AssetChangeData> {
        let batches = self.repo.query_assets(size as i64, None).await?;
        Ok(charts::asset_change(&batches))
    }

    /// Every buy/sell event of `symbol` across the whole history.
    pub async fn load_all_asset_actions_by_symbol(&self, symbol: &str) -> RepoResult<Vec<AssetAction>> {
        let batches = self.repo.query_assets(-1, None).await?;
        let overrides = self
            .repo
            .query_asset_prices(&AssetPriceFilter {
                symbol: Some(symbol.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(charts::asset_actions(&batches, symbol, &overrides))
    }

    /// Per-wallet change between the two newest snapshots, labelled from the
    /// stored configuration when there is one.
    pub async fn query_wallet_assets_change(&self) -> RepoResult<Vec<WalletAssetsChange>> {
        let batches = self.repo.query_assets(2, None).await?;
        let infos = self
            .repo
            .get_configuration()
            .await?
            .map(|c| c.wallet_infos())
            .unwrap_or_default();
        Ok(charts::wallet_assets_change(&batches, &infos))
    }

    pub async fn query_assets_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<AssetRow>> {
        self.repo.query_assets_by_ids(ids).await
    }

    /// Rows created at or after `after`, oldest first; every row when `None`.
    pub async fn query_assets_after_created_at(
        &self,
        after: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<AssetRow>> {
        self.repo.query_assets_after_created_at(after).await
    }

    pub async fn query_asset_prices(&self, filter: &AssetPriceFilter) -> RepoResult<Vec<AssetPrice>> {
        self.repo.query_asset_prices(filter).await
    }

    pub async fn update_asset_price(&self, price: &NewAssetPrice) -> RepoResult<()> {
        self.repo.upsert_asset_price(price).await?;
        info!(uuid = %price.uuid, asset_id = price.asset_id, price = price.price, "Updated asset price");
        Ok(())
    }

    pub async fn delete_historical_data_by_uuid(&self, uuid: &str) -> RepoResult<u64> {
        let deleted = self.repo.delete_batch(uuid).await?;
        info!(uuid = %uuid, rows = deleted, "Deleted snapshot");
        Ok(deleted)
    }

    pub async fn delete_historical_data_detail_by_id(&self, id: i64) -> RepoResult<u64> {
        let deleted = self.repo.delete_row(id).await?;
        info!(id, rows = deleted, "Deleted snapshot row");
        Ok(deleted)
    }

    pub async fn query_coin_data_by_id(&self, uuid: &str) -> RepoResult<Vec<Asset>> {
        let rows = self.repo.query_assets_by_uuid(uuid).await?;
        Ok(charts::coin_data(&rows))
    }

    /// Holding of `symbol` in the newest snapshot, summed across wallets.
    pub async fn query_last_assets_by_symbol(&self, symbol: &str) -> RepoResult<Option<Asset>> {
        let batches = self.repo.query_assets(1, Some(symbol)).await?;
        Ok(batches
            .first()
            .and_then(|b| charts::coin_data(b).into_iter().next()))
    }

    pub async fn query_last_refresh_at(&self) -> RepoResult<Option<String>> {
        let batches = self.repo.query_assets(1, None).await?;
        Ok(batches
            .first()
            .and_then(|b| b.first())
            .map(|row| timestamp_to_date(&row.created_at, true)))
    }

    pub async fn query_all_data_dates(&self) -> RepoResult<Vec<DataDate>> {
        let batches = self.repo.query_assets(-1, None).await?;
        Ok(batches
            .iter()
            .filter_map(|b| b.first())
            .map(|row| DataDate {
                id: row.uuid.clone(),
                date: timestamp_to_date(&row.created_at, false),
            })
            .collect())
    }

    /// `size <= 0` lists every snapshot.
    pub async fn query_historical_data(&self, size: i64, gather: bool) -> RepoResult<Vec<HistoricalData>> {
        let batches = self.repo.query_assets(size, None).await?;
        Ok(charts::historical_data(&batches, gather))
    }

    pub async fn export_historical_data(&self) -> RepoResult<HistoricalExport> {
        let rows = self.repo.query_assets_after_created_at(None).await?;
        Ok(HistoricalExport {
            historical_data: rows.into_iter().map(AssetRecord::from).collect(),
        })
    }

    /// Validate and insert an export document. Nothing is written unless
    /// every row is valid.
    pub async fn import_historical_data(&self, document: &Value) -> RepoResult<usize> {
        let records = parse_import(document)?;
        self.repo.save_assets(&records).await?;
        info!(rows = records.len(), "Imported historical data");
        Ok(records.len())
    }

    pub async fn get_configuration(&self) -> RepoResult<Option<GlobalConfig>> {
        self.repo.get_configuration().await
    }

    /// Store the configuration after checking every source's address syntax.
    pub async fn save_configuration(&self, config: &GlobalConfig) -> RepoResult<()> {
        let mut invalid = Vec::new();
        for analyzer in self.analyzers.build(config) {
            if !analyzer.verify_configs().await {
                invalid.push(analyzer.analyzer_name().to_string());
            }
        }
        if !invalid.is_empty() {
            return Err(AppError::Config(format!(
                "invalid addresses for {}",
                invalid.join(", ")
            )));
        }
        self.repo.save_configuration(config).await
    }

    /// Seed the stored configuration from a JSON file unless one already exists.
    pub async fn seed_configuration(&self, path: impl AsRef<Path>) -> RepoResult<bool> {
        if self.repo.get_configuration().await?.is_some() {
            return Ok(false);
        }
        let config = GlobalConfig::from_path(path.as_ref())?;
        self.save_configuration(&config).await?;
        info!(path = %path.as_ref().display(), "Seeded portfolio configuration");
        Ok(true)
    }
}

pub fn parse_import(document: &Value) -> RepoResult<Vec<AssetRecord>> {
    let rows = match document.get("historicalData").and_then(Value::as_array) {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Err(AppError::ImportEmpty),
    };
    for row in rows {
        if let Some(key) = IMPORT_REQUIRED_KEYS.iter().find(|k| row.get(**k).is_none()) {
            warn!(key = %key, "Import row is missing a required key");
            return Err(AppError::ImportMissingKey(key.to_string()));
        }
    }
    rows.iter()
        .map(|row| serde_json::from_value::<AssetRecord>(row.clone()).map_err(AppError::from))
        .collect()
}
