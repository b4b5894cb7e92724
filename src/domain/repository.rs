use crate::config::GlobalConfig;
use crate::domain::models::{AssetPrice, AssetPriceFilter, AssetRecord, AssetRow, NewAssetPrice};
use crate::error::RepoResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SnapshotRepo: Send + Sync {
    // Insert all rows in one transaction; either every row lands or none.
    async fn save_assets(&self, rows: &[AssetRecord]) -> RepoResult<()>;

    // Newest `size` batches grouped by createdAt, newest first. `size <= 0` is unbounded.
    async fn query_assets(&self, size: i64, symbol: Option<&str>) -> RepoResult<Vec<Vec<AssetRow>>>;
    // Errors with BatchNotFound when the uuid has no rows
    async fn query_assets_by_uuid(&self, uuid: &str) -> RepoResult<Vec<AssetRow>>;
    async fn query_assets_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<AssetRow>>;
    async fn query_assets_after_created_at(
        &self,
        created_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<AssetRow>>;

    // Deletes cascade to the price overrides of the removed rows
    async fn delete_batch(&self, uuid: &str) -> RepoResult<u64>;
    async fn delete_row(&self, id: i64) -> RepoResult<u64>;

    // Price overrides keyed by (uuid, assetID)
    async fn upsert_asset_price(&self, price: &NewAssetPrice) -> RepoResult<()>;
    async fn query_asset_prices(&self, filter: &AssetPriceFilter) -> RepoResult<Vec<AssetPrice>>;

    async fn get_configuration(&self) -> RepoResult<Option<GlobalConfig>>;
    async fn save_configuration(&self, config: &GlobalConfig) -> RepoResult<()>;
}
