use crate::config::GlobalConfig;
use crate::domain::models::{AssetPrice, AssetPriceFilter, AssetRecord, AssetRow, NewAssetPrice};
use crate::domain::repository::SnapshotRepo;
use crate::error::{AppError, RepoResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::debug;

const ASSET_COLUMNS: &str = "id, uuid, created_at, symbol, wallet, amount, price, value";

/// Open (creating if needed) the database and apply migrations.
pub async fn connect(database_url: &str) -> RepoResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

pub struct SqliteRepo {
    pub pool: SqlitePool,
}

impl SqliteRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// Rows arrive ordered by created_at DESC, so equal timestamps are adjacent.
fn group_by_created_at(rows: Vec<AssetRow>) -> Vec<Vec<AssetRow>> {
    let mut batches: Vec<Vec<AssetRow>> = Vec::new();
    for row in rows {
        match batches.last_mut() {
            Some(batch) if batch[0].created_at == row.created_at => batch.push(row),
            _ => batches.push(vec![row]),
        }
    }
    batches
}

#[async_trait]
impl SnapshotRepo for SqliteRepo {
    async fn save_assets(&self, rows: &[AssetRecord]) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "INSERT INTO assets_v2 (uuid, created_at, symbol, wallet, amount, price, value) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&row.uuid)
            .bind(row.created_at)
            .bind(&row.symbol)
            .bind(&row.wallet)
            .bind(row.amount)
            .bind(row.price)
            .bind(row.value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        debug!(rows = rows.len(), "Saved asset rows");
        Ok(())
    }

    async fn query_assets(&self, size: i64, symbol: Option<&str>) -> RepoResult<Vec<Vec<AssetRow>>> {
        let mut ts_query =
            QueryBuilder::<Sqlite>::new("SELECT DISTINCT created_at FROM assets_v2 ORDER BY created_at DESC");
        if size > 0 {
            ts_query.push(" LIMIT ");
            ts_query.push_bind(size);
        }
        let timestamps = ts_query
            .build_query_scalar::<DateTime<Utc>>()
            .fetch_all(&self.pool)
            .await?;
        let Some(earliest) = timestamps.last() else {
            return Ok(vec![]);
        };

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM assets_v2 WHERE ", ASSET_COLUMNS));
        if let Some(s) = symbol {
            qb.push("symbol = ");
            qb.push_bind(s);
            qb.push(" AND ");
        }
        qb.push("created_at >= ");
        qb.push_bind(*earliest);
        qb.push(" ORDER BY created_at DESC, id ASC");
        let rows = qb.build_query_as::<AssetRow>().fetch_all(&self.pool).await?;
        Ok(group_by_created_at(rows))
    }

    async fn query_assets_by_uuid(&self, uuid: &str) -> RepoResult<Vec<AssetRow>> {
        let rows = sqlx::query_as::<_, AssetRow>(&format!(
            "SELECT {} FROM assets_v2 WHERE uuid = ?1 ORDER BY id ASC",
            ASSET_COLUMNS
        ))
        .bind(uuid)
        .fetch_all(&self.pool)
        .await?;
        if rows.is_empty() {
            return Err(AppError::BatchNotFound(uuid.to_string()));
        }
        Ok(rows)
    }

    async fn query_assets_by_ids(&self, ids: &[i64]) -> RepoResult<Vec<AssetRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM assets_v2 WHERE id IN (", ASSET_COLUMNS));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY id ASC");
        let rows = qb.build_query_as::<AssetRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn query_assets_after_created_at(
        &self,
        created_at: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<AssetRow>> {
        let since = created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let rows = sqlx::query_as::<_, AssetRow>(&format!(
            "SELECT {} FROM assets_v2 WHERE created_at >= ?1 ORDER BY created_at ASC, id ASC",
            ASSET_COLUMNS
        ))
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_batch(&self, uuid: &str) -> RepoResult<u64> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM assets_v2 WHERE uuid = ?1")
            .bind(uuid)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM asset_prices WHERE uuid = ?1")
            .bind(uuid)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(uuid = %uuid, rows = deleted, "Deleted snapshot batch");
        Ok(deleted)
    }

    async fn delete_row(&self, id: i64) -> RepoResult<u64> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM assets_v2 WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM asset_prices WHERE asset_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        debug!(id, rows = deleted, "Deleted asset row");
        Ok(deleted)
    }

    async fn upsert_asset_price(&self, price: &NewAssetPrice) -> RepoResult<()> {
        sqlx::query(
            r#"INSERT INTO asset_prices (uuid, asset_id, symbol, price, asset_created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(uuid, asset_id) DO UPDATE SET
                   symbol = excluded.symbol,
                   price = excluded.price,
                   asset_created_at = excluded.asset_created_at,
                   updated_at = excluded.updated_at
            "#,
        )
        .bind(&price.uuid)
        .bind(price.asset_id)
        .bind(&price.symbol)
        .bind(price.price)
        .bind(price.asset_created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_asset_prices(&self, filter: &AssetPriceFilter) -> RepoResult<Vec<AssetPrice>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, uuid, asset_id, symbol, price, asset_created_at, updated_at FROM asset_prices WHERE 1=1",
        );
        if let Some(symbol) = &filter.symbol {
            qb.push(" AND symbol = ");
            qb.push_bind(symbol.clone());
        }
        if let Some(ts) = filter.asset_created_after {
            qb.push(" AND asset_created_at > ");
            qb.push_bind(ts);
        }
        if let Some(ts) = filter.updated_after {
            qb.push(" AND updated_at > ");
            qb.push_bind(ts);
        }
        qb.push(" ORDER BY id ASC");
        let rows = qb.build_query_as::<AssetPrice>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get_configuration(&self) -> RepoResult<Option<GlobalConfig>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT data FROM configuration WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        raw.map(|r| GlobalConfig::from_json(&r)).transpose()
    }

    async fn save_configuration(&self, config: &GlobalConfig) -> RepoResult<()> {
        let data = serde_json::to_string(config)?;
        sqlx::query(
            r#"INSERT INTO configuration (id, data, updated_at) VALUES (1, ?1, ?2)
               ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at"#,
        )
        .bind(data)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) async fn memory_repo() -> SqliteRepo {
        // one connection: every new in-memory connection is a fresh database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteRepo::new(pool)
    }

    fn record(uuid: &str, day: u32, symbol: &str, wallet: &str, amount: f64, price: f64) -> AssetRecord {
        AssetRecord {
            uuid: uuid.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 8, 0, 0).unwrap(),
            symbol: symbol.to_string(),
            wallet: wallet.to_string(),
            amount,
            price,
            value: amount * price,
        }
    }

    async fn seed(repo: &SqliteRepo) {
        repo.save_assets(&[
            record("a", 1, "BTC", "w1", 1.0, 100.0),
            record("a", 1, "ETH", "w1", 2.0, 10.0),
        ])
        .await
        .unwrap();
        repo.save_assets(&[
            record("b", 2, "BTC", "w1", 1.5, 110.0),
            record("b", 2, "BTC", "w2", 0.5, 110.0),
        ])
        .await
        .unwrap();
        repo.save_assets(&[record("c", 3, "ETH", "w1", 3.0, 12.0)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn query_assets_groups_batches_newest_first() {
        let repo = memory_repo().await;
        seed(&repo).await;

        let batches = repo.query_assets(2, None).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0][0].uuid, "c");
        assert_eq!(batches[1].len(), 2);
        assert_eq!(batches[1][0].wallet, "w1");

        let all = repo.query_assets(-1, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn query_assets_filters_by_symbol_within_window() {
        let repo = memory_repo().await;
        seed(&repo).await;

        let btc = repo.query_assets(0, Some("BTC")).await.unwrap();
        assert_eq!(btc.len(), 2);
        assert!(btc.iter().flatten().all(|r| r.symbol == "BTC"));
    }

    #[tokio::test]
    async fn query_assets_on_empty_store_is_empty() {
        let repo = memory_repo().await;
        assert!(repo.query_assets(10, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_by_uuid_reports_missing_batch() {
        let repo = memory_repo().await;
        seed(&repo).await;
        assert_eq!(repo.query_assets_by_uuid("b").await.unwrap().len(), 2);
        let err = repo.query_assets_by_uuid("zzz").await.unwrap_err();
        assert!(matches!(err, AppError::BatchNotFound(_)));
    }

    #[tokio::test]
    async fn deleting_a_batch_removes_its_price_overrides() {
        let repo = memory_repo().await;
        seed(&repo).await;
        let rows = repo.query_assets_by_uuid("b").await.unwrap();
        repo.upsert_asset_price(&NewAssetPrice {
            uuid: "b".to_string(),
            asset_id: rows[0].id,
            symbol: "BTC".to_string(),
            price: 120.0,
            asset_created_at: rows[0].created_at,
        })
        .await
        .unwrap();

        assert_eq!(repo.delete_batch("b").await.unwrap(), 2);
        let prices = repo.query_asset_prices(&AssetPriceFilter::default()).await.unwrap();
        assert!(prices.is_empty());
        assert_eq!(repo.query_assets(-1, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_row_keeps_the_rest_of_the_batch() {
        let repo = memory_repo().await;
        seed(&repo).await;
        let rows = repo.query_assets_by_uuid("a").await.unwrap();
        repo.upsert_asset_price(&NewAssetPrice {
            uuid: "a".to_string(),
            asset_id: rows[1].id,
            symbol: "ETH".to_string(),
            price: 11.0,
            asset_created_at: rows[1].created_at,
        })
        .await
        .unwrap();

        assert_eq!(repo.delete_row(rows[1].id).await.unwrap(), 1);
        let left = repo.query_assets_by_uuid("a").await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].symbol, "BTC");
        assert!(repo.query_asset_prices(&AssetPriceFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_asset_price_replaces_existing_override() {
        let repo = memory_repo().await;
        seed(&repo).await;
        let row = &repo.query_assets_by_uuid("a").await.unwrap()[0];
        let mut price = NewAssetPrice {
            uuid: row.uuid.clone(),
            asset_id: row.id,
            symbol: row.symbol.clone(),
            price: 90.0,
            asset_created_at: row.created_at,
        };
        repo.upsert_asset_price(&price).await.unwrap();
        price.price = 95.0;
        repo.upsert_asset_price(&price).await.unwrap();

        let filter = AssetPriceFilter {
            symbol: Some("BTC".to_string()),
            ..Default::default()
        };
        let prices = repo.query_asset_prices(&filter).await.unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].price, 95.0);

        let later = AssetPriceFilter {
            asset_created_after: Some(row.created_at),
            ..Default::default()
        };
        assert!(repo.query_asset_prices(&later).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn configuration_round_trips() {
        let repo = memory_repo().await;
        assert!(repo.get_configuration().await.unwrap().is_none());
        let mut cfg = GlobalConfig::default();
        cfg.configs.group_usd = true;
        repo.save_configuration(&cfg).await.unwrap();
        cfg.configs.query_size = 20;
        repo.save_configuration(&cfg).await.unwrap();
        assert_eq!(repo.get_configuration().await.unwrap(), Some(cfg));
    }

    #[tokio::test]
    async fn ids_and_created_at_queries() {
        let repo = memory_repo().await;
        seed(&repo).await;
        let rows = repo.query_assets_by_uuid("b").await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(repo.query_assets_by_ids(&ids).await.unwrap(), rows);
        assert!(repo.query_assets_by_ids(&[]).await.unwrap().is_empty());

        let since = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(repo.query_assets_after_created_at(Some(since)).await.unwrap().len(), 3);
        assert_eq!(repo.query_assets_after_created_at(None).await.unwrap().len(), 5);
    }
}
