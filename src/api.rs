use crate::config::GlobalConfig;
use crate::domain::models::{
    Asset, AssetAction, AssetChangeData, AssetPercentage, AssetPrice, AssetPriceFilter, AssetRow,
    CoinAmountSeries, DataDate, HistoricalData, HistoricalExport, NewAssetPrice, PnlData,
    RefreshSummary, TopCoinsPercentageChangeData, TopCoinsRankData, TotalValueData,
    WalletAssetsChange,
};
use crate::error::{AppError, RepoResult};
use crate::usecases::history_service::HistoryService;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HistoryService>,
}

#[derive(Debug, Deserialize)]
pub struct SizeQuery {
    pub size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    pub size: Option<i64>,
    #[serde(default = "default_gather")]
    pub gather: bool,
}

fn default_gather() -> bool {
    true
}

/// `ids` is a comma separated list; without it, rows from `createdAfter` on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsQuery {
    pub ids: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPricesQuery {
    pub symbol: Option<String>,
    pub asset_created_after: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
}

type ApiResult<T> = Result<Json<T>, AppError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/refresh", post(refresh))
        .route("/api/total-value", get(total_value))
        .route("/api/pnl", get(pnl))
        .route("/api/top-coins-rank", get(top_coins_rank))
        .route("/api/top-coins-percentage-change", get(top_coins_percentage_change))
        .route("/api/latest-assets-percentage", get(latest_assets_percentage))
        .route("/api/coins-amount-change", get(coins_amount_change))
        .route("/api/asset-change", get(asset_change))
        .route("/api/wallet-assets-change", get(wallet_assets_change))
        .route("/api/asset-actions/{symbol}", get(asset_actions))
        .route("/api/historical-data", get(historical_data))
        .route("/api/historical-data/{uuid}", delete(delete_historical_data))
        .route("/api/historical-data/detail/{id}", delete(delete_historical_row))
        .route("/api/coin-data/{uuid}", get(coin_data))
        .route("/api/data-dates", get(data_dates))
        .route("/api/last-refresh-at", get(last_refresh_at))
        .route("/api/assets", get(assets))
        .route("/api/asset-prices", get(asset_prices).put(update_asset_price))
        .route("/api/configuration", get(get_configuration).put(save_configuration))
        .route("/api/export", get(export_data))
        .route("/api/import", post(import_data))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

async fn size_or_default(state: &AppState, q: &SizeQuery) -> RepoResult<usize> {
    state.service.resolve_size(q.size).await
}

async fn refresh(State(state): State<AppState>) -> ApiResult<RefreshSummary> {
    Ok(Json(state.service.refresh_all_data().await?))
}

async fn total_value(State(state): State<AppState>) -> ApiResult<TotalValueData> {
    Ok(Json(state.service.query_total_value().await?))
}

async fn pnl(State(state): State<AppState>, Query(q): Query<SizeQuery>) -> ApiResult<PnlData> {
    let size = size_or_default(&state, &q).await?;
    Ok(Json(state.service.query_pnl(size).await?))
}

async fn top_coins_rank(
    State(state): State<AppState>,
    Query(q): Query<SizeQuery>,
) -> ApiResult<TopCoinsRankData> {
    let size = size_or_default(&state, &q).await?;
    Ok(Json(state.service.query_top_coins_rank(size).await?))
}

async fn top_coins_percentage_change(
    State(state): State<AppState>,
    Query(q): Query<SizeQuery>,
) -> ApiResult<TopCoinsPercentageChangeData> {
    let size = size_or_default(&state, &q).await?;
    Ok(Json(state.service.query_top_coins_percentage_change(size).await?))
}

async fn latest_assets_percentage(State(state): State<AppState>) -> ApiResult<Vec<AssetPercentage>> {
    Ok(Json(state.service.query_latest_assets_percentage().await?))
}

async fn coins_amount_change(
    State(state): State<AppState>,
    Query(q): Query<SizeQuery>,
) -> ApiResult<Vec<CoinAmountSeries>> {
    let size = size_or_default(&state, &q).await?;
    Ok(Json(state.service.query_coins_amount_change(size).await?))
}

async fn asset_change(
    State(state): State<AppState>,
    Query(q): Query<SizeQuery>,
) -> ApiResult<AssetChangeData> {
    let size = size_or_default(&state, &q).await?;
    Ok(Json(state.service.query_asset_change(size).await?))
}

async fn wallet_assets_change(State(state): State<AppState>) -> ApiResult<Vec<WalletAssetsChange>> {
    Ok(Json(state.service.query_wallet_assets_change().await?))
}

async fn asset_actions(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<Vec<AssetAction>> {
    Ok(Json(state.service.load_all_asset_actions_by_symbol(&symbol).await?))
}

async fn historical_data(
    State(state): State<AppState>,
    Query(q): Query<HistoricalQuery>,
) -> ApiResult<Vec<HistoricalData>> {
    let size = match q.size {
        Some(size) => size,
        None => state.service.resolve_size(None).await? as i64,
    };
    Ok(Json(state.service.query_historical_data(size, q.gather).await?))
}

async fn delete_historical_data(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> ApiResult<Value> {
    let deleted = state.service.delete_historical_data_by_uuid(&uuid).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn delete_historical_row(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let deleted = state.service.delete_historical_data_detail_by_id(id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn coin_data(State(state): State<AppState>, Path(uuid): Path<String>) -> ApiResult<Vec<Asset>> {
    Ok(Json(state.service.query_coin_data_by_id(&uuid).await?))
}

async fn data_dates(State(state): State<AppState>) -> ApiResult<Vec<DataDate>> {
    Ok(Json(state.service.query_all_data_dates().await?))
}

async fn last_refresh_at(State(state): State<AppState>) -> ApiResult<Value> {
    let last = state.service.query_last_refresh_at().await?;
    Ok(Json(json!({ "lastRefreshAt": last })))
}

fn parse_ids(raw: &str) -> RepoResult<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AppError::InvalidParameter(format!("ids: `{}` is not an integer", s)))
        })
        .collect()
}

async fn assets(State(state): State<AppState>, Query(q): Query<AssetsQuery>) -> ApiResult<Vec<AssetRow>> {
    let rows = match q.ids {
        Some(raw) => state.service.query_assets_by_ids(&parse_ids(&raw)?).await?,
        None => state.service.query_assets_after_created_at(q.created_after).await?,
    };
    Ok(Json(rows))
}

async fn asset_prices(
    State(state): State<AppState>,
    Query(q): Query<AssetPricesQuery>,
) -> ApiResult<Vec<AssetPrice>> {
    let filter = AssetPriceFilter {
        symbol: q.symbol,
        asset_created_after: q.asset_created_after,
        updated_after: q.updated_after,
    };
    Ok(Json(state.service.query_asset_prices(&filter).await?))
}

async fn update_asset_price(
    State(state): State<AppState>,
    Json(price): Json<NewAssetPrice>,
) -> ApiResult<Value> {
    state.service.update_asset_price(&price).await?;
    Ok(Json(json!({ "updated": true })))
}

async fn get_configuration(State(state): State<AppState>) -> ApiResult<GlobalConfig> {
    let config = state.service.get_configuration().await?;
    Ok(Json(config.ok_or(AppError::ConfigurationMissing)?))
}

async fn save_configuration(
    State(state): State<AppState>,
    Json(config): Json<GlobalConfig>,
) -> ApiResult<GlobalConfig> {
    state.service.save_configuration(&config).await?;
    Ok(Json(config))
}

async fn export_data(State(state): State<AppState>) -> ApiResult<HistoricalExport> {
    Ok(Json(state.service.export_historical_data().await?))
}

async fn import_data(State(state): State<AppState>, Json(document): Json<Value>) -> ApiResult<Value> {
    let imported = state.service.import_historical_data(&document).await?;
    Ok(Json(json!({ "imported": imported })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_and_reject_garbage() {
        assert_eq!(parse_ids("3, 1,,7").unwrap(), vec![3, 1, 7]);
        assert!(parse_ids("").unwrap().is_empty());
        let err = parse_ids("1,x").unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }
}
