use anyhow::{Context, Result, bail};
use portfolio_tracker::csv_history::export_history_csv;
use portfolio_tracker::domain::models::AssetRecord;
use portfolio_tracker::domain::repository::SnapshotRepo;
use portfolio_tracker::infra::sqlite::{SqliteRepo, connect};
use portfolio_tracker::usecases::history_service::parse_import;
use std::env;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: history_transfer <export|export-csv|import> <path>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let db_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/portfolio.db?mode=rwc".to_string());
    let mut args = env::args().skip(1);
    let (Some(command), Some(path)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let repo = SqliteRepo::new(connect(&db_url).await?);
    match command.as_str() {
        "export" => {
            let records = all_records(&repo).await?;
            let doc = serde_json::json!({ "historicalData": records });
            std::fs::write(&path, serde_json::to_string_pretty(&doc)?)
                .with_context(|| format!("writing {}", path))?;
            println!("Exported {} rows from {} to '{}'", records.len(), db_url, path);
        }
        "export-csv" => {
            let records = all_records(&repo).await?;
            export_history_csv(&records, &path)?;
            println!("Exported {} rows from {} to '{}'", records.len(), db_url, path);
        }
        "import" => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            let records = parse_import(&serde_json::from_str(&raw)?)?;
            repo.save_assets(&records).await?;
            println!("Imported {} rows from '{}' into {}", records.len(), path, db_url);
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
    Ok(())
}

async fn all_records(repo: &SqliteRepo) -> Result<Vec<AssetRecord>> {
    let rows = repo.query_assets_after_created_at(None).await?;
    Ok(rows.into_iter().map(AssetRecord::from).collect())
}
