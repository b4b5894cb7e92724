use crate::domain::models::AssetRecord;
use crate::error::RepoResult;
use csv::WriterBuilder;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 7] = ["uuid", "createdAt", "symbol", "wallet", "amount", "price", "value"];

/// Write snapshot rows as CSV, one line per row, oldest first as given.
pub fn write_history_csv<W: Write>(records: &[AssetRecord], writer: W) -> RepoResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HEADER)?;
    for r in records {
        let ts = r.created_at.to_rfc3339();
        let (amount, price, value) = (r.amount.to_string(), r.price.to_string(), r.value.to_string());
        wtr.write_record([
            r.uuid.as_str(),
            ts.as_str(),
            r.symbol.as_str(),
            r.wallet.as_str(),
            amount.as_str(),
            price.as_str(),
            value.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_history_csv(records: &[AssetRecord], path: impl AsRef<Path>) -> RepoResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_history_csv(records, file)
}
