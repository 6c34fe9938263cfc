//! JSON serialization of finished period batches.
//!
//! Each batch is written in one call with create-or-overwrite semantics, so
//! the artifact always reflects exactly the batch as finalized. Articles are
//! pretty-printed and non-ASCII text is written as-is, not escaped.

use crate::models::{ArticleRecord, PeriodToken};
use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Write one period's batch to `{output_dir}/articles_{year}_{month:02}.json`.
///
/// The output directory is created and checked for writability once at
/// startup; this only performs the write.
#[instrument(level = "info", skip(batch), fields(%period, count = batch.len()))]
pub async fn write_period_batch(
    batch: &[ArticleRecord],
    period: &PeriodToken,
    output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(batch)?;
    let path = format!("{}/{}", output_dir.trim_end_matches('/'), period.artifact_name());

    fs::write(&path, json).await?;
    info!(count = batch.len(), %path, "Saved period batch");
    Ok(())
}
