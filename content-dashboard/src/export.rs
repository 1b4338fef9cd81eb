use crate::aggregator::AggregationResult;
use crate::types::{DashboardError, ExportArtifact, ExportFormat, ExportRow, ExportWriter, Money, Result};
use interfaces::CsvExportWriter;
use std::collections::HashMap;
use tracing::{debug, info};

/// One row per author in the aggregation, carrying the rate that was in
/// force when the aggregation ran. Rows are owned values; later rate edits
/// do not reach them.
pub fn build_export_rows(aggregation: &AggregationResult) -> Vec<ExportRow> {
    aggregation
        .per_author_count
        .iter()
        .map(|(author, count)| {
            let payout_rate = aggregation.rate_for(author).unwrap_or(Money::ZERO);
            let total_payout = aggregation
                .payout_for(author)
                .unwrap_or_else(|| payout_rate.times(count));
            ExportRow {
                author: author.clone(),
                article_count: count,
                payout_rate,
                total_payout,
            }
        })
        .collect()
}

/// Export writers keyed by the format they produce.
pub struct ExportRegistry {
    writers: HashMap<ExportFormat, Box<dyn ExportWriter + Send + Sync>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self {
            writers: HashMap::new(),
        }
    }

    /// Register a writer, replacing any previous writer for its format.
    pub fn register_writer(&mut self, writer: Box<dyn ExportWriter + Send + Sync>) {
        let format = writer.format();
        info!("Registering export writer for {:?}", format);
        self.writers.insert(format, writer);
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        self.writers.contains_key(&format)
    }

    pub fn export(&self, format: ExportFormat, rows: &[ExportRow]) -> Result<ExportArtifact> {
        let writer = self
            .writers
            .get(&format)
            .ok_or(DashboardError::UnsupportedExport(format))?;

        let artifact = writer.write(rows)?;
        debug!("Exported {} rows to {} ({} bytes)", rows.len(), artifact.file_name, artifact.bytes.len());
        Ok(artifact)
    }
}

impl Default for ExportRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register_writer(Box::new(CsvExportWriter::new()));
        registry
    }
}
