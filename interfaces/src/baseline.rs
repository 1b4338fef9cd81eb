use crate::defs::BoundaryResult;
use crate::defs::ExportArtifact;
use crate::defs::ExportFormat;
use crate::defs::ExportRow;
use crate::defs::ExportWriter;

const HEADER: [&str; 4] = ["Author", "Articles", "Payout Rate", "Total Payout"];

/// Plain CSV payout report. Other formats are left to external writers.
pub struct CsvExportWriter {
    file_stem: String,
}

impl CsvExportWriter {
    pub fn new() -> Self {
        Self {
            file_stem: "payout-report".to_owned(),
        }
    }

    pub fn with_file_stem(file_stem: impl Into<String>) -> Self {
        Self {
            file_stem: file_stem.into(),
        }
    }

    pub fn render(rows: &[ExportRow]) -> String {
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(HEADER.iter().map(|h| escape_field(h)).collect::<Vec<_>>().join(","));
        for row in rows {
            let fields = [
                escape_field(&row.author),
                row.article_count.to_string(),
                row.payout_rate.to_plain_string(),
                row.total_payout.to_plain_string(),
            ];
            lines.push(fields.join(","));
        }
        lines.join("\n")
    }
}

impl Default for CsvExportWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportWriter for CsvExportWriter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn write(&self, rows: &[ExportRow]) -> BoundaryResult<ExportArtifact> {
        Ok(ExportArtifact {
            file_name: format!("{}.{}", self.file_stem, ExportFormat::Csv.extension()),
            mime_type: "text/csv".to_owned(),
            bytes: Self::render(rows).into_bytes(),
        })
    }
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
