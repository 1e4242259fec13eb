pub mod metrics;
pub mod summary;
pub mod table;

use serde::Serialize;
use sha2::{Digest, Sha256};

use summary::SUMMARY_COLUMNS;
use table::ParsedDataset;

#[derive(Debug, Clone, Serialize)]
pub struct SchemaReport {
    pub columns: Vec<String>,
    pub expected: Vec<String>,
    pub missing: Vec<String>,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub warnings: usize,
    pub schema: SchemaReport,
}

/// Compare parsed headers with the summary-table columns. Extra columns are
/// allowed; order does not matter.
pub fn validate_summary_schema(headers: &[String]) -> SchemaReport {
    let expected: Vec<String> = SUMMARY_COLUMNS.iter().map(|s| s.to_string()).collect();
    let missing: Vec<String> = expected
        .iter()
        .filter(|c| !headers.contains(c))
        .cloned()
        .collect();
    let ok = missing.is_empty();
    let message = if ok {
        "schema ok".to_string()
    } else {
        format!("schema mismatch: missing {:?}", missing)
    };
    SchemaReport {
        columns: headers.to_vec(),
        expected,
        missing,
        ok,
        message,
    }
}

pub fn quality_report(ds: &ParsedDataset) -> DataQualityReport {
    DataQualityReport {
        rows: ds.records.len(),
        warnings: ds.warnings.len(),
        schema: validate_summary_schema(&ds.headers),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
