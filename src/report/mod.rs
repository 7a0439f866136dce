//! Batch reports — CSV summary and JSON training dataset.
//!
//! The CSV file name spells out the run parameters, e.g.
//!
//! ```text
//! total_running_time=41.07 platform=linux x86_64 threshold=1500 scan_step=3 mode=parallel workers=8.csv
//! ```
//!
//! so that reports from different parameter sweeps can sit side by side.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::matcher::SearchMode;
use crate::pipeline::Identification;

/// CSV column headers, in order.
pub const CSV_HEADER: [&str; 7] = [
    "Name",
    "Matched",
    "Difference",
    "Max Result Difference",
    "Result Type",
    "Is Correct",
    "Identify Time",
];

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// RunDetails
// ---------------------------------------------------------------------------

/// Parameters of one batch run, recorded in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDetails {
    pub total_running_time: Duration,
    pub platform: String,
    pub threshold: Option<f64>,
    pub scan_step: usize,
    pub mode: SearchMode,
    pub workers: usize,
}

impl RunDetails {
    /// Details for this host.
    pub fn new(
        total_running_time: Duration,
        threshold: Option<f64>,
        scan_step: usize,
        mode: SearchMode,
        workers: usize,
    ) -> Self {
        Self {
            total_running_time,
            platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            threshold,
            scan_step,
            mode,
            workers,
        }
    }

    /// `key=value` pairs joined by spaces.
    pub fn summary(&self) -> String {
        let threshold = self
            .threshold
            .map_or_else(|| "None".to_string(), |t| t.to_string());
        format!(
            "total_running_time={:.2} platform={} threshold={} scan_step={} mode={} workers={}",
            self.total_running_time.as_secs_f64(),
            self.platform,
            threshold,
            self.scan_step,
            self.mode,
            self.workers
        )
    }
}

/// CSV file name derived from the run details.
pub fn report_file_name(details: &RunDetails) -> String {
    let name: String = details
        .summary()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("{name}.csv")
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Write the CSV report to any writer.  The header carries one extra column
/// holding [`RunDetails::summary`].  Unclassified entries are skipped.
pub fn write_csv<W: io::Write>(
    writer: W,
    identifications: &[Identification],
    details: &RunDetails,
) -> Result<(), ReportError> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let summary = details.summary();
    let mut header: Vec<&str> = CSV_HEADER.to_vec();
    header.push(&summary);
    csv.write_record(&header)?;

    for id in identifications {
        let Ok(c) = &id.classification else {
            continue;
        };
        csv.write_record([
            id.file_name(),
            c.best_match.clone(),
            c.best_value.to_string(),
            c.mrd.to_string(),
            c.category.clone(),
            id.is_correct().to_string(),
            format!("{:.5}", id.elapsed.as_secs_f64()),
        ])?;
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write the CSV report into `dir` under [`report_file_name`]; returns the
/// path written.
pub fn save_csv(
    dir: &Path,
    identifications: &[Identification],
    details: &RunDetails,
) -> Result<PathBuf, ReportError> {
    let path = dir.join(report_file_name(details));
    let file = std::fs::File::create(&path).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    write_csv(io::BufWriter::new(file), identifications, details)?;
    info!("report: results csv written to {}", path.display());
    Ok(path)
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// One reference's distance; `None` when unbounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetDistance {
    pub reference: String,
    pub distance: Option<f64>,
}

/// One training example: the full distance vector and its category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    pub file: String,
    pub distances: Vec<DatasetDistance>,
    pub category: String,
}

/// Training records for every classified identification.
pub fn dataset_records(identifications: &[Identification]) -> Vec<DatasetRecord> {
    identifications
        .iter()
        .filter_map(|id| {
            let c = id.classification.as_ref().ok()?;
            Some(DatasetRecord {
                file: id.file_name(),
                distances: id
                    .distances
                    .iter()
                    .map(|(name, d)| DatasetDistance {
                        reference: name.to_string(),
                        distance: d.finite(),
                    })
                    .collect(),
                category: c.category.clone(),
            })
        })
        .collect()
}

/// Write the dataset as pretty JSON to `path`.
pub fn write_dataset(path: &Path, identifications: &[Identification]) -> Result<(), ReportError> {
    let records = dataset_records(identifications);
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "report: dataset of {} records written to {}",
        records.len(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
