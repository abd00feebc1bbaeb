//! Artifact export for compiled symphonies.
//!
//! Each run writes a directory under the output root containing:
//! - `allocations.csv` — date × ticker portfolio weights
//! - `branch_tracker.csv` — date × node-id activation matrix
//! - `summary.json` — start date, tickers, failed-allocation report

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use symphony_core::{Aligned, TimeMatrix};

/// Render a `TimeMatrix` as CSV text with a leading `date` column.
pub fn export_matrix_csv(matrix: &TimeMatrix) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let columns: Vec<String> = matrix.column_names().map(str::to_string).collect();
    let mut header = vec!["date".to_string()];
    header.extend(columns.iter().cloned());
    wtr.write_record(&header)?;

    for (t, date) in matrix.dates().iter().enumerate() {
        let mut record = vec![date.format("%Y-%m-%d").to_string()];
        for name in &columns {
            let value = matrix.column(name).map(|c| c[t]).unwrap_or(f64::NAN);
            record.push(format!("{value:.6}"));
        }
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("CSV writer flush failed")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    name: &'a str,
    start_date: String,
    tickers: Vec<String>,
    dates: usize,
    failed_allocations: Vec<SummaryFailure>,
}

#[derive(Debug, Serialize)]
struct SummaryFailure {
    date: String,
    sum: f64,
    branch_ids: Vec<String>,
}

fn export_summary_json(name: &str, aligned: &Aligned) -> Result<String> {
    let summary = Summary {
        name,
        start_date: aligned.start_date.format("%Y-%m-%d").to_string(),
        tickers: aligned.allocations.column_names().map(str::to_string).collect(),
        dates: aligned.allocations.len(),
        failed_allocations: aligned
            .failures
            .iter()
            .map(|f| SummaryFailure {
                date: f.date.format("%Y-%m-%d").to_string(),
                sum: f.sum,
                branch_ids: f.branch_ids.iter().map(|id| id.to_string()).collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&summary).context("summary serialization failed")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one compiled symphony.
///
/// Creates `{output_dir}/{name}/` and returns its path.
pub fn save_artifacts(name: &str, aligned: &Aligned, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(name);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let allocations_csv = export_matrix_csv(&aligned.allocations)?;
    std::fs::write(run_dir.join("allocations.csv"), &allocations_csv)?;

    let tracker_csv = export_matrix_csv(&aligned.branch_tracker)?;
    std::fs::write(run_dir.join("branch_tracker.csv"), &tracker_csv)?;

    let summary = export_summary_json(name, aligned)?;
    std::fs::write(run_dir.join("summary.json"), &summary)?;

    Ok(run_dir)
}
