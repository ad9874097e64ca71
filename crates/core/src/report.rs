//! Results table
//!
//! One header row, one row per image, then an `average` row. Each row is
//! flushed as soon as it is written so a failed run keeps what it scored.

use docbin_common::{BinarizeError, Result};
use docbin_metrics::MetricScores;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Label of the closing row
pub const AVERAGE_LABEL: &str = "average";

/// Metric column names, in row order
pub const METRIC_COLUMNS: [&str; 4] = ["F-Measure", "P-Fmeasure", "PSNR", "DRD"];

/// Incremental CSV writer for per-image scores
#[derive(Debug)]
pub struct MetricsReport {
    writer: csv::Writer<File>,
    path: PathBuf,
    scores: Vec<MetricScores>,
}

impl MetricsReport {
    /// Create (truncate) the table and write the header
    ///
    /// The first header cell is the run label.
    pub fn create(path: &Path, run_label: &str) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|e| report_error(path, &e))?;
        let mut report = Self {
            writer,
            path: path.to_path_buf(),
            scores: Vec::new(),
        };
        let mut header = vec![run_label];
        header.extend(METRIC_COLUMNS);
        report.write_row(&header)?;
        Ok(report)
    }

    /// Append one image's scores
    pub fn append(&mut self, name: &str, scores: MetricScores) -> Result<()> {
        self.write_record(name, &scores)?;
        self.scores.push(scores);
        Ok(())
    }

    /// Scores appended so far
    #[must_use]
    pub fn scores(&self) -> &[MetricScores] {
        &self.scores
    }

    /// Write the `average` row and close the table
    ///
    /// Returns the averages; `None` (and no row) when nothing was appended.
    pub fn finish(mut self) -> Result<Option<MetricScores>> {
        let mean = MetricScores::mean(&self.scores);
        if let Some(mean) = mean {
            self.write_record(AVERAGE_LABEL, &mean)?;
        }
        Ok(mean)
    }

    fn write_record(&mut self, label: &str, scores: &MetricScores) -> Result<()> {
        let row = [
            label.to_string(),
            scores.fmeasure.to_string(),
            scores.pseudo_fmeasure.to_string(),
            scores.psnr.to_string(),
            scores.drd.to_string(),
        ];
        self.write_row(&row)
    }

    fn write_row<S: AsRef<[u8]>>(&mut self, row: &[S]) -> Result<()> {
        self.writer
            .write_record(row)
            .map_err(|e| report_error(&self.path, &e))?;
        self.writer.flush()?;
        Ok(())
    }
}

fn report_error(path: &Path, err: &csv::Error) -> BinarizeError {
    BinarizeError::Report(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scores(f: f64) -> MetricScores {
        MetricScores {
            fmeasure: f,
            pseudo_fmeasure: f + 1.0,
            psnr: 15.5,
            drd: 2.0,
        }
    }

    #[test]
    fn test_rows_are_visible_before_finish() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metrics.csv");
        let mut report = MetricsReport::create(&path, "step2_normal").unwrap();
        report.append("page_01", scores(90.0)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "step2_normal,F-Measure,P-Fmeasure,PSNR,DRD\npage_01,90,91,15.5,2\n"
        );
    }

    #[test]
    fn test_finish_appends_average() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metrics.csv");
        let mut report = MetricsReport::create(&path, "run").unwrap();
        report.append("a", scores(80.0)).unwrap();
        report.append("b", scores(90.0)).unwrap();
        let mean = report.finish().unwrap().unwrap();
        assert_eq!(mean.fmeasure, 85.0);

        let contents = std::fs::read_to_string(&path).unwrap();
        let last = contents.lines().last().unwrap();
        assert_eq!(last, "average,85,86,15.5,2");
    }

    #[test]
    fn test_finish_without_rows_writes_no_average() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("metrics.csv");
        let report = MetricsReport::create(&path, "run").unwrap();
        assert!(report.finish().unwrap().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_unwritable_path_is_report_error() {
        let err = MetricsReport::create(Path::new("/nonexistent/dir/metrics.csv"), "run").unwrap_err();
        assert!(matches!(err, BinarizeError::Report(_)));
    }
}
