use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};

use serde::Serialize;

use crate::digest::*;

/// What was skipped or dropped during a run.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize)]
pub struct RunReport {
    #[serde(rename = "filesProcessed")]
    pub files_processed: Vec<String>,
    #[serde(rename = "rowsAdmitted")]
    pub rows_admitted: u64,
    #[serde(rename = "rowsOtherOffices")]
    pub rows_filtered_out: u64,
    #[serde(rename = "malformedRows")]
    pub malformed_rows: u64,
    #[serde(rename = "malformedRowsByFile")]
    pub malformed_rows_by_file: BTreeMap<String, u64>,
    #[serde(rename = "unrecognizedSchema")]
    pub unrecognized_schema: Vec<String>,
    #[serde(rename = "unknownYear")]
    pub unknown_year: Vec<String>,
    #[serde(rename = "unknownGeoCodes")]
    pub unknown_geo_codes: Vec<String>,
    #[serde(rename = "ioFailures")]
    pub io_failures: Vec<String>,
    pub documents: Vec<String>,
}

impl RunReport {
    pub fn file_processed(&mut self, name: &str, summary: BatchSummary) {
        self.files_processed.push(name.to_string());
        self.rows_admitted += summary.admitted;
        self.rows_filtered_out += summary.filtered_out;
        self.malformed_rows += summary.malformed;
        if summary.malformed > 0 {
            *self
                .malformed_rows_by_file
                .entry(name.to_string())
                .or_insert(0) += summary.malformed;
        }
    }

    pub fn unrecognized_schema(&mut self, name: &str) {
        self.unrecognized_schema.push(name.to_string());
    }

    pub fn unrecognized_count(&self) -> u64 {
        self.unrecognized_schema.len() as u64
    }

    pub fn unknown_year(&mut self, name: &str) {
        self.unknown_year.push(name.to_string());
    }

    pub fn unknown_geo_code(&mut self, code: &str) {
        if let Err(idx) = self.unknown_geo_codes.binary_search_by(|c| c.as_str().cmp(code)) {
            self.unknown_geo_codes.insert(idx, code.to_string());
        }
    }

    pub fn io_failure(&mut self, name: &str) {
        self.io_failures.push(name.to_string());
    }

    pub fn document(&mut self, path: &Path) {
        self.documents.push(io_common::simplify_file_name(path));
    }

    /// Input files that could not be read point to an operational problem, not a
    /// content problem: the run is reported as incomplete.
    pub fn has_io_failures(&self) -> bool {
        !self.io_failures.is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            "Processed {} files: {} rows admitted, {} rows for other offices, {} documents written",
            self.files_processed.len(),
            self.rows_admitted,
            self.rows_filtered_out,
            self.documents.len()
        );
        let skips: [(&str, usize); 5] = [
            ("unrecognized schema (files)", self.unrecognized_schema.len()),
            ("malformed rows", self.malformed_rows as usize),
            ("unknown year (files)", self.unknown_year.len()),
            ("unknown geographic codes", self.unknown_geo_codes.len()),
            ("I/O failures (files)", self.io_failures.len()),
        ];
        for (kind, count) in skips.iter() {
            if *count > 0 {
                warn!("Skipped: {}: {}", kind, count);
            }
        }
    }

    pub fn write(&self, path: &Path) -> DigestResult<()> {
        let p = path.display().to_string();
        let file = File::create(path).context(WritingReportSnafu { path: p.clone() })?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, self).context(SerializingJsonSnafu { path: p.clone() })?;
        w.flush().context(WritingReportSnafu { path: p })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let mut r = RunReport::default();
        r.file_processed(
            "a_2022.csv",
            BatchSummary {
                admitted: 10,
                filtered_out: 2,
                malformed: 1,
            },
        );
        r.file_processed("b_2022.csv", BatchSummary::default());
        r.unknown_geo_code("ZZ");
        r.unknown_geo_code("BR");
        r.unknown_geo_code("ZZ");
        assert_eq!(r.rows_admitted, 10);
        assert_eq!(r.malformed_rows, 1);
        assert_eq!(r.malformed_rows_by_file.len(), 1);
        assert_eq!(r.unknown_geo_codes, vec!["BR", "ZZ"]);
        assert!(!r.has_io_failures());
        r.io_failure("c_2022.csv");
        assert!(r.has_io_failures());
    }

    #[test]
    fn written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("report.json");
        let mut r = RunReport::default();
        r.unknown_year("leiame.csv");
        r.write(&p).unwrap();
        let js: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&p).unwrap()).unwrap();
        assert_eq!(js["unknownYear"][0], "leiame.csv");
        assert_eq!(js["malformedRows"], 0);
    }
}
