use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use tally_reduce::*;

use std::fs;
use std::path::{Path, PathBuf};

use crate::args::Args;
use crate::digest::config_reader::*;
use crate::digest::report::RunReport;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod report;

#[derive(Debug, Snafu)]
pub enum DigestError {
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration file {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid aggregation rules"))]
    InvalidRules { source: AggregationErrors },
    #[snafu(display("Error listing the input directory {path}"))]
    ReadingInputDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error creating the output directory {path}"))]
    CreatingOutputDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening tally file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading tally file {path}"))]
    ReadingCsv { source: csv::Error, path: String },
    #[snafu(display("Error writing document {path}"))]
    WritingDocument {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing {path}"))]
    SerializingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening reference document {path}"))]
    OpeningReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing reference document {path}"))]
    ParsingReference {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the run report {path}"))]
    WritingReport {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{count} {kind} exceed the strict mode threshold of {threshold}"))]
    StrictThreshold {
        kind: String,
        count: u64,
        threshold: u64,
    },
    #[snafu(display("{count} document(s) differ from the reference documents"))]
    ReferenceMismatch { count: usize },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DigestResult<T> = Result<T, DigestError>;

impl DigestError {
    /// The process exit code for this error. Successful runs exit with 0, or 2 if
    /// some input files could not be read.
    pub fn exit_code(&self) -> i32 {
        match self {
            DigestError::StrictThreshold { .. } => 3,
            DigestError::ReferenceMismatch { .. } => 4,
            _ => 1,
        }
    }
}

/// The process exit code of a run: 0 on success, 2 if some input files could not be
/// read, otherwise the code of the error.
pub fn exit_code(res: &DigestResult<RunReport>) -> i32 {
    match res {
        Ok(report) if report.has_io_failures() => 2,
        Ok(_) => 0,
        Err(e) => e.exit_code(),
    }
}

/// Resolves the configuration from the command line and runs the digest.
pub fn run(args: &Args) -> DigestResult<RunReport> {
    let mut settings = match &args.config {
        Some(p) => read_settings(p)?,
        None => DigestSettings::default(),
    };
    settings.apply_args(args);
    let config = validate_settings(&settings)?;
    info!("config: {:?}", config);
    run_digest(&config, args.reference.as_deref())
}

/// Processes all the years found in the input directory and writes the documents.
pub fn run_digest(config: &DigestConfig, reference: Option<&str>) -> DigestResult<RunReport> {
    let mut report = RunReport::default();

    let files = io_common::discover_files(&config.input_directory)?;
    info!(
        "Found {} tally files in {:?}",
        files.len(),
        config.input_directory
    );

    let mut files_by_year: Vec<(u32, Vec<PathBuf>)> =
        config.years.iter().map(|y| (*y, Vec::new())).collect();
    for f in files.iter() {
        let name = io_common::simplify_file_name(f);
        let years = io_common::detect_years(&name, &config.years);
        if years.is_empty() {
            warn!("Skipping {:?}: the file name does not contain a known year", name);
            report.unknown_year(&name);
            continue;
        }
        for (year, year_files) in files_by_year.iter_mut() {
            if years.contains(year) {
                year_files.push(f.clone());
            }
        }
    }

    fs::create_dir_all(&config.output_directory).context(CreatingOutputDirSnafu {
        path: config.output_directory.display().to_string(),
    })?;

    let mut written: Vec<PathBuf> = Vec::new();
    for (year, year_files) in files_by_year.iter() {
        if year_files.is_empty() {
            info!("No tally file for {}", year);
            continue;
        }
        info!("Processing {} ({} files)", year, year_files.len());
        let aggregator = aggregate_year(year_files, config, &mut report)?;

        for code in aggregator.unknown_subdivisions() {
            warn!(
                "{}: subdivision code {:?} has no numeric code, keeping it as is",
                year, code
            );
            report.unknown_geo_code(&code);
        }

        for doc in aggregator.finish(*year) {
            let p = io_json::write_document(&config.output_directory, &doc)?;
            info!("Saved {:?}", p);
            report.document(&p);
            written.push(p);
        }
    }

    report.log_summary();
    if let Some(p) = &config.report_path {
        report.write(p)?;
    }

    if let Some(reference_dir) = reference {
        let mismatches = io_json::compare_with_reference(Path::new(reference_dir), &written)?;
        if mismatches > 0 {
            return ReferenceMismatchSnafu { count: mismatches }.fail();
        }
        info!("All {} documents match the reference", written.len());
    }

    Ok(report)
}

fn aggregate_year(
    files: &[PathBuf],
    config: &DigestConfig,
    report: &mut RunReport,
) -> DigestResult<Aggregator> {
    let mut year_agg = Aggregator::new(&config.rules).context(InvalidRulesSnafu {})?;
    for f in files.iter() {
        let name = io_common::simplify_file_name(f);
        if let Some(file_agg) = aggregate_file(f, config, report)? {
            let summary = file_agg.summary();
            info!(
                "{}: {} rows admitted, {} rows for other offices, {} malformed rows",
                name, summary.admitted, summary.filtered_out, summary.malformed
            );
            report.file_processed(&name, summary);
            check_malformed(&name, summary.malformed, &config.policy)?;
            year_agg.merge(file_agg);
        }
    }
    Ok(year_agg)
}

// A file is only merged into the year if it was read completely.
fn aggregate_file(
    path: &Path,
    config: &DigestConfig,
    report: &mut RunReport,
) -> DigestResult<Option<Aggregator>> {
    let name = io_common::simplify_file_name(path);
    let mut source = match io_csv::open_source(path, config.delimiter) {
        Ok(s) => s,
        Err(e) => {
            warn!("Skipping {}: {}", name, e);
            report.io_failure(&name);
            return Ok(None);
        }
    };

    let columns = match ColumnMap::resolve(source.header(), config.rules.granularity) {
        Ok(c) => c,
        Err(e) => {
            warn!("Skipping {}: {}", name, e);
            report.unrecognized_schema(&name);
            check_unrecognized(report.unrecognized_count(), &config.policy)?;
            return Ok(None);
        }
    };
    debug!("{}: columns {:?}", name, columns);

    let mut file_agg = Aggregator::new(&config.rules).context(InvalidRulesSnafu {})?;
    let res = source.read_chunks(&columns, config.chunk_size, |batch| {
        file_agg.consume_batch(batch);
    });
    match res {
        Ok(rows) => {
            debug!("{}: read {} rows", name, rows);
            Ok(Some(file_agg))
        }
        Err(e) => {
            warn!("Skipping {}: {}", name, e);
            report.io_failure(&name);
            Ok(None)
        }
    }
}

fn check_malformed(name: &str, malformed: u64, policy: &ErrorPolicy) -> DigestResult<()> {
    if malformed > 0 {
        warn!("{}: dropped {} malformed rows", name, malformed);
    }
    if policy.strict && malformed > policy.max_malformed_rows_per_file {
        return StrictThresholdSnafu {
            kind: format!("malformed rows in {}", name),
            count: malformed,
            threshold: policy.max_malformed_rows_per_file,
        }
        .fail();
    }
    Ok(())
}

fn check_unrecognized(count: u64, policy: &ErrorPolicy) -> DigestResult<()> {
    if policy.strict && count > policy.max_unrecognized_files {
        return StrictThresholdSnafu {
            kind: "files with an unrecognized schema",
            count,
            threshold: policy.max_unrecognized_files,
        }
        .fail();
    }
    Ok(())
}

#[cfg(test)]
fn run_digest_test(test_name: &str, config: DigestConfig) -> DigestResult<RunReport> {
    let _ = env_logger::builder().is_test(true).try_init();
    let test_dir = option_env!("TALLY_TEST_DIR").unwrap_or(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests"
    ));
    info!("Running test {}", test_name);
    let reference = format!("{}/{}/expected", test_dir, test_name);
    run_digest(
        &DigestConfig {
            input_directory: PathBuf::from(format!("{}/{}/raw_csv", test_dir, test_name)),
            ..config
        },
        Some(reference.as_str()),
    )
}

// Runs a test case from the tests directory with the default options, writing into a
// temporary directory.
#[cfg(test)]
pub fn test_wrapper(test_name: &str) -> RunReport {
    let out = tempfile::tempdir().unwrap();
    let config = DigestConfig {
        output_directory: out.path().to_path_buf(),
        ..DigestConfig::default()
    };
    match run_digest_test(test_name, config) {
        Ok(r) => r,
        Err(e) => panic!("test {} failed: {}", test_name, e),
    }
}
