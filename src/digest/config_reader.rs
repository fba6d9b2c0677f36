use crate::digest::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_INPUT_DIRECTORY: &str = "raw_csv";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "data";
pub const DEFAULT_YEARS: [u32; 4] = [2010, 2014, 2018, 2022];
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// The options of a run, as written in the configuration file.
///
/// Everything is optional: missing options take their default values.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestSettings {
    #[serde(rename = "inputDirectory")]
    pub input_directory: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "topCandidates")]
    pub top_candidates: Option<usize>,
    #[serde(rename = "offices")]
    pub offices: Option<Vec<String>>,
    #[serde(rename = "years")]
    pub years: Option<Vec<u32>>,
    #[serde(rename = "granularity")]
    pub granularity: Option<String>,
    #[serde(rename = "chunkSize")]
    pub chunk_size: Option<usize>,
    #[serde(rename = "delimiter")]
    pub delimiter: Option<String>,
    #[serde(rename = "strict")]
    pub strict: Option<bool>,
    #[serde(rename = "maxMalformedRowsPerFile")]
    pub max_malformed_rows_per_file: Option<u64>,
    #[serde(rename = "maxUnrecognizedFiles")]
    pub max_unrecognized_files: Option<u64>,
    #[serde(rename = "reportPath")]
    pub report_path: Option<String>,
}

impl DigestSettings {
    /// Command line flags take precedence over the configuration file.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(x) = &args.input {
            self.input_directory = Some(x.clone());
        }
        if let Some(x) = &args.out {
            self.output_directory = Some(x.clone());
        }
        if let Some(x) = args.top {
            self.top_candidates = Some(x);
        }
        if let Some(x) = &args.office {
            self.offices = Some(x.clone());
        }
        if let Some(x) = &args.year {
            self.years = Some(x.clone());
        }
        if let Some(x) = &args.granularity {
            self.granularity = Some(x.clone());
        }
        if let Some(x) = args.chunk_size {
            self.chunk_size = Some(x);
        }
        if let Some(x) = &args.report {
            self.report_path = Some(x.clone());
        }
        if args.strict {
            self.strict = Some(true);
        }
    }

    // Relative paths in a configuration file are relative to that file.
    fn resolve_paths(&mut self, root: &Path) {
        let resolve = |p: &Option<String>| -> Option<String> {
            p.as_ref().map(|s| {
                if Path::new(s).is_absolute() {
                    s.clone()
                } else {
                    root.join(s).display().to_string()
                }
            })
        };
        self.input_directory = resolve(&self.input_directory);
        self.output_directory = resolve(&self.output_directory);
        self.report_path = resolve(&self.report_path);
    }
}

/// How the skipped files and rows are treated.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct ErrorPolicy {
    /// If false, the thresholds are ignored and the skips are only reported.
    pub strict: bool,
    pub max_malformed_rows_per_file: u64,
    pub max_unrecognized_files: u64,
}

/// The validated options of a run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DigestConfig {
    pub input_directory: PathBuf,
    pub output_directory: PathBuf,
    pub rules: AggregationRules,
    pub years: Vec<u32>,
    pub chunk_size: usize,
    pub delimiter: u8,
    pub policy: ErrorPolicy,
    pub report_path: Option<PathBuf>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        DigestConfig {
            input_directory: PathBuf::from(DEFAULT_INPUT_DIRECTORY),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            rules: AggregationRules::default(),
            years: DEFAULT_YEARS.to_vec(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: b';',
            policy: ErrorPolicy::default(),
            report_path: None,
        }
    }
}

pub fn read_settings(path: &str) -> DigestResult<DigestSettings> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let mut settings: DigestSettings =
        serde_json::from_str(contents.as_str()).context(ParsingConfigSnafu { path })?;
    if let Some(root) = Path::new(path).parent() {
        settings.resolve_paths(root);
    }
    debug!("read_settings: {:?}", settings);
    Ok(settings)
}

pub fn validate_settings(settings: &DigestSettings) -> DigestResult<DigestConfig> {
    let defaults = DigestConfig::default();

    let offices: Vec<Office> = match &settings.offices {
        None => Office::ALL.to_vec(),
        Some(names) => {
            let mut res: Vec<Office> = Vec::new();
            for name in names.iter() {
                match Office::from_label(name) {
                    Some(o) if !res.contains(&o) => res.push(o),
                    Some(_) => {}
                    None => whatever!("Unknown office {:?}", name),
                }
            }
            res
        }
    };
    if offices.is_empty() {
        whatever!("At least one office must be aggregated");
    }

    let granularity = match settings.granularity.as_deref() {
        None | Some("twoLevel") => Granularity::TwoLevel,
        Some("municipalityOnly") => Granularity::MunicipalityOnly,
        Some(x) => whatever!("Unknown granularity {:?}", x),
    };

    let mut years: Vec<u32> = Vec::new();
    for y in settings.years.clone().unwrap_or(defaults.years) {
        if !years.contains(&y) {
            years.push(y);
        }
    }
    if years.is_empty() {
        whatever!("At least one year must be provided");
    }

    let chunk_size = match settings.chunk_size {
        None => defaults.chunk_size,
        Some(0) => whatever!("chunkSize must be at least 1"),
        Some(x) => x,
    };

    let delimiter = match settings.delimiter.as_deref().map(|s| s.as_bytes()) {
        None => defaults.delimiter,
        Some([b]) => *b,
        Some(_) => whatever!(
            "The delimiter must be a single byte: {:?}",
            settings.delimiter
        ),
    };

    Ok(DigestConfig {
        input_directory: settings
            .input_directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or(defaults.input_directory),
        output_directory: settings
            .output_directory
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or(defaults.output_directory),
        rules: AggregationRules::new(
            settings
                .top_candidates
                .unwrap_or(AggregationRules::DEFAULT_TOP_N),
            &offices,
            granularity,
        ),
        years,
        chunk_size,
        delimiter,
        policy: ErrorPolicy {
            strict: settings.strict.unwrap_or(false),
            max_malformed_rows_per_file: settings.max_malformed_rows_per_file.unwrap_or(0),
            max_unrecognized_files: settings.max_unrecognized_files.unwrap_or(0),
        },
        report_path: settings.report_path.as_ref().map(PathBuf::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = validate_settings(&DigestSettings::default()).unwrap();
        assert_eq!(config, DigestConfig::default());
        assert_eq!(config.rules.top_n, 10);
        assert_eq!(config.rules.offices, Office::ALL.to_vec());
        assert_eq!(config.input_directory, PathBuf::from("raw_csv"));
        assert_eq!(config.output_directory, PathBuf::from("data"));
    }

    #[test]
    fn parse_settings() {
        let js = r#"{
            "inputDirectory": "/data/raw",
            "topCandidates": 5,
            "offices": ["presidente", "SENATOR", "PRESIDENT"],
            "years": [2022, 2018, 2022],
            "granularity": "municipalityOnly",
            "delimiter": ",",
            "strict": true,
            "maxMalformedRowsPerFile": 12
        }"#;
        let settings: DigestSettings = serde_json::from_str(js).unwrap();
        let config = validate_settings(&settings).unwrap();
        assert_eq!(config.input_directory, PathBuf::from("/data/raw"));
        assert_eq!(config.rules.top_n, 5);
        assert_eq!(config.rules.offices, vec![Office::President, Office::Senator]);
        assert_eq!(config.rules.granularity, Granularity::MunicipalityOnly);
        assert_eq!(config.years, vec![2022, 2018]);
        assert_eq!(config.delimiter, b',');
        assert!(config.policy.strict);
        assert_eq!(config.policy.max_malformed_rows_per_file, 12);
        assert_eq!(config.policy.max_unrecognized_files, 0);
    }

    #[test]
    fn invalid_settings() {
        let bad: Vec<DigestSettings> = vec![
            DigestSettings {
                offices: Some(vec!["PREFEITO".to_string()]),
                ..DigestSettings::default()
            },
            DigestSettings {
                offices: Some(vec![]),
                ..DigestSettings::default()
            },
            DigestSettings {
                years: Some(vec![]),
                ..DigestSettings::default()
            },
            DigestSettings {
                chunk_size: Some(0),
                ..DigestSettings::default()
            },
            DigestSettings {
                delimiter: Some(";;".to_string()),
                ..DigestSettings::default()
            },
            DigestSettings {
                granularity: Some("country".to_string()),
                ..DigestSettings::default()
            },
        ];
        for s in bad.iter() {
            let res = validate_settings(s);
            assert!(res.is_err(), "{:?} should be rejected", s);
            assert_eq!(res.unwrap_err().exit_code(), 1);
        }
    }

    #[test]
    fn relative_paths_follow_config_file() {
        let mut settings = DigestSettings {
            input_directory: Some("raw".to_string()),
            output_directory: Some("/tmp/out".to_string()),
            ..DigestSettings::default()
        };
        settings.resolve_paths(Path::new("/etc/tally"));
        assert_eq!(settings.input_directory.as_deref(), Some("/etc/tally/raw"));
        assert_eq!(settings.output_directory.as_deref(), Some("/tmp/out"));
    }
}
