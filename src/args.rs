use clap::Parser;

/// Converts raw electoral tally files into pre-aggregated JSON documents for map visualizations.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the options of the run. All the options have defaults.
    /// For more information about the file format, read the documentation of the `manual` module.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) The directory containing the tally files. Overrides the value of the configuration file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (directory) The directory where the documents are written. Overrides the value of the
    /// configuration file.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (directory, optional) A directory containing reference documents. If provided, the documents
    /// written by this run are compared to the documents with the same name.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default 10) The number of candidates kept for each municipality.
    #[clap(long, value_parser)]
    pub top: Option<usize>,

    /// (repeated, default all) The offices to aggregate: PRESIDENT, GOVERNOR, SENATOR.
    #[clap(long, value_parser)]
    pub office: Option<Vec<String>>,

    /// (repeated) The election years to look for in the file names.
    #[clap(long, value_parser)]
    pub year: Option<Vec<u32>>,

    /// (default twoLevel) twoLevel or municipalityOnly.
    #[clap(long, value_parser)]
    pub granularity: Option<String>,

    /// (default 100000) The number of rows read at once from a file.
    #[clap(long, value_parser)]
    pub chunk_size: Option<usize>,

    /// (file path, optional) If specified, a JSON summary of the skipped files and rows is written there.
    #[clap(long, value_parser)]
    pub report: Option<String>,

    /// If passed as an argument, malformed rows and unrecognized files above the configured
    /// thresholds abort the run.
    #[clap(long, takes_value = false)]
    pub strict: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
