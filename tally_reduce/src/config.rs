// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// One row of a source batch, after its columns have been resolved and typed.
///
/// The geographic codes are kept exactly as they appear in the source file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRecord {
    /// The first-level subdivision code (usually a 2-letter code). Only required
    /// for two-level aggregation.
    pub subdivision: Option<String>,
    /// The municipality code, passed through verbatim.
    pub municipality: String,
    /// The office, as labelled in the source.
    pub office: String,
    pub candidate_name: String,
    pub party: String,
    pub votes: u64,
}

/// The reasons a row may be dropped from a batch.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RowError {
    /// The row is shorter than the column that holds this field.
    MissingField(CanonicalField),
    /// The vote count is not a non-negative integer.
    InvalidVoteCount(String),
    /// The row could not be read at all (wrong number of fields, bad quoting...).
    Unparseable(String),
}

impl Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::MissingField(field) => write!(f, "missing field {}", field.name()),
            RowError::InvalidVoteCount(s) => write!(f, "invalid vote count {:?}", s),
            RowError::Unparseable(msg) => write!(f, "unparseable row: {}", msg),
        }
    }
}

impl Error for RowError {}

/// The normalized fields that every source schema must be mapped to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum CanonicalField {
    Votes,
    Candidate,
    Party,
    Municipality,
    Office,
    Subdivision,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Votes,
        CanonicalField::Candidate,
        CanonicalField::Party,
        CanonicalField::Municipality,
        CanonicalField::Office,
        CanonicalField::Subdivision,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::Votes => "votes",
            CanonicalField::Candidate => "candidate",
            CanonicalField::Party => "party",
            CanonicalField::Municipality => "municipality",
            CanonicalField::Office => "office",
            CanonicalField::Subdivision => "subdivision",
        }
    }

    /// The known historical column names for this field, in priority order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::Votes => &["QT_VOTOS", "QTD_VOTOS", "QT_VOTOS_NOMINAIS"],
            CanonicalField::Candidate => &["NM_URNA_CANDIDATO", "NM_CANDIDATO"],
            CanonicalField::Party => &["SG_PARTIDO"],
            CanonicalField::Municipality => &["CD_MUNICIPIO"],
            CanonicalField::Office => &["DS_CARGO"],
            CanonicalField::Subdivision => &["SG_UF"],
        }
    }
}

// ******** Output data structures *********

/// The candidate entries of one geographic unit, in rank order.
///
/// The synthetic remainder entry, if any, is always the last one.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ReducedUnit {
    pub entries: Vec<(String, u64)>,
}

impl ReducedUnit {
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| *c).sum()
    }

    pub fn get(&self, identity: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(name, _)| name == identity)
            .map(|(_, c)| *c)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DocumentMeta {
    pub year: u32,
    pub office: Office,
}

/// The artifact for one (year, office) pair.
///
/// The units are sorted by their code. `states` is `None` for the flat
/// (municipality only) granularity.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OutputDocument {
    pub meta: DocumentMeta,
    pub states: Option<Vec<(String, ReducedUnit)>>,
    pub municipalities: Vec<(String, ReducedUnit)>,
}

impl OutputDocument {
    /// Name of the file this document is written to.
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.meta.year, self.meta.office.slug())
    }
}

/// Counters collected while consuming batches.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct BatchSummary {
    pub admitted: u64,
    pub filtered_out: u64,
    pub malformed: u64,
}

impl std::ops::AddAssign for BatchSummary {
    fn add_assign(&mut self, rhs: BatchSummary) {
        self.admitted += rhs.admitted;
        self.filtered_out += rhs.filtered_out;
        self.malformed += rhs.malformed;
    }
}

/// Errors that prevent the aggregation from proceeding.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationErrors {
    /// The header of a source does not resolve all the required canonical fields.
    UnrecognizedSchema { missing: Vec<CanonicalField> },
    /// No office to aggregate.
    EmptyOfficeSet,
}

impl Error for AggregationErrors {}

impl Display for AggregationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationErrors::UnrecognizedSchema { missing } => {
                let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
                write!(f, "unrecognized schema, missing fields: {}", names.join(", "))
            }
            AggregationErrors::EmptyOfficeSet => write!(f, "no office to aggregate"),
        }
    }
}

// ********* Configuration **********

/// The offices that can be aggregated.
///
/// Source files label offices in the language of the election authority, so each
/// office also matches its source label.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Office {
    President,
    Governor,
    Senator,
}

impl Office {
    pub const ALL: [Office; 3] = [Office::President, Office::Governor, Office::Senator];

    pub fn name(&self) -> &'static str {
        match self {
            Office::President => "PRESIDENT",
            Office::Governor => "GOVERNOR",
            Office::Senator => "SENATOR",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Office::President => "president",
            Office::Governor => "governor",
            Office::Senator => "senator",
        }
    }

    fn source_label(&self) -> &'static str {
        match self {
            Office::President => "PRESIDENTE",
            Office::Governor => "GOVERNADOR",
            Office::Senator => "SENADOR",
        }
    }

    /// Matches a label, either the canonical name or the source label, ignoring case.
    pub fn from_label(label: &str) -> Option<Office> {
        let upper = label.to_uppercase();
        Office::ALL
            .iter()
            .find(|o| upper == o.name() || upper == o.source_label())
            .copied()
    }
}

impl Display for Office {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The geographic levels at which votes are accumulated.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Granularity {
    /// Subdivisions (all candidates kept) and municipalities (top-N reduced).
    TwoLevel,
    /// Municipalities only.
    MunicipalityOnly,
}

impl Granularity {
    pub fn required_fields(&self) -> &'static [CanonicalField] {
        match self {
            Granularity::TwoLevel => &CanonicalField::ALL,
            Granularity::MunicipalityOnly => &[
                CanonicalField::Votes,
                CanonicalField::Candidate,
                CanonicalField::Party,
                CanonicalField::Municipality,
                CanonicalField::Office,
            ],
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregationRules {
    /// Number of candidates kept per municipality before folding the rest.
    pub top_n: usize,
    pub offices: Vec<Office>,
    pub granularity: Granularity,
}

impl AggregationRules {
    pub const DEFAULT_TOP_N: usize = 10;

    pub fn new(top_n: usize, offices: &[Office], granularity: Granularity) -> AggregationRules {
        AggregationRules {
            top_n,
            offices: offices.to_vec(),
            granularity,
        }
    }
}

impl Default for AggregationRules {
    fn default() -> Self {
        AggregationRules::new(
            AggregationRules::DEFAULT_TOP_N,
            &Office::ALL,
            Granularity::TwoLevel,
        )
    }
}
