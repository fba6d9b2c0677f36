//! Resolution of the source columns to the canonical fields.

use log::debug;

use std::collections::BTreeMap;

use crate::config::*;

/// The position of each canonical field in the rows of one source.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnMap {
    columns: BTreeMap<CanonicalField, usize>,
}

impl ColumnMap {
    /// Resolves a header against the known aliases.
    ///
    /// Column names are compared case-insensitively. When a source carries
    /// several aliases of the same field, the one listed first in
    /// `CanonicalField::aliases` is used.
    pub fn resolve<S: AsRef<str>>(
        header: &[S],
        granularity: Granularity,
    ) -> Result<ColumnMap, AggregationErrors> {
        let normalized: Vec<String> = header
            .iter()
            .map(|h| h.as_ref().trim().to_ascii_uppercase())
            .collect();

        let mut columns: BTreeMap<CanonicalField, usize> = BTreeMap::new();
        for field in CanonicalField::ALL {
            let found = field
                .aliases()
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias));
            if let Some(idx) = found {
                columns.insert(field, idx);
            }
        }
        debug!("ColumnMap::resolve: header {:?} -> {:?}", normalized, columns);

        let missing: Vec<CanonicalField> = granularity
            .required_fields()
            .iter()
            .filter(|f| !columns.contains_key(*f))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(AggregationErrors::UnrecognizedSchema { missing });
        }
        Ok(ColumnMap { columns })
    }

    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// Extracts a typed record from one row of the source.
    pub fn extract<S: AsRef<str>>(&self, row: &[S]) -> Result<RawRecord, RowError> {
        let votes = parse_votes(self.required(row, CanonicalField::Votes)?)?;
        Ok(RawRecord {
            subdivision: self
                .field(row, CanonicalField::Subdivision)?
                .map(|s| s.to_string()),
            municipality: self
                .required(row, CanonicalField::Municipality)?
                .to_string(),
            office: self.required(row, CanonicalField::Office)?.to_string(),
            candidate_name: self.required(row, CanonicalField::Candidate)?.to_string(),
            party: self.required(row, CanonicalField::Party)?.to_string(),
            votes,
        })
    }

    // None if the field is not part of this source.
    fn field<'r, S: AsRef<str>>(
        &self,
        row: &'r [S],
        field: CanonicalField,
    ) -> Result<Option<&'r str>, RowError> {
        match self.index(field) {
            Some(idx) => row
                .get(idx)
                .map(|s| Some(s.as_ref()))
                .ok_or(RowError::MissingField(field)),
            None => Ok(None),
        }
    }

    fn required<'r, S: AsRef<str>>(
        &self,
        row: &'r [S],
        field: CanonicalField,
    ) -> Result<&'r str, RowError> {
        self.field(row, field)?
            .ok_or(RowError::MissingField(field))
    }
}

fn parse_votes(s: &str) -> Result<u64, RowError> {
    s.trim()
        .parse::<u64>()
        .map_err(|_| RowError::InvalidVoteCount(s.to_string()))
}
