pub use crate::config::*;
use crate::Aggregator;
use log::debug;

/// A builder for adding tally rows by hand.
///
/// The command line front end streams files into an [`Aggregator`] directly; the
/// builder is the simplest way to produce documents from a few rows.
///
/// ```
/// pub use tally_reduce::builder::Builder;
/// pub use tally_reduce::AggregationRules;
/// # use tally_reduce::AggregationErrors;
///
/// let mut builder = Builder::new(&AggregationRules::default())?.top_n(1);
///
/// builder.add_row("SP", "71072", "PRESIDENTE", "CANDIDATE A", "PARTY1", 100);
/// builder.add_row("SP", "71072", "PRESIDENTE", "CANDIDATE B", "PARTY2", 50);
///
/// let docs = builder.build(2022);
/// assert_eq!(docs[0].file_name(), "2022_president.json");
/// assert_eq!(docs[0].municipalities[0].1.get("Others (OTHERS)"), Some(50));
///
/// # Ok::<(), AggregationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: AggregationRules,
    pub(crate) _records: Vec<RawRecord>,
}

impl Builder {
    pub fn new(rules: &AggregationRules) -> Result<Builder, AggregationErrors> {
        if rules.offices.is_empty() {
            return Err(AggregationErrors::EmptyOfficeSet);
        }
        Ok(Builder {
            _rules: rules.clone(),
            _records: Vec::new(),
        })
    }

    /// Sets the number of candidates kept per municipality.
    pub fn top_n(self, n: usize) -> Builder {
        Builder {
            _rules: AggregationRules {
                top_n: n,
                ..self._rules
            },
            _records: self._records,
        }
    }

    /// Adds a row.
    ///
    /// The office is matched the same way as in source files: rows for other
    /// offices are accepted here and dropped when building.
    pub fn add_row(
        &mut self,
        subdivision: &str,
        municipality: &str,
        office: &str,
        candidate_name: &str,
        party: &str,
        votes: u64,
    ) {
        self.add_record(&RawRecord {
            subdivision: Some(subdivision.to_string()),
            municipality: municipality.to_string(),
            office: office.to_string(),
            candidate_name: candidate_name.to_string(),
            party: party.to_string(),
            votes,
        })
    }

    pub fn add_record(&mut self, record: &RawRecord) {
        self._records.push(record.clone());
    }

    /// Aggregates all the rows and returns one document per office.
    pub fn build(self, year: u32) -> Vec<OutputDocument> {
        // new() rejects the rules Aggregator::new() would reject, and top_n() cannot
        // make them invalid.
        let mut agg = match Aggregator::new(&self._rules) {
            Ok(a) => a,
            Err(e) => {
                debug!("build: invalid rules {:?}: {}", self._rules, e);
                return vec![];
            }
        };
        agg.consume_batch(self._records.into_iter().map(Ok));
        agg.finish(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_flat_documents() {
        let rules = AggregationRules::new(2, &[Office::Senator], Granularity::MunicipalityOnly);
        let mut b = Builder::new(&rules).unwrap();
        b.add_row("RS", "85898", "Senador", "X", "P1", 4);
        b.add_row("RS", "85898", "SENADOR", "Y", "P2", 6);
        b.add_row("RS", "85898", "senador", "Z", "P3", 1);
        b.add_row("RS", "85898", "GOVERNADOR", "W", "P4", 100);
        let docs = b.build(2014);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].meta.year, 2014);
        assert_eq!(docs[0].states, None);
        assert_eq!(
            docs[0].municipalities[0].1.entries,
            vec![
                ("Y (P2)".to_string(), 6),
                ("X (P1)".to_string(), 4),
                ("Others (OTHERS)".to_string(), 1)
            ]
        );
    }

    #[test]
    fn invalid_rules_build_nothing() {
        let _ = env_logger::builder().is_test(true).try_init();
        assert_eq!(
            Builder::new(&AggregationRules::new(10, &[], Granularity::TwoLevel)).err(),
            Some(AggregationErrors::EmptyOfficeSet)
        );
        // Only reachable from inside the crate
        let mut b = Builder {
            _rules: AggregationRules::new(10, &[], Granularity::TwoLevel),
            _records: Vec::new(),
        };
        b.add_row("SP", "71072", "PRESIDENTE", "A", "P1", 3);
        assert!(b.build(2022).is_empty());
    }

    #[test]
    fn empty_builder() {
        let b = Builder::new(&AggregationRules::default()).unwrap();
        assert!(b.build(2022).is_empty());
    }
}
