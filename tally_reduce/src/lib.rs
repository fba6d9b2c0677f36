mod config;
pub mod builder;
pub mod geo;
pub mod manual;
pub mod schema;

use log::{debug, info};

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::{Add, AddAssign},
};

pub use crate::config::*;
pub use crate::schema::ColumnMap;

/// The identity of the synthetic entry that holds the votes of all the candidates
/// that did not make the top of a unit.
pub const OTHERS_IDENTITY: &str = "Others (OTHERS)";

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

// Candidate identity -> running total
type CandidateTally = HashMap<String, VoteCount>;

// Geographic code, as found in the source -> tally of that unit
type UnitTally = HashMap<String, CandidateTally>;

#[derive(Eq, PartialEq, Debug, Clone, Default)]
struct OfficeTally {
    states: UnitTally,
    municipalities: UnitTally,
}

impl OfficeTally {
    fn distinct_keys(&self) -> usize {
        let count = |ut: &UnitTally| ut.values().map(|ct| ct.len()).sum::<usize>();
        count(&self.states) + count(&self.municipalities)
    }
}

fn accumulate(tally: &mut UnitTally, unit: &str, identity: &str, count: VoteCount) {
    let candidates = tally.entry(unit.to_string()).or_default();
    *candidates
        .entry(identity.to_string())
        .or_insert(VoteCount::EMPTY) += count;
}

fn merge_tally(into: &mut UnitTally, other: UnitTally) {
    for (unit, candidates) in other {
        let e = into.entry(unit).or_default();
        for (identity, count) in candidates {
            *e.entry(identity).or_insert(VoteCount::EMPTY) += count;
        }
    }
}

/// Builds the display identity of a candidate.
///
/// The name and the party are used verbatim: the same pair must always produce
/// the same key, including when one of them is empty.
pub fn candidate_identity(name: &str, party: &str) -> String {
    format!("{} ({})", name, party)
}

/// Accumulates vote totals per office, geographic unit and candidate.
///
/// Batches can be consumed in any order and aggregators built over disjoint
/// parts of the input can be merged: the final totals are the same.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Aggregator {
    rules: AggregationRules,
    tallies: BTreeMap<Office, OfficeTally>,
    summary: BatchSummary,
}

impl Aggregator {
    pub fn new(rules: &AggregationRules) -> Result<Aggregator, AggregationErrors> {
        if rules.offices.is_empty() {
            return Err(AggregationErrors::EmptyOfficeSet);
        }
        Ok(Aggregator {
            rules: rules.clone(),
            tallies: BTreeMap::new(),
            summary: BatchSummary::default(),
        })
    }

    pub fn rules(&self) -> &AggregationRules {
        &self.rules
    }

    /// Adds one record.
    ///
    /// Returns `Ok(false)` if the office of this record is not aggregated.
    pub fn add_record(&mut self, record: &RawRecord) -> Result<bool, RowError> {
        let office = match Office::from_label(&record.office) {
            Some(o) if self.rules.offices.contains(&o) => o,
            _ => return Ok(false),
        };
        let subdivision = match self.rules.granularity {
            Granularity::TwoLevel => Some(
                record
                    .subdivision
                    .as_deref()
                    .ok_or(RowError::MissingField(CanonicalField::Subdivision))?,
            ),
            Granularity::MunicipalityOnly => None,
        };

        let identity = candidate_identity(&record.candidate_name, &record.party);
        let count = VoteCount(record.votes);
        let tally = self.tallies.entry(office).or_default();
        if let Some(code) = subdivision {
            accumulate(&mut tally.states, code, &identity, count);
        }
        accumulate(&mut tally.municipalities, &record.municipality, &identity, count);
        Ok(true)
    }

    /// Consumes one batch of rows. Malformed rows are counted and dropped.
    pub fn consume_batch<I>(&mut self, batch: I) -> BatchSummary
    where
        I: IntoIterator<Item = Result<RawRecord, RowError>>,
    {
        let mut summary = BatchSummary::default();
        for row in batch {
            let res = row.and_then(|record| self.add_record(&record));
            match res {
                Ok(true) => summary.admitted += 1,
                Ok(false) => summary.filtered_out += 1,
                Err(e) => {
                    debug!("consume_batch: dropping row: {}", e);
                    summary.malformed += 1;
                }
            }
        }
        debug!(
            "consume_batch: {:?}, distinct keys so far: {}",
            summary,
            self.distinct_keys()
        );
        self.summary += summary;
        summary
    }

    /// Adds all the totals of another aggregator built with the same rules.
    pub fn merge(&mut self, other: Aggregator) {
        for (office, tally) in other.tallies {
            let e = self.tallies.entry(office).or_default();
            merge_tally(&mut e.states, tally.states);
            merge_tally(&mut e.municipalities, tally.municipalities);
        }
        self.summary += other.summary;
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    /// Number of (unit, candidate) pairs currently held, across all offices and levels.
    pub fn distinct_keys(&self) -> usize {
        self.tallies.values().map(|t| t.distinct_keys()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// The subdivision codes that are neither a letter code nor a numeric code of the
    /// translation table. They are passed through unchanged.
    pub fn unknown_subdivisions(&self) -> Vec<String> {
        let codes: BTreeSet<&String> = self
            .tallies
            .values()
            .flat_map(|t| t.states.keys())
            .filter(|code| !geo::is_known_subdivision(code))
            .collect();
        codes.into_iter().cloned().collect()
    }

    /// The running totals of one unit, as accumulated so far.
    pub fn unit_totals(&self, office: Office, municipality: &str) -> HashMap<String, u64> {
        self.tallies
            .get(&office)
            .and_then(|t| t.municipalities.get(municipality))
            .map(|ct| ct.iter().map(|(k, vc)| (k.clone(), vc.0)).collect())
            .unwrap_or_default()
    }

    /// Translates, reduces and assembles one document per office that received votes.
    pub fn finish(self, year: u32) -> Vec<OutputDocument> {
        let mut res: Vec<OutputDocument> = Vec::new();
        for office in Office::ALL {
            let tally = match self.tallies.get(&office) {
                Some(t) => t,
                None => continue,
            };
            let doc = assemble_document(year, office, tally, &self.rules);
            info!(
                "finish: {} {}: {} states, {} municipalities",
                year,
                office,
                doc.states.as_ref().map(|s| s.len()).unwrap_or(0),
                doc.municipalities.len()
            );
            res.push(doc);
        }
        res
    }
}

fn assemble_document(
    year: u32,
    office: Office,
    tally: &OfficeTally,
    rules: &AggregationRules,
) -> OutputDocument {
    let states = match rules.granularity {
        Granularity::TwoLevel => {
            let translated = translate_states(&tally.states);
            Some(
                translated
                    .iter()
                    .map(|(code, ct)| (code.clone(), reduce_internal(ct, None)))
                    .collect(),
            )
        }
        Granularity::MunicipalityOnly => None,
    };

    let municipalities: BTreeMap<String, ReducedUnit> = tally
        .municipalities
        .iter()
        .map(|(code, ct)| {
            (
                geo::translate_municipality(code),
                reduce_internal(ct, Some(rules.top_n)),
            )
        })
        .collect();

    OutputDocument {
        meta: DocumentMeta { year, office },
        states,
        municipalities: municipalities.into_iter().collect(),
    }
}

// Raw codes that translate to the same numeric code are merged.
fn translate_states(states: &UnitTally) -> BTreeMap<String, CandidateTally> {
    let mut res: BTreeMap<String, CandidateTally> = BTreeMap::new();
    for (code, ct) in states.iter() {
        let e = res.entry(geo::translate_subdivision(code)).or_default();
        for (identity, count) in ct.iter() {
            *e.entry(identity.clone()).or_insert(VoteCount::EMPTY) += *count;
        }
    }
    res
}

// Votes descending, then identity ascending.
fn ranked(tally: &CandidateTally) -> Vec<(&String, VoteCount)> {
    let mut sorted: Vec<(&String, VoteCount)> = tally.iter().map(|(k, vc)| (k, *vc)).collect();
    sorted.sort_by(|(k1, vc1), (k2, vc2)| vc2.cmp(vc1).then_with(|| k1.cmp(k2)));
    sorted
}

fn reduce_internal(tally: &CandidateTally, top_n: Option<usize>) -> ReducedUnit {
    let sorted = ranked(tally);
    let keep = top_n.unwrap_or(sorted.len()).min(sorted.len());
    let mut entries: Vec<(String, u64)> = sorted[..keep]
        .iter()
        .map(|(k, vc)| ((*k).clone(), vc.0))
        .collect();
    let rest: VoteCount = sorted[keep..].iter().map(|(_, vc)| *vc).sum();
    if rest > VoteCount::EMPTY {
        // A kept candidate may already carry the remainder identity: keys stay unique.
        match entries.iter_mut().find(|(k, _)| k.as_str() == OTHERS_IDENTITY) {
            Some((_, count)) => *count += rest.0,
            None => entries.push((OTHERS_IDENTITY.to_string(), rest.0)),
        }
    }
    ReducedUnit { entries }
}

/// Keeps the `n` candidates with the most votes and folds the others into a
/// single `Others (OTHERS)` entry.
///
/// Candidates with the same number of votes are ordered by their identity, so the
/// result does not depend on the order of the input. The remainder entry is only
/// present when it holds at least one vote. If a kept candidate already has the
/// identity `Others (OTHERS)`, the remainder is added to that entry, which keeps its
/// rank.
pub fn reduce_top_n(totals: &HashMap<String, u64>, n: usize) -> ReducedUnit {
    let tally: CandidateTally = totals
        .iter()
        .map(|(k, c)| (k.clone(), VoteCount(*c)))
        .collect();
    reduce_internal(&tally, Some(n))
}

/// All the candidates of a unit, in rank order.
pub fn rank_all(totals: &HashMap<String, u64>) -> ReducedUnit {
    let tally: CandidateTally = totals
        .iter()
        .map(|(k, c)| (k.clone(), VoteCount(*c)))
        .collect();
    reduce_internal(&tally, None)
}
