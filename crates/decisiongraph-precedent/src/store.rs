//! The precedent registry: an id-holding index over Judgment cells,
//! incrementally maintained through `CellSink` and rebuildable from any
//! chain by replaying it through the same hook.

use std::collections::{BTreeMap, BTreeSet};

use decisiongraph_chain::{CellSink, Chain};
use decisiongraph_core::cell::Cell;
use decisiongraph_core::payload::{parse_object, AppealOutcome, Disposition, JudgmentPayload};
use decisiongraph_core::types::{CellId, CellType, Namespace, UtcStamp};

/// A judgment pulled out of the chain, with its chain coordinates.
#[derive(Clone, Debug)]
pub struct JudgmentRecord {
    pub cell_id: CellId,
    pub namespace: Namespace,
    pub system_time: UtcStamp,
    pub payload: JudgmentPayload,
}

#[derive(Debug, Default)]
pub struct PrecedentIndex {
    /// All judgment cells, in commit order.
    judgments: Vec<CellId>,
    /// fingerprint_hash → judgment cells carrying it.
    by_fingerprint: BTreeMap<String, Vec<CellId>>,
}

impl PrecedentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from an existing chain, e.g. at startup.
    pub fn rebuild(chain: &Chain) -> Self {
        let mut index = Self::default();
        for cell in chain.iter() {
            index.on_commit(cell);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.judgments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }

    fn record(chain: &Chain, id: &CellId) -> Option<JudgmentRecord> {
        let cell = chain.get(id)?;
        let payload = parse_object::<JudgmentPayload>(&cell.fact.object, "Judgment").ok()?;
        Some(JudgmentRecord {
            cell_id: cell.cell_id.clone(),
            namespace: cell.fact.namespace.clone(),
            system_time: cell.header.system_time.clone(),
            payload,
        })
    }

    fn in_scope(record: &JudgmentRecord, prefix: &Namespace, as_of: Option<&UtcStamp>) -> bool {
        prefix.contains(&record.namespace)
            && as_of.map_or(true, |t| record.system_time <= *t)
    }

    /// Judgments under `prefix`, oldest first. The pool the engine scores.
    pub fn all_in(
        &self,
        chain: &Chain,
        prefix: &Namespace,
        as_of: Option<&UtcStamp>,
    ) -> Vec<JudgmentRecord> {
        self.judgments
            .iter()
            .filter_map(|id| Self::record(chain, id))
            .filter(|r| Self::in_scope(r, prefix, as_of))
            .collect()
    }

    pub fn find_by_fingerprint(
        &self,
        chain: &Chain,
        fingerprint_hash: &str,
        prefix: &Namespace,
        as_of: Option<&UtcStamp>,
    ) -> Vec<JudgmentRecord> {
        self.by_fingerprint
            .get(fingerprint_hash)
            .into_iter()
            .flatten()
            .filter_map(|id| Self::record(chain, id))
            .filter(|r| Self::in_scope(r, prefix, as_of))
            .collect()
    }

    /// Judgments sharing at least `min_overlap` exclusion codes with
    /// `codes`, optionally restricted to one disposition. Results carry the
    /// overlap count, strongest overlap first (ties by cell id).
    pub fn find_by_exclusion_codes(
        &self,
        chain: &Chain,
        codes: &BTreeSet<String>,
        prefix: &Namespace,
        outcome: Option<Disposition>,
        min_overlap: usize,
    ) -> Vec<(JudgmentRecord, usize)> {
        let mut hits: Vec<(JudgmentRecord, usize)> = self
            .judgments
            .iter()
            .filter_map(|id| Self::record(chain, id))
            .filter(|r| Self::in_scope(r, prefix, None))
            .filter(|r| outcome.map_or(true, |o| r.payload.disposition == o))
            .filter_map(|r| {
                let overlap = r.payload.exclusion_codes.intersection(codes).count();
                (overlap >= min_overlap && overlap > 0).then_some((r, overlap))
            })
            .collect();
        hits.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.0.cell_id.cmp(&b.0.cell_id))
        });
        hits
    }

    /// Aggregate view over one fingerprint: how often it was seen, how the
    /// outcomes split, and how appeals went.
    pub fn get_statistics(
        &self,
        chain: &Chain,
        fingerprint_hash: &str,
        prefix: &Namespace,
    ) -> PrecedentStatistics {
        let mut stats = PrecedentStatistics::default();
        for record in self.find_by_fingerprint(chain, fingerprint_hash, prefix, None) {
            stats.total_count += 1;
            *stats
                .outcome_counts
                .entry(record.payload.disposition)
                .or_default() += 1;
            match record.payload.appeal_outcome {
                Some(AppealOutcome::Upheld) => {
                    stats.appeal_stats.appealed += 1;
                    stats.appeal_stats.upheld += 1;
                }
                Some(AppealOutcome::Overturned) => {
                    stats.appeal_stats.appealed += 1;
                    stats.appeal_stats.overturned += 1;
                }
                Some(AppealOutcome::Withdrawn) => {
                    stats.appeal_stats.appealed += 1;
                    stats.appeal_stats.withdrawn += 1;
                }
                None => {}
            }
        }
        stats
    }
}

impl CellSink for PrecedentIndex {
    fn on_commit(&mut self, cell: &Cell) {
        if cell.header.cell_type != CellType::Judgment {
            return;
        }
        // The gate has already validated the payload shape; an unparsable
        // object here would mean the gate and the index disagree.
        if let Ok(payload) = parse_object::<JudgmentPayload>(&cell.fact.object, "Judgment") {
            self.judgments.push(cell.cell_id.clone());
            self.by_fingerprint
                .entry(payload.fingerprint_hash)
                .or_default()
                .push(cell.cell_id.clone());
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AppealStats {
    pub appealed: usize,
    pub upheld: usize,
    pub overturned: usize,
    pub withdrawn: usize,
}

#[derive(Clone, Debug, Default)]
pub struct PrecedentStatistics {
    pub total_count: usize,
    pub outcome_counts: BTreeMap<Disposition, usize>,
    pub appeal_stats: AppealStats,
}
