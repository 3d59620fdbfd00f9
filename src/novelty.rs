use crate::record::CandidateRecord;

/// Outcome of comparing a candidate against the stored LATEST record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    /// Nothing stored yet.
    Bootstrap,
    /// Source timestamp differs from LATEST (present vs absent included).
    Changed,
    /// Same source timestamp as LATEST, or both undated.
    Unchanged,
}

impl Novelty {
    pub fn is_novel(self) -> bool {
        !matches!(self, Novelty::Unchanged)
    }
}

/// Only the source's own update timestamp counts; the page always renders a
/// full snapshot, so equal counts say nothing. `classify(..).is_novel()` is
/// the yes/no answer.
pub fn classify(candidate: &CandidateRecord, latest: Option<&CandidateRecord>) -> Novelty {
    match latest {
        None => Novelty::Bootstrap,
        Some(l) if l.source_timestamp != candidate.source_timestamp => Novelty::Changed,
        Some(_) => Novelty::Unchanged,
    }
}
