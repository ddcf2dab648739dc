/// Outcome of comparing an observed page size against the stored baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No baseline recorded yet (first run) — never a change.
    NoBaseline,
    /// Observed size matches the baseline.
    Unchanged,
    /// Observed size differs from a nonzero baseline.
    Changed { was: u64, now: u64 },
}

impl Outcome {
    /// Whether this outcome should trigger a notification.
    pub fn is_change(&self) -> bool {
        matches!(self, Outcome::Changed { .. })
    }
}

/// Compare an observed size against the persisted baseline.
///
/// A baseline of 0 means "no baseline yet": the first run establishes one
/// and never fires a change, regardless of the observed value.
pub fn evaluate(baseline: u64, observed: u64) -> Outcome {
    if baseline == 0 {
        Outcome::NoBaseline
    } else if observed == baseline {
        Outcome::Unchanged
    } else {
        Outcome::Changed {
            was: baseline,
            now: observed,
        }
    }
}
