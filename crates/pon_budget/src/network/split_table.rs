//! Splitter insertion-loss tables.
//!
//! Balanced ratios are keyed `1:N` and carry one loss for every port.
//! Unbalanced ratios are keyed `drop/pass` (percent of power) and carry one
//! loss per leg.

pub const DEFAULT_BALANCED_RATIO: &str = "1:2";
pub const DEFAULT_UNBALANCED_RATIO: &str = "10/90";

const BALANCED_LOSSES: [(&str, f64); 6] = [
    ("1:2", 3.5),
    ("1:4", 7.2),
    ("1:8", 10.5),
    ("1:16", 13.8),
    ("1:32", 17.1),
    ("1:64", 20.5),
];

const UNBALANCED_LOSSES: [(&str, UnbalancedLegs); 6] = [
    ("05/95", UnbalancedLegs::new(14.3, 0.8)),
    ("10/90", UnbalancedLegs::new(11.0, 1.1)),
    ("20/80", UnbalancedLegs::new(7.9, 1.6)),
    ("30/70", UnbalancedLegs::new(6.1, 2.2)),
    ("40/60", UnbalancedLegs::new(4.8, 2.9)),
    ("50/50", UnbalancedLegs::new(3.7, 3.7)),
];

/// Per-leg loss of an unbalanced splitter, in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnbalancedLegs {
    pub drop_db: f64,
    pub pass_db: f64,
}

impl UnbalancedLegs {
    pub const fn new(drop_db: f64, pass_db: f64) -> Self {
        Self { drop_db, pass_db }
    }

    /// Loss of leg `branch_index`: 0 is drop, anything else is pass.
    pub fn leg_db(&self, branch_index: usize) -> f64 {
        if branch_index == 0 {
            self.drop_db
        } else {
            self.pass_db
        }
    }
}

pub fn balanced_loss_db(ratio: &str) -> Option<f64> {
    BALANCED_LOSSES
        .iter()
        .find(|(key, _)| *key == ratio)
        .map(|(_, loss)| *loss)
}

pub fn unbalanced_legs(ratio: &str) -> Option<UnbalancedLegs> {
    UNBALANCED_LOSSES
        .iter()
        .find(|(key, _)| *key == ratio)
        .map(|(_, legs)| *legs)
}

/// Output port count of a balanced ratio (`"1:8"` -> 8).
/// Works for ratios outside the loss table; `None` when unparseable or zero.
pub fn port_count(ratio: &str) -> Option<usize> {
    let (_, ports) = ratio.split_once(':')?;
    ports.trim().parse::<usize>().ok().filter(|count| *count > 0)
}

pub fn balanced_ratios() -> impl Iterator<Item = &'static str> {
    BALANCED_LOSSES.iter().map(|(key, _)| *key)
}

pub fn unbalanced_ratios() -> impl Iterator<Item = &'static str> {
    UNBALANCED_LOSSES.iter().map(|(key, _)| *key)
}
