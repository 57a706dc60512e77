//! Flat views over an evaluated tree: terminal readings and loss totals.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AnnotatedNode;
use crate::config::SignalThresholds;
use crate::network::{NodeId, NodeKind};

pub const PATH_SEPARATOR: &str = " > ";
/// Path of a terminal reached without crossing any splitter.
pub const MAIN_LINE_PATH: &str = "Main Line";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalGrade {
    Good,
    Marginal,
    Critical,
}

impl SignalGrade {
    pub fn classify(power_dbm: f64, thresholds: &SignalThresholds) -> Self {
        if power_dbm < thresholds.critical_below_dbm {
            SignalGrade::Critical
        } else if power_dbm < thresholds.marginal_below_dbm {
            SignalGrade::Marginal
        } else {
            SignalGrade::Good
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalGrade::Good => "good",
            SignalGrade::Marginal => "marginal",
            SignalGrade::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalReading {
    pub id: NodeId,
    pub name: String,
    pub power_out_dbm: f64,
    /// Splitter ports crossed from the source, e.g. `"Pass > P3"`.
    pub path: String,
}

impl TerminalReading {
    pub fn grade(&self, thresholds: &SignalThresholds) -> SignalGrade {
        SignalGrade::classify(self.power_out_dbm, thresholds)
    }
}

/// Port label for `branch_index` of a node of `kind`; `None` for kinds that
/// do not split.
pub fn branch_label(kind: NodeKind, branch_index: usize) -> Option<String> {
    match kind {
        NodeKind::BalancedSplitter => Some(format!("P{}", branch_index + 1)),
        NodeKind::UnbalancedSplitter => Some(if branch_index == 0 {
            "Drop".to_string()
        } else {
            "Pass".to_string()
        }),
        _ => None,
    }
}

/// Every terminal in depth-first, branch-then-chain order.
pub fn collect_terminals(root: &AnnotatedNode) -> Vec<TerminalReading> {
    let mut readings = Vec::new();
    let mut segments = Vec::new();
    collect_into(root, &mut segments, &mut readings);
    readings
}

fn collect_into(
    node: &AnnotatedNode,
    segments: &mut Vec<String>,
    readings: &mut Vec<TerminalReading>,
) {
    if node.kind() == NodeKind::Terminal {
        let path = if segments.is_empty() {
            MAIN_LINE_PATH.to_string()
        } else {
            segments.join(PATH_SEPARATOR)
        };
        readings.push(TerminalReading {
            id: node.id.clone(),
            name: node.label.clone(),
            power_out_dbm: node.power_out_dbm,
            path,
        });
    }
    for (branch_index, branch) in node.branches.iter().enumerate() {
        let label = branch_label(node.kind(), branch_index);
        let pushed = label.is_some();
        segments.extend(label);
        for child in branch {
            collect_into(child, segments, readings);
        }
        if pushed {
            segments.pop();
        }
    }
}

/// Total dB dropped per component kind. Sources and terminals are skipped.
pub fn summarize_loss_by_kind(root: &AnnotatedNode) -> BTreeMap<NodeKind, f64> {
    let mut summary = BTreeMap::new();
    root.walk(&mut |node| {
        if matches!(node.kind(), NodeKind::Source | NodeKind::Terminal) {
            return;
        }
        *summary.entry(node.kind()).or_insert(0.0) += node.loss_db();
    });
    summary
}

pub fn total_loss_db(summary: &BTreeMap<NodeKind, f64>) -> f64 {
    summary.values().sum()
}

/// The weakest terminal; the earliest one wins a tie.
pub fn worst_terminal(readings: &[TerminalReading]) -> Option<&TerminalReading> {
    readings.iter().fold(None, |worst, reading| match worst {
        Some(current) if current.power_out_dbm <= reading.power_out_dbm => Some(current),
        _ => Some(reading),
    })
}
