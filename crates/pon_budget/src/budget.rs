//! Optical power propagation over the distribution tree.
//!
//! [`evaluate`] walks the tree depth-first, branches left to right, and
//! chains power along each branch: the first child of a branch receives the
//! branch input, every later child receives its predecessor's output. All
//! values are in the dB domain, so losses subtract linearly.

mod terminals;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

use crate::config::LossDefaults;
use crate::network::split_table::{unbalanced_legs, UnbalancedLegs};
use crate::network::{span_loss_db, Component, Node, NodeId, NodeKind};

pub use terminals::{
    branch_label, collect_terminals, summarize_loss_by_kind, total_loss_db, worst_terminal,
    SignalGrade, TerminalReading, MAIN_LINE_PATH, PATH_SEPARATOR,
};

/// A node together with the power entering and leaving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedNode {
    pub id: NodeId,
    pub label: String,
    pub own_loss_db: f64,
    #[serde(flatten)]
    pub component: Component,
    pub power_in_dbm: f64,
    pub power_out_dbm: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<Vec<AnnotatedNode>>,
}

impl AnnotatedNode {
    pub fn kind(&self) -> NodeKind {
        self.component.kind()
    }

    /// Power dropped across this node, in dB.
    pub fn loss_db(&self) -> f64 {
        self.power_in_dbm - self.power_out_dbm
    }

    pub fn find(&self, id: &NodeId) -> Option<&AnnotatedNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children().find_map(|child| child.find(id))
    }

    pub fn children(&self) -> impl Iterator<Item = &AnnotatedNode> {
        self.branches.iter().flat_map(|branch| branch.iter())
    }

    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a AnnotatedNode),
    {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Annotate `node` and its whole subtree with power levels, given
/// `input_power_dbm` entering `node`. The input tree is not modified.
pub fn evaluate(node: &Node, input_power_dbm: f64, defaults: &LossDefaults) -> AnnotatedNode {
    let power_out_dbm = input_power_dbm - node_loss_db(node, defaults);
    let branches = node
        .branches
        .iter()
        .enumerate()
        .map(|(branch_index, branch)| {
            let mut power_dbm =
                branch_input_dbm(node, branch_index, input_power_dbm, power_out_dbm);
            branch
                .iter()
                .map(|child| {
                    let annotated = evaluate(child, power_dbm, defaults);
                    power_dbm = annotated.power_out_dbm;
                    annotated
                })
                .collect()
        })
        .collect();

    AnnotatedNode {
        id: node.id.clone(),
        label: node.label.clone(),
        own_loss_db: node.own_loss_db,
        component: node.component.clone(),
        power_in_dbm: input_power_dbm,
        power_out_dbm,
        branches,
    }
}

/// Fiber spans are recomputed from their length fields so a stale
/// `own_loss_db` never leaks into the result.
fn node_loss_db(node: &Node, defaults: &LossDefaults) -> f64 {
    match &node.component {
        Component::FiberSpan {
            length_value,
            length_unit,
            attenuation_db_per_km,
        } => span_loss_db(*length_value, *length_unit, *attenuation_db_per_km, defaults),
        _ => node.own_loss_db,
    }
}

fn branch_input_dbm(
    node: &Node,
    branch_index: usize,
    input_power_dbm: f64,
    power_out_dbm: f64,
) -> f64 {
    match &node.component {
        Component::UnbalancedSplitter {
            split_ratio,
            drop_loss_override_db,
            pass_loss_override_db,
        } => {
            let table = unbalanced_legs(split_ratio);
            let legs = UnbalancedLegs::new(
                drop_loss_override_db
                    .or(table.map(|legs| legs.drop_db))
                    .unwrap_or(0.0),
                pass_loss_override_db
                    .or(table.map(|legs| legs.pass_db))
                    .unwrap_or(0.0),
            );
            input_power_dbm - legs.leg_db(branch_index) - node.own_loss_db
        }
        _ => power_out_dbm,
    }
}
