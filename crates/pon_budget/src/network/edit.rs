//! Structural edits over the distribution tree.
//!
//! Every operation takes the current tree by reference and returns a new tree.
//! Stale ids and out-of-range branch indices leave the tree unchanged.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::factory::create_node;
use super::split_table::{balanced_loss_db, port_count, unbalanced_legs};
use super::{span_loss_db, Component, LengthUnit, Node, NodeId, NodeKind};
use crate::config::LossDefaults;

/// Partial field update for [`update`]. Fields that do not apply to the
/// target's kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePatch {
    pub label: Option<String>,
    pub own_loss_db: Option<f64>,
    pub length_value: Option<f64>,
    pub length_unit: Option<LengthUnit>,
    pub attenuation_db_per_km: Option<f64>,
    pub split_ratio: Option<String>,
    pub drop_loss_override_db: Option<f64>,
    pub pass_loss_override_db: Option<f64>,
    pub vertical_offset: Option<f64>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self == &NodePatch::default()
    }

    /// True when the patch only moves the node on screen.
    pub fn is_layout_only(&self) -> bool {
        self.vertical_offset.is_some()
            && NodePatch {
                vertical_offset: None,
                ..self.clone()
            }
            .is_empty()
    }

    fn touches_span(&self) -> bool {
        self.length_value.is_some()
            || self.length_unit.is_some()
            || self.attenuation_db_per_km.is_some()
    }
}

/// Insert `new_node` into `parent.branches[branch_index]` at `at_index`, or
/// append when `at_index` is `None` or past the end.
///
/// A splitter inserted in front of existing content takes that trailing
/// content onto its first output branch.
pub fn insert(
    root: &Node,
    parent_id: &NodeId,
    branch_index: usize,
    new_node: Node,
    at_index: Option<usize>,
) -> Node {
    let mut next = root.clone();
    insert_in_place(&mut next, parent_id, branch_index, new_node, at_index);
    next
}

fn insert_in_place(
    root: &mut Node,
    parent_id: &NodeId,
    branch_index: usize,
    mut new_node: Node,
    at_index: Option<usize>,
) -> bool {
    if new_node.kind() == NodeKind::Source {
        debug!(node = %new_node.id, "insert skipped: a tree holds a single source");
        return false;
    }
    if let Some(duplicate) = new_node.ids().into_iter().find(|id| root.contains(id)) {
        debug!(node = %duplicate, "insert skipped: id already present");
        return false;
    }
    let Some(parent) = root.find_mut(parent_id) else {
        debug!(parent = %parent_id, "insert skipped: parent not found");
        return false;
    };
    let Some(branch) = parent.branches.get_mut(branch_index) else {
        debug!(parent = %parent_id, branch_index, "insert skipped: branch out of range");
        return false;
    };

    match at_index {
        Some(at) if at < branch.len() => {
            if new_node.kind().is_splitter() {
                let trailing = branch.split_off(at);
                match new_node.branches.first_mut() {
                    Some(first) => first.extend(trailing),
                    None => new_node.branches.push(trailing),
                }
                branch.push(new_node);
            } else {
                branch.insert(at, new_node);
            }
        }
        _ => branch.push(new_node),
    }
    true
}

/// Remove the node with `id`. A removed splitter's first branch is spliced
/// into the gap it leaves; its other branches are dropped.
pub fn remove(root: &Node, id: &NodeId) -> Node {
    let mut next = root.clone();
    if &root.id == id {
        debug!(node = %id, "remove skipped: the root cannot be removed");
        return next;
    }
    if !remove_in_place(&mut next, id) {
        debug!(node = %id, "remove skipped: node not found");
    }
    next
}

fn remove_in_place(node: &mut Node, id: &NodeId) -> bool {
    for branch in &mut node.branches {
        if let Some(index) = branch.iter().position(|child| &child.id == id) {
            let removed = branch.remove(index);
            let inherited = if removed.kind().is_splitter() {
                let mut outputs = removed.branches.into_iter();
                let first = outputs.next().unwrap_or_default();
                let dropped: usize = outputs.flatten().map(|child| child.node_count()).sum();
                if dropped > 0 {
                    debug!(node = %id, dropped, "removed splitter discarded secondary branches");
                }
                first
            } else {
                Vec::new()
            };
            branch.splice(index..index, inherited);
            return true;
        }
        if branch.iter_mut().any(|child| remove_in_place(child, id)) {
            return true;
        }
    }
    false
}

/// Merge `patch` into the node with `id`, re-deriving dependent fields.
pub fn update(root: &Node, id: &NodeId, patch: &NodePatch, defaults: &LossDefaults) -> Node {
    let mut next = root.clone();
    match next.find_mut(id) {
        Some(node) => apply_patch(node, patch, defaults),
        None => debug!(node = %id, "update skipped: node not found"),
    }
    next
}

fn apply_patch(node: &mut Node, patch: &NodePatch, defaults: &LossDefaults) {
    if let Some(label) = &patch.label {
        node.label = label.clone();
    }
    if let Some(offset) = patch.vertical_offset {
        node.vertical_offset = offset;
    }

    match &mut node.component {
        Component::FiberSpan {
            length_value,
            length_unit,
            attenuation_db_per_km,
        } => {
            if patch.own_loss_db.is_some() {
                debug!(node = %node.id, "fiber span loss is derived; own loss ignored");
            }
            let previous_length = *length_value;
            if let Some(value) = patch.length_value {
                *length_value = value;
            }
            // A unit switch rewrites the stored length, overriding any value in the same patch.
            if let Some(unit) = patch.length_unit {
                if unit != *length_unit {
                    *length_value = length_unit.convert(previous_length, unit);
                    *length_unit = unit;
                }
            }
            if let Some(attenuation) = patch.attenuation_db_per_km {
                *attenuation_db_per_km = Some(attenuation);
            }
            if patch.touches_span() {
                node.own_loss_db =
                    span_loss_db(*length_value, *length_unit, *attenuation_db_per_km, defaults);
            }
        }
        Component::BalancedSplitter { split_ratio } => {
            if let Some(loss) = patch.own_loss_db {
                node.own_loss_db = loss;
            }
            if let Some(ratio) = &patch.split_ratio {
                *split_ratio = ratio.clone();
                node.own_loss_db =
                    balanced_loss_db(ratio).unwrap_or(0.0) + defaults.splitter_extra_loss_db;
                match port_count(ratio) {
                    Some(ports) => node.branches.resize_with(ports, Vec::new),
                    None => debug!(node = %node.id, ratio = %ratio, "unparseable port count"),
                }
            }
        }
        Component::UnbalancedSplitter {
            split_ratio,
            drop_loss_override_db,
            pass_loss_override_db,
        } => {
            if let Some(loss) = patch.own_loss_db {
                node.own_loss_db = loss;
            }
            if let Some(drop) = patch.drop_loss_override_db {
                *drop_loss_override_db = Some(drop);
            }
            if let Some(pass) = patch.pass_loss_override_db {
                *pass_loss_override_db = Some(pass);
            }
            if let Some(ratio) = &patch.split_ratio {
                *split_ratio = ratio.clone();
                match unbalanced_legs(ratio) {
                    Some(legs) => {
                        *drop_loss_override_db = Some(legs.drop_db);
                        *pass_loss_override_db = Some(legs.pass_db);
                    }
                    None => debug!(node = %node.id, ratio = %ratio, "unknown unbalanced ratio"),
                }
            }
        }
        Component::Source | Component::Connector | Component::Splice | Component::Terminal => {
            if let Some(loss) = patch.own_loss_db {
                node.own_loss_db = loss;
            }
        }
    }
}

/// Swap a splitter between its balanced and unbalanced variants in place.
///
/// The node keeps its id, label and branch contents (by index); ratio and
/// losses reset to the new variant's creation defaults.
pub fn convert_splitter_variant(root: &Node, id: &NodeId, defaults: &LossDefaults) -> Node {
    let mut next = root.clone();
    let Some(node) = next.find_mut(id) else {
        debug!(node = %id, "convert skipped: node not found");
        return next;
    };
    let target = match node.kind() {
        NodeKind::BalancedSplitter => NodeKind::UnbalancedSplitter,
        NodeKind::UnbalancedSplitter => NodeKind::BalancedSplitter,
        other => {
            debug!(node = %id, kind = %other, "convert skipped: not a splitter");
            return next;
        }
    };
    let template = create_node(target, defaults);
    node.component = template.component;
    node.own_loss_db = template.own_loss_db;
    node.branches.resize_with(template.branches.len(), Vec::new);
    next
}
