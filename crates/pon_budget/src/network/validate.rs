use std::collections::BTreeSet;

use thiserror::Error;

use super::{span_loss_db, Component, Node, NodeId, NodeKind};
use crate::config::LossDefaults;

/// A structural invariant the tree violates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("root node {id} is a {kind}, expected a source")]
    RootNotSource { id: NodeId, kind: NodeKind },
    #[error("node {id} is a second source")]
    NestedSource { id: NodeId },
    #[error("duplicate node id {id}")]
    DuplicateId { id: NodeId },
    #[error("node {id} ({kind}) has {actual} branches, expected {expected}")]
    BranchCount {
        id: NodeId,
        kind: NodeKind,
        expected: usize,
        actual: usize,
    },
    #[error("node {id} has a non-finite {field}")]
    NonFiniteValue { id: NodeId, field: &'static str },
}

/// Check every invariant a live tree must hold.
pub fn validate_tree(root: &Node) -> Result<(), TreeError> {
    if root.kind() != NodeKind::Source {
        return Err(TreeError::RootNotSource {
            id: root.id.clone(),
            kind: root.kind(),
        });
    }
    let mut seen = BTreeSet::new();
    validate_node(root, true, &mut seen)
}

fn validate_node<'a>(
    node: &'a Node,
    is_root: bool,
    seen: &mut BTreeSet<&'a NodeId>,
) -> Result<(), TreeError> {
    if !is_root && node.kind() == NodeKind::Source {
        return Err(TreeError::NestedSource {
            id: node.id.clone(),
        });
    }
    if !seen.insert(&node.id) {
        return Err(TreeError::DuplicateId {
            id: node.id.clone(),
        });
    }
    if let Some(expected) = node.component.required_branch_count() {
        if node.branches.len() != expected {
            return Err(TreeError::BranchCount {
                id: node.id.clone(),
                kind: node.kind(),
                expected,
                actual: node.branches.len(),
            });
        }
    }
    for (field, value) in numeric_fields(node) {
        if !value.is_finite() {
            return Err(TreeError::NonFiniteValue {
                id: node.id.clone(),
                field,
            });
        }
    }
    for child in node.children() {
        validate_node(child, false, seen)?;
    }
    Ok(())
}

fn numeric_fields(node: &Node) -> Vec<(&'static str, f64)> {
    let mut fields = vec![
        ("own_loss_db", node.own_loss_db),
        ("vertical_offset", node.vertical_offset),
    ];
    match &node.component {
        Component::FiberSpan {
            length_value,
            attenuation_db_per_km,
            ..
        } => {
            fields.push(("length_value", *length_value));
            if let Some(attenuation) = attenuation_db_per_km {
                fields.push(("attenuation_db_per_km", *attenuation));
            }
        }
        Component::UnbalancedSplitter {
            drop_loss_override_db,
            pass_loss_override_db,
            ..
        } => {
            if let Some(drop) = drop_loss_override_db {
                fields.push(("drop_loss_override_db", *drop));
            }
            if let Some(pass) = pass_loss_override_db {
                fields.push(("pass_loss_override_db", *pass));
            }
        }
        _ => {}
    }
    fields
}

/// Fill in what an older or hand-written file may omit: absent branch
/// arrays get the kind's port count, and fiber losses are re-derived.
pub fn normalize_tree(node: &mut Node, defaults: &LossDefaults) {
    if node.branches.is_empty() {
        if let Some(count) = node.component.required_branch_count() {
            node.branches = vec![Vec::new(); count];
        }
    }
    if let Component::FiberSpan {
        length_value,
        length_unit,
        attenuation_db_per_km,
    } = &node.component
    {
        node.own_loss_db =
            span_loss_db(*length_value, *length_unit, *attenuation_db_per_km, defaults);
    }
    for branch in &mut node.branches {
        for child in branch {
            normalize_tree(child, defaults);
        }
    }
}
