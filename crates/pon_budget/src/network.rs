//! Distribution tree model: components, branch lists, and tree queries.

mod edit;
mod factory;
pub mod split_table;
mod validate;


use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::LossDefaults;

pub use edit::{convert_splitter_variant, insert, remove, update, NodePatch};
pub use factory::{create_node, create_source, DEFAULT_SOURCE_LABEL, ROOT_NODE_ID};
pub use validate::{normalize_tree, validate_tree, TreeError};

pub const METERS_PER_KILOMETER: f64 = 1000.0;

/// Opaque node identifier, unique across one tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Meters,
    #[default]
    Kilometers,
}

impl LengthUnit {
    pub fn to_kilometers(self, value: f64) -> f64 {
        match self {
            LengthUnit::Meters => value / METERS_PER_KILOMETER,
            LengthUnit::Kilometers => value,
        }
    }

    /// Rewrite `value` (expressed in `self`) so it keeps the same physical length in `to`.
    pub fn convert(self, value: f64, to: LengthUnit) -> f64 {
        match (self, to) {
            (LengthUnit::Meters, LengthUnit::Kilometers) => value / METERS_PER_KILOMETER,
            (LengthUnit::Kilometers, LengthUnit::Meters) => value * METERS_PER_KILOMETER,
            _ => value,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            LengthUnit::Meters => "m",
            LengthUnit::Kilometers => "km",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Source,
    FiberSpan,
    BalancedSplitter,
    UnbalancedSplitter,
    Connector,
    Splice,
    Terminal,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Source,
        NodeKind::FiberSpan,
        NodeKind::BalancedSplitter,
        NodeKind::UnbalancedSplitter,
        NodeKind::Connector,
        NodeKind::Splice,
        NodeKind::Terminal,
    ];

    pub fn is_splitter(self) -> bool {
        matches!(
            self,
            NodeKind::BalancedSplitter | NodeKind::UnbalancedSplitter
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::FiberSpan => "fiber_span",
            NodeKind::BalancedSplitter => "balanced_splitter",
            NodeKind::UnbalancedSplitter => "unbalanced_splitter",
            NodeKind::Connector => "connector",
            NodeKind::Splice => "splice",
            NodeKind::Terminal => "terminal",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    Source,
    FiberSpan {
        #[serde(default)]
        length_value: f64,
        #[serde(default)]
        length_unit: LengthUnit,
        /// dB/km; `None` falls back to the configured default.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attenuation_db_per_km: Option<f64>,
    },
    BalancedSplitter {
        split_ratio: String,
    },
    UnbalancedSplitter {
        split_ratio: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        drop_loss_override_db: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pass_loss_override_db: Option<f64>,
    },
    Connector,
    Splice,
    Terminal,
}

impl Component {
    pub fn kind(&self) -> NodeKind {
        match self {
            Component::Source => NodeKind::Source,
            Component::FiberSpan { .. } => NodeKind::FiberSpan,
            Component::BalancedSplitter { .. } => NodeKind::BalancedSplitter,
            Component::UnbalancedSplitter { .. } => NodeKind::UnbalancedSplitter,
            Component::Connector => NodeKind::Connector,
            Component::Splice => NodeKind::Splice,
            Component::Terminal => NodeKind::Terminal,
        }
    }

    /// Number of output branches this component must carry.
    /// `None` when a balanced ratio has no parseable port count.
    pub fn required_branch_count(&self) -> Option<usize> {
        match self {
            Component::Source => Some(1),
            Component::BalancedSplitter { split_ratio } => split_table::port_count(split_ratio),
            Component::UnbalancedSplitter { .. } => Some(2),
            Component::FiberSpan { .. }
            | Component::Connector
            | Component::Splice
            | Component::Terminal => Some(0),
        }
    }
}

/// Loss of a fiber span computed from its length fields.
pub fn span_loss_db(
    length_value: f64,
    length_unit: LengthUnit,
    attenuation_db_per_km: Option<f64>,
    defaults: &LossDefaults,
) -> f64 {
    let attenuation = attenuation_db_per_km.unwrap_or(defaults.fiber_attenuation_db_per_km);
    length_unit.to_kilometers(length_value) * attenuation
}

/// One output port's chain of components, wired in series.
pub type Branch = Vec<Node>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    /// Insertion loss of the component itself. Derived for fiber spans.
    #[serde(default)]
    pub own_loss_db: f64,
    /// Layout hint only.
    #[serde(default)]
    pub vertical_offset: f64,
    #[serde(flatten)]
    pub component: Component,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<Branch>,
}

/// Where a node sits inside its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePosition {
    pub parent: NodeId,
    pub branch_index: usize,
    pub index: usize,
}

impl Node {
    /// Build a node with the branch array its component requires, all branches empty.
    pub fn new(
        id: NodeId,
        label: impl Into<String>,
        own_loss_db: f64,
        component: Component,
    ) -> Self {
        let branch_count = component.required_branch_count().unwrap_or(0);
        Self {
            id,
            label: label.into(),
            own_loss_db,
            vertical_offset: 0.0,
            component,
            branches: vec![Vec::new(); branch_count],
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.component.kind()
    }

    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        if &self.id == id {
            return Some(self);
        }
        self.children().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        if &self.id == id {
            return Some(self);
        }
        self.branches
            .iter_mut()
            .flat_map(|branch| branch.iter_mut())
            .find_map(|child| child.find_mut(id))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Direct children across all branches, branch order then chain order.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.branches.iter().flat_map(|branch| branch.iter())
    }

    /// Pre-order visit: the node itself, then each branch left to right.
    pub fn walk<'a, F>(&'a self, visit: &mut F)
    where
        F: FnMut(&'a Node),
    {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if node.kind() == kind {
                count += 1;
            }
        });
        count
    }

    /// All ids in pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.walk(&mut |node| ids.push(node.id.clone()));
        ids
    }

    pub fn position_of(&self, id: &NodeId) -> Option<NodePosition> {
        for (branch_index, branch) in self.branches.iter().enumerate() {
            for (index, child) in branch.iter().enumerate() {
                if &child.id == id {
                    return Some(NodePosition {
                        parent: self.id.clone(),
                        branch_index,
                        index,
                    });
                }
                if let Some(position) = child.position_of(id) {
                    return Some(position);
                }
            }
        }
        None
    }
}
