use super::split_table::{
    balanced_loss_db, unbalanced_legs, DEFAULT_BALANCED_RATIO, DEFAULT_UNBALANCED_RATIO,
};
use super::{span_loss_db, Component, LengthUnit, Node, NodeId, NodeKind};
use crate::config::LossDefaults;

pub const ROOT_NODE_ID: &str = "root";
pub const DEFAULT_SOURCE_LABEL: &str = "OLT";

const DEFAULT_SPAN_LENGTH_KM: f64 = 1.0;

/// The root of a fresh project: a lossless source with one empty branch.
pub fn create_source(label: impl Into<String>) -> Node {
    Node::new(NodeId::new(ROOT_NODE_ID), label, 0.0, Component::Source)
}

/// Mint a new node of `kind` with a fresh id and the configured default losses.
pub fn create_node(kind: NodeKind, defaults: &LossDefaults) -> Node {
    let id = NodeId::generate();
    match kind {
        NodeKind::Source => Node::new(id, DEFAULT_SOURCE_LABEL, 0.0, Component::Source),
        NodeKind::FiberSpan => {
            let attenuation = Some(defaults.fiber_attenuation_db_per_km);
            let loss = span_loss_db(
                DEFAULT_SPAN_LENGTH_KM,
                LengthUnit::Kilometers,
                attenuation,
                defaults,
            );
            Node::new(
                id,
                "Fiber",
                loss,
                Component::FiberSpan {
                    length_value: DEFAULT_SPAN_LENGTH_KM,
                    length_unit: LengthUnit::Kilometers,
                    attenuation_db_per_km: attenuation,
                },
            )
        }
        NodeKind::BalancedSplitter => {
            let loss = balanced_loss_db(DEFAULT_BALANCED_RATIO).unwrap_or(0.0)
                + defaults.splitter_extra_loss_db;
            Node::new(
                id,
                "Splitter",
                loss,
                Component::BalancedSplitter {
                    split_ratio: DEFAULT_BALANCED_RATIO.to_string(),
                },
            )
        }
        NodeKind::UnbalancedSplitter => {
            let legs = unbalanced_legs(DEFAULT_UNBALANCED_RATIO);
            Node::new(
                id,
                "Unbalanced Splitter",
                defaults.splitter_extra_loss_db,
                Component::UnbalancedSplitter {
                    split_ratio: DEFAULT_UNBALANCED_RATIO.to_string(),
                    drop_loss_override_db: legs.map(|legs| legs.drop_db),
                    pass_loss_override_db: legs.map(|legs| legs.pass_db),
                },
            )
        }
        NodeKind::Connector => Node::new(
            id,
            "Connector",
            defaults.connector_loss_db,
            Component::Connector,
        ),
        NodeKind::Splice => Node::new(id, "Splice", defaults.splice_loss_db, Component::Splice),
        NodeKind::Terminal => Node::new(
            id,
            "Terminal",
            defaults.terminal_loss_db,
            Component::Terminal,
        ),
    }
}
