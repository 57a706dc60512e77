pub mod budget;
pub mod config;
pub mod network;
pub mod persist;
pub mod session;

// Tree model and structural edits
pub use network::{
    convert_splitter_variant, create_node, create_source, insert, normalize_tree, remove,
    span_loss_db, update, validate_tree, Branch, Component, LengthUnit, Node, NodeId, NodeKind,
    NodePatch, NodePosition, TreeError, DEFAULT_SOURCE_LABEL, METERS_PER_KILOMETER, ROOT_NODE_ID,
};

pub use network::split_table::{
    balanced_loss_db, balanced_ratios, port_count, unbalanced_legs, unbalanced_ratios,
    UnbalancedLegs, DEFAULT_BALANCED_RATIO, DEFAULT_UNBALANCED_RATIO,
};

// Power propagation and aggregation
pub use budget::{
    branch_label, collect_terminals, evaluate, summarize_loss_by_kind, total_loss_db,
    worst_terminal, AnnotatedNode, SignalGrade, TerminalReading, MAIN_LINE_PATH, PATH_SEPARATOR,
};

pub use config::{
    BudgetConfig, ConfigError, LossDefaults, SignalThresholds, DEFAULT_CONFIG_FILE_NAME,
    ENV_CONNECTOR_LOSS, ENV_CRITICAL_BELOW_DBM, ENV_FIBER_ATTENUATION, ENV_MARGINAL_BELOW_DBM,
    ENV_SPLICE_LOSS, ENV_SPLITTER_EXTRA_LOSS, ENV_TERMINAL_LOSS,
};

pub use persist::{PersistError, ProjectFile, DEFAULT_PROJECT_NAME, PROJECT_FORMAT_VERSION};

pub use session::{Editor, DEFAULT_SOURCE_POWER_DBM, HISTORY_LIMIT};
