//! The editing session: one live tree, its source power and an undo history.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use tracing::{debug, info};

use crate::budget::{
    collect_terminals, evaluate, summarize_loss_by_kind, AnnotatedNode, TerminalReading,
};
use crate::config::{BudgetConfig, LossDefaults};
use crate::network::{
    convert_splitter_variant, create_node, create_source, insert, remove, update, Node, NodeId,
    NodeKind, NodePatch, DEFAULT_SOURCE_LABEL,
};
use crate::persist::{PersistError, ProjectFile, DEFAULT_PROJECT_NAME};

pub const HISTORY_LIMIT: usize = 20;
pub const DEFAULT_SOURCE_POWER_DBM: f64 = 5.0;

/// Everything an undo step puts back. Thresholds are not part of it.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    project_name: String,
    source_power_dbm: f64,
    root: Node,
    defaults: LossDefaults,
}

#[derive(Debug, Clone, Default)]
struct History {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
}

impl History {
    fn record(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        if self.past.len() > HISTORY_LIMIT {
            self.past.pop_front();
        }
        self.future.clear();
    }
}

#[derive(Debug, Clone)]
pub struct Editor {
    project_name: String,
    source_power_dbm: f64,
    root: Node,
    config: BudgetConfig,
    history: History,
}

impl Editor {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            source_power_dbm: DEFAULT_SOURCE_POWER_DBM,
            root: create_source(DEFAULT_SOURCE_LABEL),
            config,
            history: History::default(),
        }
    }

    /// Start a session from `project`. Thresholds come from `config`, loss
    /// defaults from the project.
    pub fn from_project(
        mut project: ProjectFile,
        mut config: BudgetConfig,
    ) -> Result<Self, PersistError> {
        project.prepare()?;
        config.defaults = project.defaults;
        Ok(Self {
            project_name: project.project_name,
            source_power_dbm: project.source_power_dbm,
            root: project.root,
            config,
            history: History::default(),
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn source_power_dbm(&self) -> f64 {
        self.source_power_dbm
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = name.into();
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Replace defaults and thresholds. Nodes already in the tree keep their
    /// stored losses.
    pub fn set_config(&mut self, config: BudgetConfig) {
        self.config = config;
    }

    pub fn can_undo(&self) -> bool {
        !self.history.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.future.is_empty()
    }

    /// Create a `kind` node with the session defaults and insert it. Returns
    /// the new id, or `None` when the insert did not apply.
    pub fn add_element(
        &mut self,
        parent_id: &NodeId,
        branch_index: usize,
        kind: NodeKind,
        at_index: Option<usize>,
    ) -> Option<NodeId> {
        let mut node = create_node(kind, &self.config.defaults);
        if kind == NodeKind::Terminal {
            node.label = format!("Terminal {}", self.root.count_kind(NodeKind::Terminal) + 1);
        }
        let id = node.id.clone();
        let next = insert(&self.root, parent_id, branch_index, node, at_index);
        self.commit(next).then_some(id)
    }

    pub fn remove_element(&mut self, id: &NodeId) -> bool {
        let next = remove(&self.root, id);
        self.commit(next)
    }

    /// Apply `patch`. Patches that only move a node are not recorded.
    pub fn update_element(&mut self, id: &NodeId, patch: &NodePatch) -> bool {
        let next = update(&self.root, id, patch, &self.config.defaults);
        if patch.is_layout_only() {
            let changed = next != self.root;
            self.root = next;
            return changed;
        }
        self.commit(next)
    }

    pub fn convert_splitter(&mut self, id: &NodeId) -> bool {
        let next = convert_splitter_variant(&self.root, id, &self.config.defaults);
        self.commit(next)
    }

    /// Non-finite values are ignored.
    pub fn set_source_power(&mut self, power_dbm: f64) -> bool {
        if !power_dbm.is_finite() {
            debug!(power_dbm, "source power skipped: not finite");
            return false;
        }
        if power_dbm == self.source_power_dbm {
            return false;
        }
        let snapshot = self.snapshot();
        self.history.record(snapshot);
        self.source_power_dbm = power_dbm;
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.past.pop_back() else {
            return false;
        };
        let current = self.snapshot();
        self.history.future.push(current);
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.future.pop() else {
            return false;
        };
        let current = self.snapshot();
        self.history.past.push_back(current);
        self.restore(next);
        true
    }

    pub fn annotated(&self) -> AnnotatedNode {
        evaluate(&self.root, self.source_power_dbm, &self.config.defaults)
    }

    pub fn terminals(&self) -> Vec<TerminalReading> {
        collect_terminals(&self.annotated())
    }

    pub fn loss_summary(&self) -> BTreeMap<NodeKind, f64> {
        summarize_loss_by_kind(&self.annotated())
    }

    pub fn export_project(&self) -> ProjectFile {
        ProjectFile::new(
            self.project_name.clone(),
            self.source_power_dbm,
            self.root.clone(),
            self.config.defaults,
        )
    }

    /// Replace the live project with `input`. Nothing changes on error.
    pub fn import_json(&mut self, input: &str) -> Result<(), PersistError> {
        let project = ProjectFile::from_json(input)?;
        self.adopt(project);
        Ok(())
    }

    pub fn load_project(&mut self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let project = ProjectFile::load_json(path)?;
        self.adopt(project);
        Ok(())
    }

    pub fn import_project(&mut self, mut project: ProjectFile) -> Result<(), PersistError> {
        project.prepare()?;
        self.adopt(project);
        Ok(())
    }

    /// The replaced state stays on the undo stack.
    fn adopt(&mut self, project: ProjectFile) {
        let snapshot = self.snapshot();
        self.history.record(snapshot);
        info!(
            project = %project.project_name,
            nodes = project.root.node_count(),
            "project imported"
        );
        self.project_name = project.project_name;
        self.source_power_dbm = project.source_power_dbm;
        self.root = project.root;
        self.config.defaults = project.defaults;
    }

    fn commit(&mut self, next: Node) -> bool {
        if next == self.root {
            return false;
        }
        let snapshot = self.snapshot();
        self.history.record(snapshot);
        self.root = next;
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            project_name: self.project_name.clone(),
            source_power_dbm: self.source_power_dbm,
            root: self.root.clone(),
            defaults: self.config.defaults,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.project_name = snapshot.project_name;
        self.source_power_dbm = snapshot.source_power_dbm;
        self.root = snapshot.root;
        self.config.defaults = snapshot.defaults;
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(BudgetConfig::default())
    }
}
