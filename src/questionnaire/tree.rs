use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::config::TreeSource;
use crate::error::{Result, ToolError};
use crate::questionnaire::node::{QuestionNode, ResultOutcome, Target, TreeNode};

/// Decision tree shipped with the binary.
const BUNDLED_TREE: &str = include_str!("../../data/decision-tree.json");

/// The full questionnaire: a map of node-id -> TreeNode.
///
/// Read-only once loaded; sessions share it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DecisionTree {
    nodes: HashMap<String, TreeNode>,
}

/// Something odd found while checking a freshly loaded tree.
#[derive(Debug)]
pub enum TreeIssue {
    /// Rejects the tree.
    Fatal(ToolError),
    /// Logged and kept; the walk reports it if a user ever reaches it.
    Warning(String),
}

impl DecisionTree {
    /// Build a tree from `(id, node)` pairs.
    pub fn from_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (S, TreeNode)>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(|(id, n)| (id.into(), n)).collect(),
        }
    }

    /// Parse and validate a tree document. `source_name` only labels errors.
    pub fn from_json_str(raw: &str, source_name: &str, root_id: &str) -> Result<Self> {
        let tree: DecisionTree =
            serde_json::from_str(raw).map_err(|e| ToolError::load(source_name, e))?;
        tree.check(source_name, root_id)?;
        Ok(tree)
    }

    pub fn from_file(path: &Path, root_id: &str) -> Result<Self> {
        let name = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|e| ToolError::load(&name, e))?;
        Self::from_json_str(&raw, &name, root_id)
    }

    pub fn bundled(root_id: &str) -> Result<Self> {
        Self::from_json_str(BUNDLED_TREE, &TreeSource::Bundled.name(), root_id)
    }

    pub fn load(source: &TreeSource, root_id: &str) -> Result<Self> {
        info!("Loading decision tree from {}", source.name());
        let tree = match source {
            TreeSource::Bundled => Self::bundled(root_id)?,
            TreeSource::File(path) => Self::from_file(path, root_id)?,
        };
        info!("Decision tree loaded: {} nodes", tree.len());
        Ok(tree)
    }

    /// Refuse a tree with no nodes, run `validate`, log the warnings, and
    /// fail on the first fatal issue. Trees built in code go through this
    /// too, from `Session::with_tree`.
    pub fn check(&self, source_name: &str, root_id: &str) -> Result<()> {
        if self.is_empty() {
            warn!("Rejecting decision tree from {source_name}: no nodes");
            return Err(ToolError::load(source_name, "tree has no nodes"));
        }
        let mut fatal = None;
        for issue in self.validate(root_id) {
            match issue {
                TreeIssue::Warning(msg) => warn!("{msg}"),
                TreeIssue::Fatal(err) => {
                    warn!("Rejecting decision tree: {err}");
                    fatal.get_or_insert(err);
                }
            }
        }
        match fatal {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn get_node(&self, id: &str) -> Result<&TreeNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| ToolError::NodeNotFound(id.to_string()))
    }

    /// Look up `id` and require it to be a question.
    pub fn question(&self, id: &str) -> Result<&QuestionNode> {
        self.get_node(id)?
            .as_question()
            .ok_or_else(|| ToolError::NodeNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check the tree for structural problems.
    ///
    /// Malformed answers and id/key disagreements are fatal. Dangling
    /// references, a missing root, empty questions and unreachable nodes are
    /// only warnings.
    pub fn validate(&self, root_id: &str) -> Vec<TreeIssue> {
        let mut issues = Vec::new();

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();

        for key in ids {
            let node = &self.nodes[key];
            if let Some(id) = node.declared_id() {
                if id != key.as_str() {
                    issues.push(TreeIssue::Fatal(ToolError::IdMismatch {
                        key: key.clone(),
                        id: id.to_string(),
                    }));
                }
            }

            let Some(question) = node.as_question() else {
                continue;
            };
            if question.answers.is_empty() {
                issues.push(TreeIssue::Warning(format!(
                    "Question '{key}' has no answers; users reaching it cannot continue"
                )));
            }
            for (index, answer) in question.answers.iter().enumerate() {
                match answer.target() {
                    Err(problem) => issues.push(TreeIssue::Fatal(ToolError::MalformedAnswer {
                        question_id: key.clone(),
                        index,
                        problem,
                    })),
                    Ok(Target::Question(next)) => {
                        if !matches!(self.get(next), Some(TreeNode::Question(_))) {
                            issues.push(TreeIssue::Warning(format!(
                                "Answer {index} of '{key}' leads to missing question '{next}'"
                            )));
                        }
                    }
                    Ok(Target::Outcome(ResultOutcome::Shared(shared))) => {
                        if !matches!(self.get(shared), Some(TreeNode::Result(_))) {
                            issues.push(TreeIssue::Warning(format!(
                                "Answer {index} of '{key}' names missing shared result '{shared}'"
                            )));
                        }
                    }
                    Ok(Target::Outcome(ResultOutcome::Inline(_))) => {}
                }
            }
        }

        if !self.is_empty() && !self.contains(root_id) {
            issues.push(TreeIssue::Warning(format!(
                "Root node '{root_id}' is missing from the decision tree"
            )));
        }

        let reachable = self.reachable_from(root_id);
        let mut orphans: Vec<&str> = self
            .nodes
            .keys()
            .map(String::as_str)
            .filter(|id| !reachable.contains(id))
            .collect();
        orphans.sort_unstable();
        if self.contains(root_id) && !orphans.is_empty() {
            debug!("Unreachable nodes: {orphans:?}");
            issues.push(TreeIssue::Warning(format!(
                "{} node(s) unreachable from '{root_id}': {}",
                orphans.len(),
                orphans.join(", ")
            )));
        }

        issues
    }

    /// Every node id reachable from `root_id`, shared results included.
    fn reachable_from<'a>(&'a self, root_id: &'a str) -> HashSet<&'a str> {
        let mut seen = HashSet::new();
        let mut stack = vec![root_id];
        while let Some(id) = stack.pop() {
            if !self.contains(id) || !seen.insert(id) {
                continue;
            }
            let Some(question) = self.nodes[id].as_question() else {
                continue;
            };
            for answer in &question.answers {
                match answer.target() {
                    Ok(Target::Question(next)) => stack.push(next),
                    Ok(Target::Outcome(ResultOutcome::Shared(shared))) => stack.push(shared),
                    _ => {}
                }
            }
        }
        seen
    }
}
