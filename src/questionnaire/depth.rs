use std::collections::HashSet;

use log::warn;

use crate::questionnaire::node::TreeNode;
use crate::questionnaire::tree::DecisionTree;

impl DecisionTree {
    /// Estimated number of questions on the longest walk from `root_id`,
    /// used for the "Step X of Y" display. Never less than 1.
    ///
    /// Only `nextQuestionId` edges extend a path; answers that end in a
    /// result do not. A node seen twice on the same path contributes 0, so
    /// the figure is the longest acyclic path and may undercount.
    pub fn total_steps(&self, root_id: &str) -> usize {
        if self.is_empty() || !self.contains(root_id) {
            return 1;
        }
        self.longest_path(root_id, HashSet::new())
    }

    fn longest_path<'a>(&'a self, node_id: &'a str, mut on_path: HashSet<&'a str>) -> usize {
        if on_path.contains(node_id) {
            warn!("Circular reference detected while counting steps at node '{node_id}'");
            return 0;
        }

        let question = match self.get(node_id) {
            Some(TreeNode::Question(q)) if !q.answers.is_empty() => q,
            // Missing nodes, results and dead-end questions count as one step.
            _ => return 1,
        };

        on_path.insert(node_id);

        let max_child = question
            .answers
            .iter()
            .filter_map(|answer| answer.next_question_id.as_deref())
            .map(|next| self.longest_path(next, on_path.clone()))
            .max();

        match max_child {
            Some(depth) => 1 + depth,
            None => 1,
        }
    }
}

/// Free-function form of [`DecisionTree::total_steps`].
pub fn estimate_steps(tree: &DecisionTree, root_id: &str) -> usize {
    tree.total_steps(root_id)
}
