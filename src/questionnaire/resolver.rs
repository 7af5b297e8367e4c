use log::debug;

use crate::error::{Result, ToolError};
use crate::questionnaire::node::{ResultNode, ResultOutcome, TreeNode};
use crate::questionnaire::tree::DecisionTree;

/// Turn an answer's `resultOutcome` into the card to show.
///
/// Inline results come back as-is. A string is looked up in the tree and
/// must name a result node.
pub fn resolve<'a>(outcome: &'a ResultOutcome, tree: &'a DecisionTree) -> Result<&'a ResultNode> {
    match outcome {
        ResultOutcome::Inline(result) => Ok(result),
        ResultOutcome::Shared(id) => match tree.get(id) {
            Some(TreeNode::Result(result)) => {
                debug!("Resolved shared result '{id}'");
                Ok(result)
            }
            Some(TreeNode::Question(_)) | None => Err(ToolError::SharedResultNotFound(id.clone())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::node::QuestionNode;

    fn tree() -> DecisionTree {
        DecisionTree::from_nodes([
            (
                "sspEligibleOutcome",
                TreeNode::Result(ResultNode::new("SSP", "Sole survivorship").with_kind("info-0-point")),
            ),
            ("START", TreeNode::Question(QuestionNode::new("?", vec![]))),
        ])
    }

    #[test]
    fn inline_result_is_returned_unchanged() {
        let tree = tree();
        let outcome = ResultOutcome::Inline(ResultNode::new("T", "D"));
        let result = resolve(&outcome, &tree).unwrap();
        assert_eq!(result, &ResultNode::new("T", "D"));
    }

    #[test]
    fn shared_result_is_looked_up_by_id() {
        let tree = tree();
        let outcome = ResultOutcome::shared("sspEligibleOutcome");
        let result = resolve(&outcome, &tree).unwrap();
        assert_eq!(result.title, "SSP");
        assert_eq!(result.kind, "info-0-point");
    }

    #[test]
    fn missing_shared_result_fails() {
        let tree = tree();
        match resolve(&ResultOutcome::shared("HR_INFO"), &tree) {
            Err(ToolError::SharedResultNotFound(id)) => assert_eq!(id, "HR_INFO"),
            other => panic!("expected SharedResultNotFound, got {other:?}"),
        }
    }

    #[test]
    fn shared_id_naming_a_question_fails() {
        let tree = tree();
        assert!(matches!(
            resolve(&ResultOutcome::shared("START"), &tree),
            Err(ToolError::SharedResultNotFound(_))
        ));
    }
}
