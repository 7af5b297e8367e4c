//! Decision-tree questionnaire engine: the tree model, step estimation,
//! result lookup, and the per-user traversal session.

pub mod depth;
pub mod node;
pub mod resolver;
pub mod session;
pub mod tree;
pub mod view;

pub use depth::estimate_steps;
pub use node::{AnswerOption, OpmLink, QuestionNode, ResultNode, ResultOutcome, Target, TreeNode};
pub use resolver::resolve;
pub use session::{Session, SessionState};
pub use tree::{DecisionTree, TreeIssue};
pub use view::{Explanation, Progress, QuestionView, ResultCard, Summary, View};
