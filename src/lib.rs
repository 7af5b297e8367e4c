//! Veterans' Preference eligibility questionnaire.
//!
//! A [`Session`] walks a [`DecisionTree`] of yes/no and multiple-choice
//! questions until it lands on a result card. Rendering is left to the
//! caller; [`terminal`] is the interactive front-end used by the binary.

pub mod config;
pub mod error;
pub mod questionnaire;
pub mod terminal;

pub use config::{Messages, ToolConfig, TreeSource, ROOT_ID};
pub use error::{AnswerProblem, Result, ToolError};
pub use questionnaire::{
    estimate_steps, resolve, AnswerOption, DecisionTree, Explanation, OpmLink, Progress,
    QuestionNode, QuestionView, ResultCard, ResultNode, ResultOutcome, Session, SessionState,
    Summary, Target, TreeIssue, TreeNode, View,
};
