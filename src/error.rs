//! Error types for the preference tool

use thiserror::Error;

/// Result type alias using ToolError
pub type Result<T> = std::result::Result<T, ToolError>;

/// What is wrong with an answer option that does not name exactly one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerProblem {
    /// Neither `nextQuestionId` nor `resultOutcome` is set.
    NoTarget,
    /// Both `nextQuestionId` and `resultOutcome` are set.
    BothTargets,
}

impl std::fmt::Display for AnswerProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTarget => write!(f, "has neither nextQuestionId nor resultOutcome"),
            Self::BothTargets => write!(f, "has both nextQuestionId and resultOutcome"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tree document could not be read or parsed
    #[error("failed to load decision tree from {source_name}: {reason}")]
    TreeLoad { source_name: String, reason: String },

    /// An operation ran before the tree finished loading
    #[error("decision tree is not loaded")]
    TreeNotLoaded,

    /// A `nextQuestionId` (or the root id) points at nothing
    #[error("node '{0}' not found in decision tree")]
    NodeNotFound(String),

    /// A string `resultOutcome` points at nothing usable
    #[error("shared result '{0}' not found in decision tree")]
    SharedResultNotFound(String),

    #[error("answer {index} of question '{question_id}' {problem}")]
    MalformedAnswer {
        question_id: String,
        index: usize,
        problem: AnswerProblem,
    },

    #[error("node keyed '{key}' declares id '{id}'")]
    IdMismatch { key: String, id: String },

    /// Caller picked an answer index the current question does not have
    #[error("question '{question_id}' has {available} answers, index {index} is out of range")]
    InvalidChoice {
        question_id: String,
        index: usize,
        available: usize,
    },

    #[error("no question is being shown")]
    NotAtQuestion,
}

impl ToolError {
    pub fn load(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::TreeLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Dangling references end the current session; only a restart recovers.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::NodeNotFound(_) | Self::SharedResultNotFound(_) | Self::MalformedAnswer { .. }
        )
    }
}
