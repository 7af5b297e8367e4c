use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::AnswerProblem;

/// A single entry in the decision tree: a question to ask, or a shared
/// result referenced by id from several answers.
///
/// A node with an `answers` key is a question; anything else is a result.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Question(QuestionNode),
    Result(ResultNode),
}

impl<'de> Deserialize<'de> for TreeNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("answers").is_some() {
            QuestionNode::deserialize(value)
                .map(Self::Question)
                .map_err(|e| D::Error::custom(format!("question node: {e}")))
        } else {
            ResultNode::deserialize(value)
                .map(Self::Result)
                .map_err(|e| D::Error::custom(format!("result node: {e}")))
        }
    }
}

impl TreeNode {
    /// The `id` field the node carries in the document, if any.
    pub fn declared_id(&self) -> Option<&str> {
        match self {
            Self::Question(q) => q.id.as_deref(),
            Self::Result(r) => r.id.as_deref(),
        }
    }

    pub fn as_question(&self) -> Option<&QuestionNode> {
        match self {
            Self::Question(q) => Some(q),
            Self::Result(_) => None,
        }
    }

    pub fn as_result(&self) -> Option<&ResultNode> {
        match self {
            Self::Result(r) => Some(r),
            Self::Question(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNode {
    /// Must agree with the key the node is stored under.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question_text: String,
    #[serde(default)]
    pub help_text: Option<String>,
    /// Longer collapsible text. Blank lines separate paragraphs.
    #[serde(default)]
    pub explanation_text: Option<String>,
    /// Rendered top to bottom; addressed by index.
    #[serde(default)]
    pub answers: Vec<AnswerOption>,
}

impl QuestionNode {
    pub fn new(question_text: impl Into<String>, answers: Vec<AnswerOption>) -> Self {
        Self {
            id: None,
            question_text: question_text.into(),
            help_text: None,
            explanation_text: None,
            answers,
        }
    }

    pub fn with_help(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn with_explanation(mut self, explanation_text: impl Into<String>) -> Self {
        self.explanation_text = Some(explanation_text.into());
        self
    }
}

/// One choice under a question. Exactly one of `next_question_id` and
/// `result_outcome` must be set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub answer_text: String,
    #[serde(default)]
    pub next_question_id: Option<String>,
    #[serde(default)]
    pub result_outcome: Option<ResultOutcome>,
}

/// Where an answer leads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Question(&'a str),
    Outcome(&'a ResultOutcome),
}

impl AnswerOption {
    pub fn to_question(answer_text: impl Into<String>, next_id: impl Into<String>) -> Self {
        Self {
            answer_text: answer_text.into(),
            next_question_id: Some(next_id.into()),
            result_outcome: None,
        }
    }

    pub fn to_outcome(answer_text: impl Into<String>, outcome: ResultOutcome) -> Self {
        Self {
            answer_text: answer_text.into(),
            next_question_id: None,
            result_outcome: Some(outcome),
        }
    }

    pub fn target(&self) -> Result<Target<'_>, AnswerProblem> {
        match (&self.next_question_id, &self.result_outcome) {
            (Some(id), None) => Ok(Target::Question(id)),
            (None, Some(outcome)) => Ok(Target::Outcome(outcome)),
            (None, None) => Err(AnswerProblem::NoTarget),
            (Some(_), Some(_)) => Err(AnswerProblem::BothTargets),
        }
    }
}

/// A result written inline under the answer, or the id of a shared result
/// node elsewhere in the tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResultOutcome {
    Shared(String),
    Inline(ResultNode),
}

impl ResultOutcome {
    pub fn shared(id: impl Into<String>) -> Self {
        Self::Shared(id.into())
    }
}

impl From<ResultNode> for ResultOutcome {
    fn from(result: ResultNode) -> Self {
        Self::Inline(result)
    }
}

/// Terminal card shown when the walk ends.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultNode {
    #[serde(default)]
    pub id: Option<String>,
    /// Presentation tag ("eligible-5-point", "not-eligible", "info", ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub additional_info: Vec<String>,
    #[serde(default)]
    pub opm_links: Vec<OpmLink>,
}

impl ResultNode {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: String::new(),
            title: title.into(),
            description: description.into(),
            required_documents: Vec::new(),
            additional_info: Vec::new(),
            opm_links: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpmLink {
    pub text: String,
    pub url: String,
}
