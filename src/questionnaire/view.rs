//! What a renderer needs after every operation.
//!
//! The session never draws anything itself. A front-end asks for a [`View`],
//! the [`Progress`] and `can_go_back()`, and draws from those.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::questionnaire::node::{QuestionNode, ResultNode};
use crate::questionnaire::session::{Session, SessionState};

/// A blank line (optionally holding whitespace) separates paragraphs.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph break pattern"));

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    /// The tree has not been loaded yet.
    Uninitialized,
    /// Loading failed; the tool is unusable until the process restarts.
    InitFailure { message: &'a str },
    NotStarted,
    Question(QuestionView<'a>),
    Result(&'a ResultNode),
    Error { message: &'a str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView<'a> {
    pub id: &'a str,
    pub question_text: &'a str,
    pub help_text: Option<&'a str>,
    pub explanation: Option<Explanation<'a>>,
    /// Answer labels in display order; index them for `Session::choose`.
    pub answers: Vec<&'a str>,
}

impl<'a> QuestionView<'a> {
    fn new(id: &'a str, question: &'a QuestionNode) -> Self {
        Self {
            id,
            question_text: &question.question_text,
            help_text: question.help_text.as_deref(),
            explanation: question.explanation_text.as_deref().map(Explanation::parse),
            answers: question
                .answers
                .iter()
                .map(|a| a.answer_text.as_str())
                .collect(),
        }
    }
}

/// Explanation text broken into paragraphs, each a list of soft-wrapped lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation<'a> {
    pub paragraphs: Vec<Vec<&'a str>>,
}

impl<'a> Explanation<'a> {
    pub fn parse(text: &'a str) -> Self {
        let paragraphs = PARAGRAPH_BREAK
            .split(text.trim())
            .filter(|p| !p.trim().is_empty())
            .map(|p| p.lines().map(str::trim_end).collect())
            .collect();
        Self { paragraphs }
    }
}

impl fmt::Display for Explanation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, paragraph) in self.paragraphs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for line in paragraph {
                writeln!(f, "{line}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64 * 100.0
    }
}

// ---------------------------------------------------------------------------
// Printable summary
// ---------------------------------------------------------------------------

/// The answers given on the way to a result, plus the result card, as plain
/// text suitable for printing.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary<'a> {
    /// (question text, chosen answer) in the order they were answered.
    pub responses: Vec<(&'a str, &'a str)>,
    pub result: &'a ResultNode,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Your responses:")?;
        for (question, answer) in &self.responses {
            writeln!(f, "  - {question}")?;
            writeln!(f, "      {answer}")?;
        }
        writeln!(f)?;
        write!(f, "{}", ResultCard(self.result))
    }
}

/// Plain-text rendering of a result node.
pub struct ResultCard<'a>(pub &'a ResultNode);

impl fmt::Display for ResultCard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        writeln!(f, "{}", result.title)?;
        writeln!(f, "{}", "=".repeat(result.title.chars().count()))?;
        writeln!(f, "{}", result.description)?;

        let sections = [
            ("Required Documents:", &result.required_documents),
            ("Additional Information:", &result.additional_info),
        ];
        for (heading, items) in sections {
            if items.is_empty() {
                continue;
            }
            writeln!(f, "\n{heading}")?;
            for item in items {
                writeln!(f, "  * {item}")?;
            }
        }

        if !result.opm_links.is_empty() {
            writeln!(f, "\nOfficial Resources:")?;
            for link in &result.opm_links {
                writeln!(f, "  * {} <{}>", link.text, link.url)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session accessors
// ---------------------------------------------------------------------------

impl Session {
    pub fn view(&self) -> View<'_> {
        let messages = &self.config().messages;
        if self.load_failure().is_some() {
            return View::InitFailure {
                message: &messages.init_failure,
            };
        }
        let Some(tree) = self.tree() else {
            return View::Uninitialized;
        };

        match self.state() {
            SessionState::NotStarted => View::NotStarted,
            SessionState::ShowingQuestion(id) => match tree.question(id) {
                Ok(question) => View::Question(QuestionView::new(id, question)),
                Err(_) => View::Error {
                    message: &messages.question_error,
                },
            },
            SessionState::ShowingResult(result) => View::Result(result),
            SessionState::Error(message) => View::Error {
                message: message.as_str(),
            },
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.current_step(),
            total: self.total_steps(),
        }
    }

    /// Path taken and result reached; `None` until a result is on screen.
    pub fn summary(&self) -> Option<Summary<'_>> {
        let result = self.current_result()?;
        let tree = self.tree()?;
        let responses = self
            .history()
            .iter()
            .filter_map(|id| {
                let question = tree.question(id).ok()?;
                let answer = self.answers().get(id)?;
                Some((question.question_text.as_str(), answer.as_str()))
            })
            .collect();
        Some(Summary { responses, result })
    }
}
