use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::config::ToolConfig;
use crate::error::{Result, ToolError};
use crate::questionnaire::node::{QuestionNode, ResultNode, Target};
use crate::questionnaire::resolver::resolve;
use crate::questionnaire::tree::DecisionTree;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Where the walk currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    NotStarted,
    ShowingQuestion(String),
    /// Terminal: the walk reached a result card.
    ShowingResult(ResultNode),
    /// Terminal until `restart`: the tree pointed somewhere that does not exist.
    /// Carries a message safe to show the user.
    Error(String),
}

#[derive(Debug)]
enum TreeSlot {
    NotLoaded,
    Loaded(Arc<DecisionTree>),
    /// Load failed; the tool stays disabled until the process is restarted.
    Failed(ToolError),
}

/// One user's walk through the questionnaire.
///
/// Owns its traversal state outright. The tree is shared read-only, so many
/// sessions can hold the same `Arc<DecisionTree>`.
#[derive(Debug)]
pub struct Session {
    config: ToolConfig,
    tree: TreeSlot,
    state: SessionState,
    /// Questions answered so far, oldest first. Never holds the question
    /// currently on screen.
    history: Vec<String>,
    /// Question id -> label of the answer picked. Last write wins.
    answers: HashMap<String, String>,
    total_steps: usize,
    current_step: usize,
}

impl Session {
    /// A session with no tree yet. Call [`Session::load`] before `start`.
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            tree: TreeSlot::NotLoaded,
            state: SessionState::NotStarted,
            history: Vec::new(),
            answers: HashMap::new(),
            total_steps: 0,
            current_step: 0,
        }
    }

    /// A session over a tree built or loaded elsewhere. The tree gets the
    /// same checks as one read from a file; a rejected tree leaves the
    /// session disabled, as a failed `load` would.
    pub fn with_tree(config: ToolConfig, tree: Arc<DecisionTree>) -> Self {
        let mut session = Self::new(config);
        match tree.check("in-memory tree", &session.config.root_id) {
            Ok(()) => session.install(tree),
            Err(err) => {
                error!("Error installing decision tree: {err}");
                session.tree = TreeSlot::Failed(err);
            }
        }
        session
    }

    fn install(&mut self, tree: Arc<DecisionTree>) {
        self.total_steps = tree.total_steps(&self.config.root_id);
        info!(
            "Tree ready: {} nodes, estimated {} steps from '{}'",
            tree.len(),
            self.total_steps,
            self.config.root_id
        );
        self.tree = TreeSlot::Loaded(tree);
    }

    /// Read the configured tree source. Runs at most once: later calls hand
    /// back the loaded tree, or the original failure without retrying.
    pub fn load(&mut self) -> Result<Arc<DecisionTree>> {
        match &self.tree {
            TreeSlot::Loaded(tree) => return Ok(Arc::clone(tree)),
            TreeSlot::Failed(err) => return Err(err.clone()),
            TreeSlot::NotLoaded => {}
        }

        match DecisionTree::load(&self.config.tree_source, &self.config.root_id) {
            Ok(tree) => {
                let tree = Arc::new(tree);
                self.install(Arc::clone(&tree));
                Ok(tree)
            }
            Err(err) => {
                error!("Error loading decision tree: {err}");
                self.tree = TreeSlot::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn loaded_tree(&self) -> Result<Arc<DecisionTree>> {
        match &self.tree {
            TreeSlot::Loaded(tree) => Ok(Arc::clone(tree)),
            _ => Err(ToolError::TreeNotLoaded),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Show the root question with a clean history.
    pub fn start(&mut self) -> Result<&SessionState> {
        let tree = self.loaded_tree().inspect_err(|_| {
            warn!("Decision tree not loaded yet; cannot start");
        })?;

        self.history.clear();
        self.answers.clear();

        let root = self.config.root_id.clone();
        if let Err(err) = tree.question(&root) {
            return Err(self.fail(err));
        }

        info!("Session started at '{root}'");
        self.state = SessionState::ShowingQuestion(root);
        self.current_step = 1;
        Ok(&self.state)
    }

    /// Pick answer `index` of the current question.
    ///
    /// The destination is resolved before anything is recorded. If it does
    /// not exist the session moves to `Error` and history and answers stay
    /// as they were.
    pub fn choose(&mut self, index: usize) -> Result<&SessionState> {
        let question_id = match &self.state {
            SessionState::ShowingQuestion(id) => id.clone(),
            _ => return Err(ToolError::NotAtQuestion),
        };
        let tree = self.loaded_tree()?;
        let question = match tree.question(&question_id) {
            Ok(q) => q,
            Err(err) => return Err(self.fail(err)),
        };
        let answer = question
            .answers
            .get(index)
            .ok_or_else(|| ToolError::InvalidChoice {
                question_id: question_id.clone(),
                index,
                available: question.answers.len(),
            })?;

        let next = match answer.target() {
            Err(problem) => {
                return Err(self.fail(ToolError::MalformedAnswer {
                    question_id,
                    index,
                    problem,
                }))
            }
            Ok(Target::Question(next_id)) => match tree.question(next_id) {
                Ok(_) => SessionState::ShowingQuestion(next_id.to_string()),
                Err(err) => return Err(self.fail(err)),
            },
            Ok(Target::Outcome(outcome)) => match resolve(outcome, &tree) {
                Ok(result) => SessionState::ShowingResult(result.clone()),
                Err(err) => return Err(self.fail(err)),
            },
        };

        debug!("Answer for '{question_id}': \"{}\"", answer.answer_text);
        self.answers
            .insert(question_id.clone(), answer.answer_text.clone());
        self.history.push(question_id.clone());

        match &next {
            SessionState::ShowingQuestion(next_id) => {
                self.current_step = (self.current_step + 1).min(self.total_steps);
                info!("Transition: {question_id} -> {next_id}");
            }
            SessionState::ShowingResult(result) => {
                self.current_step = self.total_steps;
                info!("Transition: {question_id} -> result \"{}\"", result.title);
            }
            SessionState::NotStarted | SessionState::Error(_) => {}
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Return to the question answered last. Returns `false` without
    /// touching anything when there is nowhere to go back to, including
    /// from a result or error screen.
    pub fn go_back(&mut self) -> bool {
        if !self.can_go_back() {
            debug!("Back ignored in state {:?}", self.state);
            return false;
        }
        let Some(previous) = self.history.pop() else {
            return false;
        };
        info!("Back to '{previous}'");
        self.state = SessionState::ShowingQuestion(previous);
        self.current_step = (self.history.len() + 1).min(self.total_steps.max(1));
        true
    }

    /// Forget everything and show the root question again.
    pub fn restart(&mut self) -> Result<&SessionState> {
        info!("Session restarted");
        self.history.clear();
        self.answers.clear();
        self.state = SessionState::NotStarted;
        self.current_step = 0;
        self.start()
    }

    /// Move to the error state and hand the error back for propagation.
    fn fail(&mut self, err: ToolError) -> ToolError {
        error!("{err}");
        let message = match &err {
            ToolError::NodeNotFound(_) => &self.config.messages.question_error,
            _ => &self.config.messages.outcome_error,
        };
        self.state = SessionState::Error(message.clone());
        err
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn current_question_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::ShowingQuestion(id) => Some(id),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&QuestionNode> {
        let id = self.current_question_id()?;
        self.tree()?.question(id).ok()
    }

    pub fn current_result(&self) -> Option<&ResultNode> {
        match &self.state {
            SessionState::ShowingResult(result) => Some(result),
            _ => None,
        }
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.state, SessionState::ShowingQuestion(_)) && !self.history.is_empty()
    }

    pub fn tree(&self) -> Option<&DecisionTree> {
        match &self.tree {
            TreeSlot::Loaded(tree) => Some(tree),
            _ => None,
        }
    }

    /// Why loading failed, if it did.
    pub fn load_failure(&self) -> Option<&ToolError> {
        match &self.tree {
            TreeSlot::Failed(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeSource;
    use crate::questionnaire::node::{AnswerOption, ResultOutcome, TreeNode};

    /// START -A-> Q1 -B-> inline result "T"
    fn scenario_tree() -> Arc<DecisionTree> {
        Arc::new(DecisionTree::from_nodes([
            (
                "START",
                TreeNode::Question(QuestionNode::new(
                    "Start?",
                    vec![AnswerOption::to_question("A", "Q1")],
                )),
            ),
            (
                "Q1",
                TreeNode::Question(QuestionNode::new(
                    "Q1?",
                    vec![AnswerOption::to_outcome(
                        "B",
                        ResultNode::new("T", "D").into(),
                    )],
                )),
            ),
        ]))
    }

    /// START -> Q1 -> Q2 -> Q3, with shared and dangling exits along the way.
    fn deep_tree() -> Arc<DecisionTree> {
        Arc::new(DecisionTree::from_nodes([
            (
                "START",
                TreeNode::Question(QuestionNode::new(
                    "Who is this for?",
                    vec![
                        AnswerOption::to_question("Myself", "Q1"),
                        AnswerOption::to_outcome("HR", ResultOutcome::shared("HR_INFO")),
                        AnswerOption::to_question("Broken", "MISSING"),
                    ],
                )),
            ),
            (
                "Q1",
                TreeNode::Question(QuestionNode::new(
                    "Discharge?",
                    vec![
                        AnswerOption::to_question("Honorable", "Q2"),
                        AnswerOption::to_outcome("Bad", ResultOutcome::shared("NO_SUCH_RESULT")),
                    ],
                )),
            ),
            (
                "Q2",
                TreeNode::Question(QuestionNode::new(
                    "Disability?",
                    vec![
                        AnswerOption::to_question("Yes", "Q3"),
                        AnswerOption::to_outcome("No", ResultNode::new("5-point", "D").into()),
                    ],
                )),
            ),
            (
                "Q3",
                TreeNode::Question(QuestionNode::new(
                    "30% or more?",
                    vec![AnswerOption::to_outcome("Yes", ResultNode::new("CPS", "D").into())],
                )),
            ),
            (
                "HR_INFO",
                TreeNode::Result(ResultNode::new("HR Professional Resources", "D").with_kind("info")),
            ),
        ]))
    }

    const SMALL_TREE: &str = r#"{"START": {"questionText": "?", "answers": [
        {"answerText": "a", "resultOutcome": {"title": "T", "description": "D"}}
    ]}}"#;

    fn session(tree: Arc<DecisionTree>) -> Session {
        Session::with_tree(ToolConfig::default(), tree)
    }

    #[test]
    fn scenario_walk_to_result() {
        let mut s = session(scenario_tree());
        s.start().unwrap();
        assert_eq!(s.current_question_id(), Some("START"));
        assert_eq!(s.total_steps(), 2);
        assert_eq!(s.current_step(), 1);

        s.choose(0).unwrap();
        assert_eq!(s.current_question_id(), Some("Q1"));
        assert_eq!(s.current_step(), 2);
        assert_eq!(s.history(), ["START"]);

        let state = s.choose(0).unwrap();
        match state {
            SessionState::ShowingResult(result) => assert_eq!(result.title, "T"),
            other => panic!("expected result, got {other:?}"),
        }
        assert_eq!(s.current_step(), s.total_steps());
    }

    #[test]
    fn scenario_back_from_first_follow_up() {
        let mut s = session(scenario_tree());
        s.start().unwrap();
        s.choose(0).unwrap();
        assert!(s.go_back());
        assert_eq!(s.current_question_id(), Some("START"));
        assert!(s.history().is_empty());
        assert_eq!(s.current_step(), 1);
    }

    #[test]
    fn choose_then_back_round_trips_but_keeps_answer() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(0).unwrap();
        let before_id = s.current_question_id().map(str::to_string);
        let before_len = s.history().len();
        let before_step = s.current_step();

        s.choose(0).unwrap();
        assert_eq!(s.current_question_id(), Some("Q2"));
        assert!(s.go_back());

        assert_eq!(s.current_question_id().map(str::to_string), before_id);
        assert_eq!(s.history().len(), before_len);
        assert_eq!(s.current_step(), before_step);
        assert_eq!(s.answers().get("Q1").map(String::as_str), Some("Honorable"));
    }

    #[test]
    fn back_at_root_is_a_no_op() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        let state = s.state().clone();
        assert!(!s.can_go_back());
        assert!(!s.go_back());
        assert_eq!(s.state(), &state);
        assert!(s.history().is_empty());
        assert_eq!(s.current_step(), 1);
    }

    #[test]
    fn back_is_refused_on_result_screen() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(1).unwrap();
        assert!(matches!(s.state(), SessionState::ShowingResult(_)));
        assert!(!s.can_go_back());
        assert!(!s.go_back());
        assert!(matches!(s.state(), SessionState::ShowingResult(_)));
        assert_eq!(s.history(), ["START"]);
    }

    #[test]
    fn step_tracks_history_after_repeated_back() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(0).unwrap();
        s.choose(0).unwrap();
        s.choose(0).unwrap();
        assert_eq!(s.current_question_id(), Some("Q3"));
        assert_eq!(s.current_step(), 4);

        s.go_back();
        s.go_back();
        assert_eq!(s.current_question_id(), Some("Q1"));
        assert_eq!(s.current_step(), s.history().len() + 1);
        assert_eq!(s.current_step(), 2);
    }

    #[test]
    fn shared_result_resolves_and_fills_progress() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(1).unwrap();
        assert_eq!(
            s.current_result().map(|r| r.title.as_str()),
            Some("HR Professional Resources")
        );
        assert_eq!(s.current_step(), s.total_steps());
        assert_eq!(s.answers().get("START").map(String::as_str), Some("HR"));
    }

    #[test]
    fn result_always_sets_step_to_total() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(0).unwrap();
        s.choose(0).unwrap();
        s.choose(1).unwrap();
        assert_eq!(s.total_steps(), 4);
        assert_eq!(s.current_step(), 4);
    }

    #[test]
    fn missing_next_question_moves_to_error_without_committing() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        let err = s.choose(2).unwrap_err();
        assert!(matches!(err, ToolError::NodeNotFound(ref id) if id == "MISSING"));
        assert_eq!(
            s.state(),
            &SessionState::Error(s.config().messages.question_error.clone())
        );
        assert!(s.history().is_empty());
        assert!(s.answers().is_empty());
    }

    #[test]
    fn missing_shared_result_moves_to_error_without_committing() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(0).unwrap();
        let err = s.choose(1).unwrap_err();
        assert!(matches!(err, ToolError::SharedResultNotFound(_)));
        assert!(matches!(s.state(), SessionState::Error(_)));
        assert_eq!(s.history(), ["START"]);
        assert_eq!(s.answers().len(), 1);
        assert!(!s.answers().contains_key("Q1"));
    }

    #[test]
    fn error_state_only_recovers_through_restart() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(2).unwrap_err();
        assert!(matches!(s.choose(0), Err(ToolError::NotAtQuestion)));
        assert!(!s.go_back());

        s.restart().unwrap();
        assert_eq!(s.current_question_id(), Some("START"));
    }

    #[test]
    fn restart_resets_everything() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        s.choose(0).unwrap();
        s.choose(0).unwrap();
        s.choose(1).unwrap();

        s.restart().unwrap();
        assert_eq!(s.current_question_id(), Some("START"));
        assert!(s.history().is_empty());
        assert!(s.answers().is_empty());
        assert_eq!(s.current_step(), 1);
    }

    #[test]
    fn out_of_range_choice_leaves_state_alone() {
        let mut s = session(deep_tree());
        s.start().unwrap();
        match s.choose(7) {
            Err(ToolError::InvalidChoice {
                index, available, ..
            }) => {
                assert_eq!(index, 7);
                assert_eq!(available, 3);
            }
            other => panic!("expected InvalidChoice, got {other:?}"),
        }
        assert_eq!(s.current_question_id(), Some("START"));
    }

    #[test]
    fn choose_before_start_is_rejected() {
        let mut s = session(deep_tree());
        assert!(matches!(s.choose(0), Err(ToolError::NotAtQuestion)));
    }

    #[test]
    fn start_requires_a_loaded_tree() {
        let mut s = Session::new(ToolConfig::default());
        assert!(matches!(s.start(), Err(ToolError::TreeNotLoaded)));
        assert!(matches!(s.restart(), Err(ToolError::TreeNotLoaded)));

        let mut empty = session(Arc::new(DecisionTree::default()));
        assert!(matches!(
            empty.load_failure(),
            Some(ToolError::TreeLoad { reason, .. }) if reason == "tree has no nodes"
        ));
        assert!(matches!(empty.start(), Err(ToolError::TreeNotLoaded)));
    }

    #[test]
    fn malformed_tree_built_in_code_is_rejected_up_front() {
        let tree = DecisionTree::from_nodes([(
            "START",
            TreeNode::Question(QuestionNode::new(
                "Start?",
                vec![AnswerOption {
                    answer_text: "Both".into(),
                    next_question_id: Some("Q1".into()),
                    result_outcome: Some(ResultOutcome::shared("R")),
                }],
            )),
        )]);
        let mut s = session(Arc::new(tree));
        assert!(matches!(
            s.load_failure(),
            Some(ToolError::MalformedAnswer { index: 0, .. })
        ));
        assert!(matches!(s.load(), Err(ToolError::MalformedAnswer { .. })));
        assert!(matches!(s.start(), Err(ToolError::TreeNotLoaded)));
    }

    #[test]
    fn scenario_document_with_bare_nodes_walks_to_result() {
        let raw = r#"{
            "START": {"answers": [{"answerText": "A", "nextQuestionId": "Q1"}]},
            "Q1": {"answers": [{"answerText": "B", "resultOutcome": {"title": "T", "description": "D"}}]}
        }"#;
        let tree = DecisionTree::from_json_str(raw, "scenario", "START").unwrap();
        let mut s = session(Arc::new(tree));
        s.start().unwrap();
        assert_eq!(s.total_steps(), 2);
        s.choose(0).unwrap();
        s.choose(0).unwrap();
        assert_eq!(s.current_result().map(|r| r.title.as_str()), Some("T"));
    }

    #[test]
    fn start_with_missing_root_is_an_error_state() {
        let config = ToolConfig {
            root_id: "INTRO".into(),
            ..ToolConfig::default()
        };
        let mut s = Session::with_tree(config, deep_tree());
        assert!(matches!(s.start(), Err(ToolError::NodeNotFound(_))));
        assert!(matches!(s.state(), SessionState::Error(_)));
    }

    #[test]
    fn failed_load_is_remembered_and_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig {
            tree_source: TreeSource::File(dir.path().join("absent.json")),
            ..ToolConfig::default()
        };
        let mut s = Session::new(config);
        let first = s.load().unwrap_err();
        assert!(matches!(first, ToolError::TreeLoad { .. }));
        assert!(s.load_failure().is_some());

        // A file appearing later does not revive the session.
        std::fs::write(dir.path().join("absent.json"), SMALL_TREE).unwrap();
        let second = s.load().unwrap_err();
        assert_eq!(second.to_string(), first.to_string());
        assert!(matches!(s.start(), Err(ToolError::TreeNotLoaded)));
    }

    #[test]
    fn repeated_load_keeps_the_original_error_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("malformed.json");
        std::fs::write(
            &path,
            r#"{"START": {"questionText": "?", "answers": [{"answerText": "x"}]}}"#,
        )
        .unwrap();
        let mut s = Session::new(ToolConfig {
            tree_source: TreeSource::File(path),
            ..ToolConfig::default()
        });
        for _ in 0..2 {
            match s.load() {
                Err(ToolError::MalformedAnswer { question_id, .. }) => {
                    assert_eq!(question_id, "START")
                }
                other => panic!("expected MalformedAnswer, got {other:?}"),
            }
        }
    }

    #[test]
    fn empty_document_disables_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "{}").unwrap();
        let mut s = Session::new(ToolConfig {
            tree_source: TreeSource::File(path),
            ..ToolConfig::default()
        });
        assert!(matches!(s.load(), Err(ToolError::TreeLoad { .. })));
        assert!(matches!(s.start(), Err(ToolError::TreeNotLoaded)));
    }

    #[test]
    fn bundled_load_then_walk_to_shared_outcome() {
        let mut s = Session::new(ToolConfig::default());
        s.load().unwrap();
        assert_eq!(s.total_steps(), 9);
        s.start().unwrap();
        // For myself -> Discharged -> Honorable or General (SSP first) -> Yes -> Yes
        for index in [0, 0, 0, 0, 0] {
            s.choose(index).unwrap();
        }
        let result = s.current_result().expect("result");
        assert_eq!(
            result.title,
            "0-Point Sole Survivorship Preference (SSP) Potentially Eligible"
        );
        assert_eq!(
            s.history(),
            [
                "START",
                "VETERAN_STATUS",
                "DISCHARGE_TYPE",
                "SSP_DATE_CHECK",
                "SSP_REASON_CHECK"
            ]
        );
    }

    #[test]
    fn sessions_share_one_tree() {
        let tree = deep_tree();
        let mut a = session(Arc::clone(&tree));
        let mut b = session(Arc::clone(&tree));
        a.start().unwrap();
        b.start().unwrap();
        a.choose(0).unwrap();
        assert_eq!(a.current_question_id(), Some("Q1"));
        assert_eq!(b.current_question_id(), Some("START"));
        assert_eq!(Arc::strong_count(&tree), 3);
    }
}
