use std::path::PathBuf;

/// Id of the node every walk starts from.
pub const ROOT_ID: &str = "START";

// ---------------------------------------------------------------------------
// Tree source
// ---------------------------------------------------------------------------

/// Where the decision tree document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeSource {
    /// The tree JSON compiled into the binary.
    Bundled,
    /// A JSON document on disk.
    File(PathBuf),
}

impl TreeSource {
    /// Human-readable name used in logs and load errors.
    pub fn name(&self) -> String {
        match self {
            Self::Bundled => "bundled decision tree".into(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// User-facing messages
// ---------------------------------------------------------------------------

/// Text shown to the user when something goes wrong. Nothing here may leak
/// node ids or other internals.
#[derive(Debug, Clone)]
pub struct Messages {
    pub question_error: String,
    pub outcome_error: String,
    pub init_failure: String,
    pub not_loaded: String,
    pub disclaimer: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            question_error: "An error occurred while trying to load the question. \
                             Please restart the tool to try again."
                .into(),
            outcome_error: "An error occurred while trying to determine the outcome. \
                            Please restart the tool."
                .into(),
            init_failure: "Could not load the decision tree data required for this tool \
                           to function. Please try again later; the tool may be temporarily \
                           unavailable."
                .into(),
            not_loaded: "The tool is still loading. Please wait a moment and try again.".into(),
            disclaimer: "This tool provides general guidance only and is not an official \
                         determination of Veterans' Preference eligibility. Your hiring \
                         agency makes the final decision."
                .into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub tree_source: TreeSource,
    /// Id of the first question.
    pub root_id: String,
    pub messages: Messages,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tree_source: TreeSource::Bundled,
            root_id: ROOT_ID.into(),
            messages: Messages::default(),
        }
    }
}

impl ToolConfig {
    /// Build a config from positional command-line arguments
    /// (`[tree.json] [root_id]`, program name already stripped).
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let mut config = Self::default();
        if let Some(path) = args.next() {
            config.tree_source = TreeSource::File(PathBuf::from(path.as_ref()));
        }
        if let Some(root) = args.next() {
            config.root_id = root.as_ref().to_string();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_args_uses_bundled_tree_and_start_root() {
        let config = ToolConfig::from_args(Vec::<String>::new());
        assert_eq!(config.tree_source, TreeSource::Bundled);
        assert_eq!(config.root_id, "START");
    }

    #[test]
    fn positional_args_override_source_and_root() {
        let config = ToolConfig::from_args(["trees/alt.json", "INTRO"]);
        assert_eq!(
            config.tree_source,
            TreeSource::File(PathBuf::from("trees/alt.json"))
        );
        assert_eq!(config.root_id, "INTRO");
        assert_eq!(config.tree_source.name(), "trees/alt.json");
    }
}
