use std::io;

use anyhow::{Context, Result};
use log::error;

use vetpref::{Session, ToolConfig, TreeSource};

fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   vetpref                 # loading + transitions
    //   RUST_LOG=debug  vetpref                 # + answers and commands
    //   RUST_LOG=warn   vetpref tree.json       # only tree problems
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!(
            "Usage: vetpref [tree.json] [root_id]\n\
             \n\
             Walks the Veterans' Preference questionnaire in the terminal.\n\
             Without arguments the bundled decision tree is used, starting at START.\n\
             \n\
             Logging: set RUST_LOG=debug for verbose output"
        );
        return Ok(());
    }

    let config = ToolConfig::from_args(&args);
    if let TreeSource::File(path) = &config.tree_source {
        println!("Decision tree: {}", path.display());
    }

    let mut session = Session::new(config);
    if let Err(err) = session.load() {
        error!("Tool disabled: {err}");
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    vetpref::terminal::run(&mut session, &mut input, &mut out).context("questionnaire aborted")
}
