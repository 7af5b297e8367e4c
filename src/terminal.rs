use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::{debug, info};

use crate::error::ToolError;
use crate::questionnaire::{ResultCard, Session, View};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Zero-based answer index.
    Choose(usize),
    Explain,
    Back,
    Restart,
    Print,
    Quit,
    Unknown(String),
}

fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        if n >= 1 {
            return Command::Choose(n - 1);
        }
    }
    match input.to_lowercase().as_str() {
        "?" => Command::Explain,
        "b" | "back" => Command::Back,
        "r" | "restart" => Command::Restart,
        "p" | "print" => Command::Print,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

/// Which kind of screen is up, so the same key can mean different things.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Question,
    Result,
    Error,
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn show_banner(out: &mut impl Write) -> Result<()> {
    writeln!(out, "\n========================================")?;
    writeln!(out, "     VETERANS' PREFERENCE TOOL")?;
    writeln!(out, "========================================")?;
    Ok(())
}

fn show_error_card(out: &mut impl Write, heading: &str, message: &str) -> Result<()> {
    writeln!(out, "\n---------------- {heading} ----------------")?;
    writeln!(out, "{message}")?;
    Ok(())
}

fn draw(session: &Session, out: &mut impl Write) -> Result<Screen> {
    let progress = session.progress();
    match session.view() {
        View::Question(q) => {
            writeln!(out, "\n----------------------------------------")?;
            writeln!(out, "Step {} of {}", progress.current, progress.total)?;
            writeln!(out, "\n{}", q.question_text)?;
            if let Some(help) = q.help_text {
                writeln!(out, "  ({help})")?;
            }
            writeln!(out)?;
            for (i, answer) in q.answers.iter().enumerate() {
                writeln!(out, "  [{}] {answer}", i + 1)?;
            }

            let mut controls = Vec::new();
            if q.explanation.is_some() {
                controls.push("[?] Explain this");
            }
            if session.can_go_back() {
                controls.push("[b] Back");
            }
            controls.extend(["[r] Start over", "[q] Quit"]);
            writeln!(out, "\n  {}", controls.join("   "))?;
            Ok(Screen::Question)
        }
        View::Result(result) => {
            writeln!(out, "\n========================================")?;
            writeln!(out, "Step {} of {}", progress.current, progress.total)?;
            if !result.kind.is_empty() {
                writeln!(out, "[{}]", result.kind)?;
            }
            write!(out, "{}", ResultCard(result))?;
            writeln!(out, "========================================")?;
            writeln!(out, "\n  [p] Print results   [r] Start over   [q] Quit")?;
            Ok(Screen::Result)
        }
        View::Error { message } => {
            show_error_card(out, "Tool Error", message)?;
            writeln!(out, "\n  [r] Start over   [q] Quit")?;
            Ok(Screen::Error)
        }
        View::NotStarted | View::Uninitialized | View::InitFailure { .. } => {
            anyhow::bail!("nothing to draw before the session starts")
        }
    }
}

/// Prompt and read one line. `None` on end of input.
fn read_command(input: &mut impl BufRead, out: &mut impl Write) -> Result<Option<String>> {
    write!(out, "\n> ")?;
    out.flush()?;
    let mut line = String::new();
    let n = input.read_line(&mut line).context("failed to read input")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Wait for the user to accept the disclaimer. Returns `false` if they quit.
fn accept_disclaimer(
    session: &Session,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<bool> {
    writeln!(out, "\nImportant notice:")?;
    writeln!(out, "{}", session.config().messages.disclaimer)?;
    writeln!(out, "\n  [Enter] I understand, continue   [q] Quit")?;
    loop {
        match read_command(input, out)? {
            None => return Ok(false),
            Some(line) if line.is_empty() => return Ok(true),
            Some(line) if parse_command(&line) == Command::Quit => return Ok(false),
            Some(_) => writeln!(out, "  Press Enter to continue or [q] to quit.")?,
        }
    }
}

/// Restart, tolerating a broken root: the error screen shows it.
fn restart(session: &mut Session) -> Result<()> {
    match session.restart() {
        Ok(_) => Ok(()),
        Err(err) if err.is_session_fatal() => Ok(()),
        Err(err) => Err(err).context("could not restart the tool"),
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Run the questionnaire until the user quits or input ends.
///
/// The session should already have been loaded; a failed load is reported
/// to the user and returned as an error.
pub fn run(session: &mut Session, input: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
    show_banner(out)?;

    match session.view() {
        View::InitFailure { message } => {
            show_error_card(out, "Initialization Error", message)?;
            out.flush()?;
            anyhow::bail!("decision tree unavailable");
        }
        View::Uninitialized => {
            show_error_card(out, "Please wait", &session.config().messages.not_loaded)?;
            out.flush()?;
            return Err(ToolError::TreeNotLoaded.into());
        }
        _ => {}
    }

    if !accept_disclaimer(session, input, out)? {
        writeln!(out, "Goodbye.")?;
        return Ok(());
    }
    restart(session)?;

    let mut screen = draw(session, out)?;
    let mut redraw = false;
    loop {
        if redraw {
            screen = draw(session, out)?;
            redraw = false;
        }

        let Some(line) = read_command(input, out)? else {
            info!("Input closed; leaving");
            writeln!(out)?;
            return Ok(());
        };
        let command = parse_command(&line);
        debug!("Command on {screen:?} screen: {command:?}");

        match (screen, command) {
            (_, Command::Quit) => {
                writeln!(out, "Thanks for using the Veterans' Preference Tool.")?;
                return Ok(());
            }
            (_, Command::Restart) => {
                restart(session)?;
                redraw = true;
            }
            (Screen::Question, Command::Choose(index)) => match session.choose(index) {
                Ok(_) => redraw = true,
                Err(ToolError::InvalidChoice { available, .. }) => {
                    writeln!(out, "  Please pick an answer from 1 to {available}.")?;
                }
                Err(err) if err.is_session_fatal() => redraw = true,
                Err(err) => return Err(err).context("could not record answer"),
            },
            (Screen::Question, Command::Explain) => {
                match session.view() {
                    View::Question(q) => match q.explanation {
                        Some(explanation) => write!(out, "\n{explanation}")?,
                        None => writeln!(out, "  There is no further explanation for this question.")?,
                    },
                    _ => redraw = true,
                }
            }
            (Screen::Question, Command::Back) => {
                if session.go_back() {
                    redraw = true;
                } else {
                    writeln!(out, "  You are at the first question.")?;
                }
            }
            (Screen::Result, Command::Print) => {
                if let Some(summary) = session.summary() {
                    writeln!(out, "\n----------------------------------------")?;
                    write!(out, "{summary}")?;
                    writeln!(out, "----------------------------------------")?;
                }
            }
            (_, Command::Unknown(text)) if text.is_empty() => {
                writeln!(out, "  (Please choose an option.)")?;
            }
            _ => writeln!(out, "  That option is not available here.")?,
        }
    }
}
