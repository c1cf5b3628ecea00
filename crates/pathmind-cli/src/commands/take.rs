//! The `pathmind take` command: an interactive, timed test session.
//!
//! Commands are read line by line from stdin while the session task keeps
//! the countdown running. When time runs out the answers are submitted
//! automatically, whatever the learner is doing.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;

use pathmind_core::controller::{SessionConfig, SessionController, SessionHandle, SessionOutcome};
use pathmind_core::error::SessionError;
use pathmind_core::model::{format_clock, TestId, TestSummary, UserId};
use pathmind_core::report::ResultsReport;
use pathmind_core::session::{SessionSnapshot, SessionState};

/// Below this many seconds the clock is flagged.
const LOW_TIME_SECS: u64 = 5 * 60;

const HELP: &str = "Commands: n = next, p = previous, a <option> = answer, e = explanation, s = submit, q = quit";

enum Input {
    Next,
    Previous,
    Answer(String),
    Explain,
    Submit,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (line, ""),
    };
    match (cmd, arg) {
        ("n", "") => Some(Input::Next),
        ("p", "") => Some(Input::Previous),
        ("a", opt) if !opt.is_empty() => Some(Input::Answer(opt.to_string())),
        ("e", "") => Some(Input::Explain),
        ("s", "") => Some(Input::Submit),
        ("q", "") => Some(Input::Quit),
        ("h" | "?", "") => Some(Input::Help),
        _ => None,
    }
}

pub async fn execute(
    test_id: TestId,
    user: Option<UserId>,
    time_limit: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, backend) = super::connect(config_path)?;
    let user_id = super::resolve_user(user, &config)?;

    let summary = match backend.test_details(test_id).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!(%test_id, "could not fetch test details: {e:#}");
            None
        }
    };
    let time_limit_secs = time_limit
        .or(summary.as_ref().map(|s| s.time_limit_secs))
        .unwrap_or(config.default_time_limit_secs);
    anyhow::ensure!(time_limit_secs > 0, "time limit must be at least 1 second");

    print_intro(test_id, summary.as_ref(), time_limit_secs);

    let handle = SessionController::start(
        backend,
        SessionConfig {
            time_limit_secs,
            ..SessionConfig::default()
        },
        test_id,
        user_id,
    );

    let loaded = handle
        .wait_until(|s| s.state != SessionState::Loading)
        .await?;
    if loaded.state == SessionState::Errored {
        anyhow::bail!(
            "{}",
            loaded
                .last_error
                .unwrap_or_else(|| "failed to load questions".to_string())
        );
    }

    println!("{HELP}\n");
    render(&loaded);

    if !drive(&handle).await? {
        handle.cancel();
        println!("Test abandoned; answers were not submitted.");
        return Ok(());
    }

    match handle.finished().await {
        SessionOutcome::Submitted { result, view } => {
            let report = ResultsReport::new(test_id, summary.as_ref(), user_id, result);
            println!();
            print!("{}", report.to_text());
            println!("\nResults view: {}", view.route());
            Ok(())
        }
        SessionOutcome::Errored(message) => anyhow::bail!(message),
        SessionOutcome::Cancelled => {
            println!("Session ended before the answers were scored.");
            Ok(())
        }
    }
}

/// Read stdin lines on a plain thread.
///
/// A blocking stdin read cannot be cancelled, so it must not live on the
/// runtime: exit would wait for the next line.
fn spawn_stdin_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Feed learner input to the session until it is scored.
///
/// Returns `false` when the learner quits or input ends with nothing to wait for.
async fn drive(handle: &SessionHandle) -> Result<bool> {
    let mut input = spawn_stdin_reader();
    let mut snapshots = handle.subscribe();
    let (mut last_state, mut last_remaining) = {
        let first = snapshots.borrow_and_update();
        (first.state, first.remaining_secs)
    };
    let mut input_open = true;
    let mut user_submitted = false;
    let mut announced_timeout = false;
    let mut last_error: Option<String> = None;

    loop {
        tokio::select! {
            line = input.recv(), if input_open => {
                let Some(line) = line else {
                    input_open = false;
                    if user_submitted || last_state == SessionState::Submitting {
                        continue;
                    }
                    return Ok(false);
                };
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = parse_input(&line) else {
                    println!("Unknown command '{}'. {HELP}", line.trim());
                    continue;
                };
                match command {
                    Input::Quit => return Ok(false),
                    Input::Help => println!("{HELP}"),
                    Input::Submit => match handle.submit().await {
                        Ok(()) => {
                            user_submitted = true;
                            last_error = None;
                            println!("Submitting your answers...");
                        }
                        Err(e) => report_refusal(e),
                    },
                    other => match apply(handle, other).await {
                        Ok(()) => render(&handle.snapshot()),
                        Err(e) => report_refusal(e),
                    },
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    // the session task ended
                    return Ok(true);
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let previous = std::mem::replace(&mut last_state, snapshot.state);
                let was_remaining = std::mem::replace(&mut last_remaining, snapshot.remaining_secs);
                if snapshot.state == SessionState::Active
                    && crossed_low_time(was_remaining, snapshot.remaining_secs)
                {
                    println!("\nLess than 5 minutes left ({}).", format_clock(snapshot.remaining_secs));
                }
                match (previous, snapshot.state) {
                    (_, SessionState::Submitted) => {
                        // the watch channel may skip the Submitting step
                        if !user_submitted && !announced_timeout {
                            println!("\nTime is up. Your answers were submitted automatically.");
                        }
                        return Ok(true);
                    }
                    (_, SessionState::Errored) => return Ok(true),
                    (SessionState::Active, SessionState::Submitting) if !user_submitted => {
                        announced_timeout = true;
                        println!("\nTime is up. Submitting your answers...");
                    }
                    (_, SessionState::Active)
                        if snapshot.last_error.is_some() && snapshot.last_error != last_error =>
                    {
                        // a submission failed and the session went back to active
                        user_submitted = false;
                        last_error = snapshot.last_error.clone();
                        let error = last_error.as_deref().unwrap_or("submission failed");
                        println!("{error}. Your answers are kept.");
                        if !input_open {
                            return Ok(false);
                        }
                        println!("Type s to try again.");
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(false),
        }
    }
}

async fn apply(handle: &SessionHandle, input: Input) -> Result<(), SessionError> {
    match input {
        Input::Next => {
            if !handle.next().await? {
                println!("Already at the last question. Type s to submit.");
            }
        }
        Input::Previous => {
            if !handle.previous().await? {
                println!("Already at the first question.");
            }
        }
        Input::Answer(option) => handle.answer(option.as_str()).await?,
        Input::Explain => {
            handle.toggle_explanation().await?;
        }
        Input::Submit | Input::Quit | Input::Help => {}
    }
    Ok(())
}

fn report_refusal(err: SessionError) {
    match err {
        SessionError::NotOnLastQuestion { .. } => {
            println!("Go to the last question (n) before submitting.")
        }
        other => println!("Cannot do that: {other}"),
    }
}

fn crossed_low_time(before: u64, now: u64) -> bool {
    before >= LOW_TIME_SECS && now < LOW_TIME_SECS && now > 0
}

fn time_left(remaining_secs: u64) -> String {
    let clock = format_clock(remaining_secs);
    if remaining_secs < LOW_TIME_SECS {
        format!("{clock} left (hurry!)")
    } else {
        format!("{clock} left")
    }
}

fn print_intro(test_id: TestId, summary: Option<&TestSummary>, time_limit_secs: u64) {
    match summary {
        Some(s) => {
            println!("{} (test {test_id})", s.title);
            if !s.description.is_empty() {
                println!("{}", s.description);
            }
            for line in &s.instructions {
                println!("  - {line}");
            }
        }
        None => println!("Test {test_id}"),
    }
    println!("Time limit: {}", format_clock(time_limit_secs));
}

fn render(snapshot: &SessionSnapshot) {
    let Some(question) = &snapshot.question else {
        return;
    };
    println!(
        "\nQuestion {}/{} | {} | {} answered",
        snapshot.index + 1,
        snapshot.total,
        time_left(snapshot.remaining_secs),
        snapshot.answered
    );
    println!("{}", question.text);
    for option in &question.options {
        let marker = if snapshot.selected.as_ref() == Some(&option.id) {
            '*'
        } else {
            ' '
        };
        println!(" {marker} {}) {}", option.id, option.text);
    }
    if snapshot.show_explanation {
        match &question.explanation {
            Some(text) => println!("Explanation: {text}"),
            None => println!("No explanation for this question."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert!(matches!(parse_input("n"), Some(Input::Next)));
        assert!(matches!(parse_input(" p "), Some(Input::Previous)));
        assert!(matches!(parse_input("a b"), Some(Input::Answer(o)) if o == "b"));
        assert!(matches!(parse_input("a   c "), Some(Input::Answer(o)) if o == "c"));
        assert!(matches!(parse_input("s"), Some(Input::Submit)));
        assert!(matches!(parse_input("?"), Some(Input::Help)));
    }

    #[test]
    fn low_time_is_flagged() {
        assert_eq!(time_left(1800), "30:00 left");
        assert_eq!(time_left(300), "05:00 left");
        assert_eq!(time_left(299), "04:59 left (hurry!)");
        assert!(crossed_low_time(300, 299));
        assert!(!crossed_low_time(299, 298));
        assert!(!crossed_low_time(301, 300));
        assert!(!crossed_low_time(300, 0));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(parse_input("a").is_none());
        assert!(parse_input("n 2").is_none());
        assert!(parse_input("submit").is_none());
    }
}
