//! REPL – interactive operator console for a running Kobuki component.
//!
//! Supported commands:
//!   vel <linear> <angular>   – write `targetVelocity`
//!   stop                     – shorthand for `vel 0 0`
//!   pose <x> <y> <heading>   – write `poseUpdate`
//!   dock                     – shorthand for `cmd DOCK`
//!   cmd <text>               – write `command` verbatim
//!   status                   – show the latest outbound values
//!   help                     – show this list
//!   quit | exit              – stop the component and exit

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use kobuki_rtc::InboundWriters;
use kobuki_types::{KobukiError, RobotCommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::monitor::StatusBoard;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Velocity { linear: f64, angular: f64 },
    Pose { x: f64, y: f64, heading: f64 },
    Text(String),
    Status,
    Help,
    Quit,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };

    let cmd = match word {
        "vel" => {
            let [linear, angular] = parse_numbers(rest, "vel <linear> <angular>")?;
            ReplCommand::Velocity { linear, angular }
        }
        "stop" => ReplCommand::Velocity {
            linear: 0.0,
            angular: 0.0,
        },
        "pose" => {
            let [x, y, heading] = parse_numbers(rest, "pose <x> <y> <heading>")?;
            ReplCommand::Pose { x, y, heading }
        }
        "dock" => ReplCommand::Text(RobotCommand::DOCK.to_string()),
        "cmd" => {
            if rest.is_empty() {
                return Err("usage: cmd <text>".to_string());
            }
            ReplCommand::Text(rest.to_string())
        }
        "status" => ReplCommand::Status,
        "help" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(cmd))
}

fn split_word(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((line, "")),
    }
}

fn parse_numbers<const N: usize>(args: &str, usage: &str) -> Result<[f64; N], String> {
    let values: Vec<f64> = args
        .split_whitespace()
        .map(|a| a.parse::<f64>().map_err(|_| format!("'{a}' is not a number")))
        .collect::<Result<_, _>>()?;
    values
        .try_into()
        .map_err(|_| format!("usage: {usage}"))
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits cleanly.
/// `quit`, Ctrl-C and EOF raise it.
pub fn run(writers: &InboundWriters, board: &StatusBoard, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}: {}", "Console unavailable".red(), e);
            shutdown.store(true, Ordering::SeqCst);
            return;
        }
    };

    while !shutdown.load(Ordering::SeqCst) {
        let line = match editor.readline("kobuki> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };
        note_history(editor.add_history_entry(line.as_str()));

        match parse(&line) {
            Ok(None) => {}
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(ReplCommand::Help)) => cmd_help(),
            Ok(Some(ReplCommand::Status)) => cmd_status(board),
            Ok(Some(cmd)) => {
                if let Err(e) = send(writers, &cmd) {
                    warn!(error = %e, "failed to write to in-port");
                    println!("{}: {}", "Port error".red(), e);
                }
            }
            Err(msg) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                msg.yellow(),
                "help".bold()
            ),
        }
    }

    println!("{}", "Goodbye.".green());
    shutdown.store(true, Ordering::SeqCst);
}

/// Report whether a history entry was stored; failures are logged at debug.
fn note_history(result: rustyline::Result<bool>) -> bool {
    match result {
        Ok(added) => added,
        Err(e) => {
            debug!(error = %e, "history entry not recorded");
            false
        }
    }
}

fn send(writers: &InboundWriters, cmd: &ReplCommand) -> Result<(), KobukiError> {
    match cmd {
        ReplCommand::Velocity { linear, angular } => writers.send_velocity(*linear, *angular),
        ReplCommand::Pose { x, y, heading } => writers.send_pose(*x, *y, *heading),
        ReplCommand::Text(text) => writers.send_command(text.clone()),
        ReplCommand::Status | ReplCommand::Help | ReplCommand::Quit => Ok(()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_help() {
    println!();
    println!("{}", "Kobuki RTC Commands".bold().underline());
    println!("  {}  – set target velocity", "vel <linear> <angular>".bold().cyan());
    println!("  {}                    – zero the target velocity", "stop".bold().cyan());
    println!("  {}  – override odometry", "pose <x> <y> <heading>".bold().cyan());
    println!("  {}                    – start auto-docking", "dock".bold().cyan());
    println!("  {}              – send a raw text command", "cmd <text>".bold().cyan());
    println!("  {}                  – latest published state", "status".bold().cyan());
    println!("  {}             – stop and exit", "quit  exit".bold().cyan());
    println!();
}

fn cmd_status(board: &StatusBoard) {
    let latest = board.snapshot();
    match serde_json::to_string_pretty(&latest) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("{}: {}", "Cannot render status".red(), e),
    }
}
