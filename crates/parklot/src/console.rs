// ── Administrative console ──
//
// Line-oriented commands on stdin while the coordinator runs. Reads lot
// state only through published snapshots; never touches the coordinator.

use std::io::BufRead;
use std::sync::Arc;

use parklot_core::LotSnapshot;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::output::{self, DestinationRow, SpaceRow};

const HELP: &str = "\
Commands:
  h  show this help
  d  list destinations and their suggested space
  s  list parking spaces
  q  leave the console (the coordinator keeps running)";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Help,
    Destinations,
    Spaces,
    Quit,
    Empty,
    Unknown(String),
}

fn parse(line: &str) -> ConsoleCommand {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => ConsoleCommand::Empty,
        "h" | "help" | "?" => ConsoleCommand::Help,
        "d" => ConsoleCommand::Destinations,
        "s" => ConsoleCommand::Spaces,
        "q" | "quit" => ConsoleCommand::Quit,
        other => ConsoleCommand::Unknown(other.to_owned()),
    }
}

/// Render the reply to one console command. `None` ends the session.
fn respond(command: &ConsoleCommand, snapshot: &LotSnapshot, color: bool) -> Option<String> {
    match command {
        ConsoleCommand::Help => Some(HELP.to_owned()),
        ConsoleCommand::Destinations => {
            let rows: Vec<DestinationRow> = snapshot
                .destinations
                .iter()
                .map(|d| DestinationRow::new(d, color))
                .collect();
            Some(output::render_table(&rows))
        }
        ConsoleCommand::Spaces => {
            let rows: Vec<SpaceRow> = snapshot
                .spaces
                .iter()
                .map(|s| SpaceRow::new(s, color))
                .collect();
            Some(format!(
                "{}\n{} of {} available (as of {})",
                output::render_table(&rows),
                snapshot.available_count(),
                snapshot.spaces.len(),
                snapshot.taken_at.format("%H:%M:%S"),
            ))
        }
        ConsoleCommand::Quit => None,
        ConsoleCommand::Empty => Some(String::new()),
        ConsoleCommand::Unknown(other) => Some(format!("unknown command '{other}', h for help")),
    }
}

/// Stdin lines, read on a plain thread so a pending read never holds up
/// runtime shutdown.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Serve console commands until `q` or end of input.
pub async fn run(snapshots: watch::Receiver<Arc<LotSnapshot>>, color: bool) {
    let mut lines = stdin_lines();
    output::print_output(HELP, false);

    while let Some(line) = lines.recv().await {
        let command = parse(&line);
        debug!(?command, "console command");
        let snapshot = Arc::clone(&snapshots.borrow());
        match respond(&command, &snapshot, color) {
            Some(reply) => output::print_output(&reply, false),
            None => break,
        }
    }
    output::print_output("console closed; press Ctrl-C to stop the coordinator", false);
}
