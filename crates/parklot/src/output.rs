//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use parklot_core::{DestinationView, SpaceView};
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: {e}"))
}

// ── Lot rows ─────────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct DestinationRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "X")]
    pub x: i32,
    #[tabled(rename = "Y")]
    pub y: i32,
    #[tabled(rename = "Best space")]
    pub best_space: String,
}

impl DestinationRow {
    pub fn new(view: &DestinationView, color: bool) -> Self {
        let best_space = match (&view.best_space, color) {
            (Some(id), _) => id.clone(),
            (None, true) => "lot full".red().to_string(),
            (None, false) => "lot full".into(),
        };
        Self {
            id: view.id.clone(),
            x: view.x,
            y: view.y,
            best_space,
        }
    }
}

#[derive(Tabled)]
pub struct SpaceRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "X")]
    pub x: i32,
    #[tabled(rename = "Y")]
    pub y: i32,
    #[tabled(rename = "Controller")]
    pub controller: String,
    #[tabled(rename = "State")]
    pub state: String,
}

impl SpaceRow {
    pub fn new(view: &SpaceView, color: bool) -> Self {
        let label = if view.available { "Available" } else { "Occupied" };
        let state = match (view.available, color) {
            (true, true) => label.green().to_string(),
            (false, true) => label.yellow().to_string(),
            (_, false) => label.to_owned(),
        };
        Self {
            id: view.id.clone(),
            x: view.x,
            y: view.y,
            controller: view.controller_id.clone(),
            state,
        }
    }
}
