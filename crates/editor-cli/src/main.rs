//! Host stand-in for the editor: loads a record's HTML, replays a script of
//! toolbar clicks and typing, and prints what `onChange` receives.

mod script;

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context as _, Result};
use clap::Parser;
use lawsite_editor::{Editor, EditorConfig, EditorEvent, EventKind, ToolbarController};
use tracing_subscriber::EnvFilter;

use crate::script::Step;

#[derive(Parser, Debug)]
#[command(version, about = "Replay an editing script against an HTML document")]
struct Cli {
    /// Initial HTML content of the record
    html: PathBuf,
    /// JSON array of steps to replay
    script: Option<PathBuf>,
    /// Editor configuration as JSON
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print every onChange payload, not only the final document
    #[arg(long)]
    changes: bool,
    /// Print the toolbar state as JSON after each step
    #[arg(long)]
    toolbar: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EditorConfig::from_json_str(&read(path)?)
            .with_context(|| format!("invalid editor config in {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let steps: Vec<Step> = match &cli.script {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("invalid script in {}", path.display()))?,
        None => Vec::new(),
    };

    let mut editor = Editor::from_html(&read(&cli.html)?, config);

    let changes = Rc::new(Cell::new(0usize));
    let print_changes = cli.changes;
    let counter = Rc::clone(&changes);
    editor.subscribe(EventKind::Update, move |_, event| {
        if let EditorEvent::Update { html } = event {
            counter.set(counter.get() + 1);
            if print_changes {
                println!("onChange: {html}");
            }
        }
    });
    editor.subscribe(EventKind::Notice, |_, event| {
        if let EditorEvent::Notice { message } = event {
            eprintln!("notice: {message}");
        }
    });
    let toolbar = ToolbarController::attach(&mut editor);

    let total = steps.len();
    for (ix, step) in steps.into_iter().enumerate() {
        tracing::debug!(step = ix + 1, total, ?step, "replaying");
        step.run(&mut editor);
        if cli.toolbar {
            let state = serde_json::to_string(&toolbar.state())
                .context("failed to serialize toolbar state")?;
            println!("toolbar: {state}");
        }
    }

    tracing::info!(
        steps = total,
        changes = changes.get(),
        renders = toolbar.render_count(),
        characters = editor.character_count(),
        "script finished"
    );
    toolbar.detach(&mut editor);
    println!("{}", editor.html());
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
