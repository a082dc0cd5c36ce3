use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use plate_core::{
    Document, Editor, EditorConfig, ElementKind, Path, PlateValue, PluginRegistry, Point, Selection,
    TextUnit,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const DEMO_VALUE: &str = include_str!("../assets/tables.json");

#[derive(Parser, Debug)]
#[command(name = "plate-story", about = "Table-aware editing playground")]
struct Args {
    /// Document to load instead of the bundled table demo.
    #[arg(long)]
    value: Option<PathBuf>,

    /// Editor configuration (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `plate_core=trace`. Overrides `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,

    /// Run without the table plugin.
    #[arg(long)]
    core_only: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the table boundary scenarios and print a JSON report.
    Replay,
    /// Print the normalized document.
    Dump,
    /// Run one command with the caret placed at `--at`.
    Run {
        id: String,
        /// Caret as `path:offset`, e.g. `1,0,1,0:0`.
        #[arg(long, value_parser = parse_point)]
        at: Point,
        /// Command arguments as JSON.
        #[arg(long)]
        args: Option<String>,
    },
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (path, offset) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `path:offset`, got `{s}`"))?;
    let path = path
        .split(',')
        .map(|ix| ix.trim().parse::<usize>())
        .collect::<Result<Path, _>>()
        .map_err(|e| format!("bad path `{path}`: {e}"))?;
    let offset = offset
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("bad offset `{offset}`: {e}"))?;
    Ok(Point::new(path, offset))
}

#[derive(Debug, Serialize)]
struct ScenarioReport {
    name: &'static str,
    before: Option<Selection>,
    after: Option<Selection>,
    document_changed: bool,
}

struct Session {
    document: Document,
    config: EditorConfig,
    core_only: bool,
}

impl Session {
    fn editor(&self, selection: Option<Selection>) -> Editor {
        let registry = if self.core_only {
            PluginRegistry::core()
        } else {
            PluginRegistry::tables()
        };
        Editor::with_config(self.document.clone(), selection, registry, self.config.clone())
    }

    fn first_table(&self) -> Result<Path> {
        self.document
            .children
            .iter()
            .position(|node| node.is_kind(&ElementKind::Table))
            .map(|ix| vec![ix])
            .context("document has no top-level table")
    }

    fn scenario(
        &self,
        name: &'static str,
        selection: Selection,
        edit: impl FnOnce(&mut Editor) -> Result<()>,
    ) -> Result<ScenarioReport> {
        let mut editor = self.editor(None);
        let before_doc = editor.doc().clone();
        editor
            .select(selection)
            .with_context(|| format!("selecting for scenario `{name}`"))?;
        let before = editor.selection().cloned();
        edit(&mut editor).with_context(|| format!("running scenario `{name}`"))?;
        tracing::info!(scenario = name, "replayed");
        Ok(ScenarioReport {
            name,
            before,
            after: editor.selection().cloned(),
            document_changed: editor.doc() != &before_doc,
        })
    }

    fn replay(&self) -> Result<Vec<ScenarioReport>> {
        let table = self.first_table()?;
        let probe = self.editor(None);
        let cell_path = [table.clone(), vec![0, 0]].concat();
        let first_cell = probe.start(&cell_path)?;
        let first_cell_end = probe.end(&cell_path)?;
        let Some(after_table) = probe.after(&table)? else {
            bail!("table at {table:?} is the last block; nothing to select after it");
        };

        let mut reports = vec![
            self.scenario(
                "select_out_of_table_forward",
                Selection::new(first_cell.clone(), after_table.clone()),
                |_| Ok(()),
            )?,
            self.scenario(
                "select_into_table_backward",
                Selection::new(after_table, first_cell.clone()),
                |_| Ok(()),
            )?,
            self.scenario(
                "delete_backward_at_cell_start",
                Selection::collapsed(first_cell.clone()),
                |editor| Ok(editor.delete_backward(TextUnit::Character)?),
            )?,
            self.scenario(
                "delete_forward_at_cell_end",
                Selection::collapsed(first_cell_end),
                |editor| Ok(editor.delete_forward(TextUnit::Character)?),
            )?,
            self.scenario(
                "insert_break_in_cell",
                Selection::collapsed(first_cell),
                |editor| Ok(editor.insert_break()?),
            )?,
        ];

        if let Some(before_table) = probe.before(&table)? {
            reports.push(self.scenario(
                "insert_break_before_table",
                Selection::collapsed(before_table),
                |editor| Ok(editor.insert_break()?),
            )?);
        }

        Ok(reports)
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plate_core=debug")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_session(args: &Args) -> Result<Session> {
    let value = match &args.value {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            PlateValue::from_json_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => PlateValue::from_json_str(DEMO_VALUE).context("parsing bundled demo value")?,
    };

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            EditorConfig::from_json_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => EditorConfig::default(),
    };

    Ok(Session {
        document: value.into_document(),
        config,
        core_only: args.core_only,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let session = load_session(&args)?;

    match args.command.unwrap_or(Command::Replay) {
        Command::Replay => {
            let reports = session.replay()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Command::Dump => {
            let editor = session.editor(None);
            let value = PlateValue::from_document(editor.doc().clone());
            println!("{}", value.to_json_pretty()?);
        }
        Command::Run { id, at, args } => {
            let args = args
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("parsing --args")?;
            let mut editor = session.editor(Some(Selection::collapsed(at)));
            editor
                .run_command(&id, args)
                .with_context(|| format!("running `{id}`"))?;
            let value = PlateValue::from_document(editor.doc().clone());
            println!("{}", value.to_json_pretty()?);
            println!("{}", serde_json::to_string_pretty(&editor.selection())?);
        }
    }

    Ok(())
}
