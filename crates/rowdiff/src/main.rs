//! rowdiff CLI - render a unified diff as a unified or split view

mod config;
mod syntax;
mod views;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use config::Config;
use ratatui::{backend::CrosstermBackend, Terminal, TerminalOptions, Viewport};
use rowdiff_core::fetch::{load_model, DiffInput, DiffSource, FetchError, FetchKey};
use rowdiff_core::flatten::Layout;
use rowdiff_core::model::DiffStat;
use rowdiff_core::tokens::{Token, TokenCache};
use rowdiff_core::view::{DiffView, VisibleSlice};
use serde::Serialize;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use syntax::SyntectHighlighter;
use tracing_subscriber::EnvFilter;
use views::RenderContext;

/// How long to wait for syntax refinement before giving up on colors
const REFINE_BUDGET: Duration = Duration::from_millis(300);

/// Used when the terminal size is unknown
const FALLBACK_SIZE: (u16, u16) = (120, 40);

#[derive(Parser, Debug)]
#[command(name = "rowdiff")]
#[command(author, version, about = "Render a unified diff as a unified or split view")]
struct Args {
    /// Diff file to read; stdin when omitted or "-"
    input: Option<PathBuf>,

    /// Row layout (overrides the config file)
    #[arg(short, long)]
    layout: Option<CliLayout>,

    /// Wrap long lines instead of truncating them
    #[arg(short, long, conflicts_with = "no_wrap")]
    wrap: bool,

    /// Truncate long lines
    #[arg(long)]
    no_wrap: bool,

    /// Content columns per side (0 derives it from the terminal width)
    #[arg(long, value_name = "COLS")]
    width: Option<usize>,

    /// Viewport height in rows
    #[arg(long, value_name = "ROWS")]
    height: Option<usize>,

    /// First visual row to show
    #[arg(long, default_value = "0", value_name = "ROW")]
    scroll: usize,

    /// Draw without syntax colors
    #[arg(long)]
    no_syntax: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Only show these paths (repeatable)
    #[arg(long = "file", value_name = "PATH")]
    files: Vec<String>,

    /// Rename metadata, as printed by `git diff --name-status -M`
    #[arg(long, value_name = "FILE")]
    name_status: Option<PathBuf>,

    /// Per-file counts, as printed by `git diff --numstat`
    #[arg(long, value_name = "FILE")]
    numstat: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLayout {
    Unified,
    Split,
}

impl From<CliLayout> for Layout {
    fn from(layout: CliLayout) -> Self {
        match layout {
            CliLayout::Unified => Layout::Unified,
            CliLayout::Split => Layout::Split,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Styled inline render on a terminal, plain text otherwise
    Text,
    /// The visible slice as JSON
    Json,
}

/// Reads the diff and its optional metadata from files or stdin
struct InputSource {
    input: Option<PathBuf>,
    name_status: Option<PathBuf>,
    numstat: Option<PathBuf>,
}

impl InputSource {
    fn commit_id(&self) -> String {
        match self.input.as_deref() {
            Some(path) if path != Path::new("-") => path.display().to_string(),
            _ => "stdin".to_string(),
        }
    }
}

fn read_text(path: &Path, key: &FetchKey) -> Result<String, FetchError> {
    std::fs::read_to_string(path).map_err(|err| FetchError::Source {
        commit_id: key.commit_id.clone(),
        message: format!("{}: {err}", path.display()),
    })
}

impl DiffSource for InputSource {
    fn load(&self, key: &FetchKey) -> Result<DiffInput, FetchError> {
        let diff = match self.input.as_deref() {
            Some(path) if path != Path::new("-") => read_text(path, key)?,
            _ => {
                let mut text = String::new();
                io::stdin().read_to_string(&mut text)?;
                text
            }
        };
        let name_status = self
            .name_status
            .as_deref()
            .map(|path| read_text(path, key))
            .transpose()?;
        let numstat = self
            .numstat
            .as_deref()
            .map(|path| read_text(path, key))
            .transpose()?;
        Ok(DiffInput {
            diff,
            name_status,
            numstat,
        })
    }
}

/// `--format json` document
#[derive(Serialize)]
struct JsonOutput<'a> {
    layout: Layout,
    column_width: usize,
    wrap: bool,
    scroll_top: usize,
    viewport_height: usize,
    stat: DiffStat,
    slice: VisibleSlice<'a>,
    /// Syntax tokens per visible side, when syntax colors are on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tokens: Vec<LineTokens>,
}

#[derive(Serialize)]
struct LineTokens {
    index: usize,
    side: &'static str,
    tokens: Vec<Token>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ROWDIFF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = Config::load();
    if let Some(layout) = args.layout {
        config.render.layout = layout.into();
    }
    if args.wrap {
        config.render.wrap = true;
    } else if args.no_wrap {
        config.render.wrap = false;
    }
    if let Some(width) = args.width {
        config.render.column_width = width;
    }
    if args.no_syntax {
        config.syntax.enabled = false;
    }

    let source = InputSource {
        input: args.input.clone(),
        name_status: args.name_status.clone(),
        numstat: args.numstat.clone(),
    };
    let key = FetchKey::new(source.commit_id(), &args.files);
    let model = load_model(&source, &key).context("Failed to load diff")?;
    tracing::debug!(
        files = model.file_count(),
        hunks = model.hunk_count(),
        "diff loaded"
    );

    let stdout_is_tty = io::stdout().is_terminal();
    let (term_width, term_height) = crossterm::terminal::size().unwrap_or(FALLBACK_SIZE);
    let layout = config.render.layout;
    let column_width = config
        .render
        .effective_column_width(term_width as usize, views::gutter_width(layout));

    let view = DiffView::new(Arc::new(model), layout, column_width, config.render.wrap)
        .with_overscan(config.render.overscan);
    // Plain text output has nowhere to put colors
    let colored = args.format == OutputFormat::Json || stdout_is_tty;
    let tokens = (config.syntax.enabled && colored)
        .then(|| TokenCache::new(Arc::new(SyntectHighlighter::new(&config.syntax.theme))));

    match args.format {
        OutputFormat::Json => {
            let height = args.height.unwrap_or_else(|| view.total_rows());
            write_json(&view, tokens.as_ref(), args.scroll, height)
        }
        OutputFormat::Text if stdout_is_tty => {
            let height = args
                .height
                .unwrap_or_else(|| (term_height as usize).saturating_sub(1))
                .min(view.total_rows())
                .max(1);
            let ctx = RenderContext {
                view: &view,
                tokens: tokens.as_ref(),
                scroll_top: args.scroll,
            };
            draw_inline(&ctx, height)
        }
        OutputFormat::Text => {
            let height = args.height.unwrap_or_else(|| view.total_rows());
            let ctx = RenderContext {
                view: &view,
                tokens: None,
                scroll_top: args.scroll,
            };
            let width = views::render_width(layout, column_width);
            let mut out = io::stdout().lock();
            for line in views::plain_lines(&ctx, width, height) {
                writeln!(out, "{line}")?;
            }
            Ok(())
        }
    }
}

/// Draw once, then redraw if syntax refinement lands within the budget
fn draw_inline(ctx: &RenderContext<'_>, height: usize) -> Result<()> {
    let height = u16::try_from(height).unwrap_or(u16::MAX);
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(height),
        },
    )
    .context("Failed to set up terminal")?;

    let draw_frame = |terminal: &mut Terminal<CrosstermBackend<io::Stdout>>| {
        terminal.draw(|frame| {
            let area = frame.area();
            views::draw(frame, area, ctx);
        })
        .map(|_| ())
    };
    draw_frame(&mut terminal)?;

    if let Some(cache) = ctx.tokens {
        let version = cache.version();
        if !cache.wait_idle(REFINE_BUDGET) {
            tracing::debug!(pending = cache.pending(), "syntax refinement still running");
        }
        if cache.version() != version {
            draw_frame(&mut terminal)?;
        }
    }

    // Park the cursor on the last drawn row so the shell prompt lands below it
    let area = terminal.get_frame().area();
    terminal.set_cursor_position((0, area.bottom().saturating_sub(1)))?;
    terminal.show_cursor()?;
    drop(terminal);
    println!();
    Ok(())
}

fn write_json(
    view: &DiffView,
    cache: Option<&TokenCache>,
    scroll_top: usize,
    viewport_height: usize,
) -> Result<()> {
    let scroll_top = view.clamp_scroll(scroll_top, viewport_height);
    let slice = view.visible(scroll_top, viewport_height);

    let mut tokens = Vec::new();
    if let Some(cache) = cache {
        let sides = || {
            slice.lines.iter().flat_map(|line| {
                [("left", line.left.as_ref()), ("right", line.right.as_ref())]
                    .into_iter()
                    .filter_map(move |(name, side)| side.map(|side| (line, name, side)))
            })
        };
        let language = |file_id| {
            view.model()
                .file(file_id)
                .map(|file| rowdiff_core::tokens::language_for_path(&file.name))
                .unwrap_or_default()
        };
        // Prime the cache, then collect whatever refined in time
        for (line, _, side) in sides() {
            cache.tokens_for(side.content, &language(line.file_id));
        }
        cache.wait_idle(REFINE_BUDGET);
        for (line, name, side) in sides() {
            tokens.push(LineTokens {
                index: line.index,
                side: name,
                tokens: cache
                    .tokens_for(side.content, &language(line.file_id))
                    .to_vec(),
            });
        }
    }

    let output = JsonOutput {
        layout: view.layout(),
        column_width: view.column_width(),
        wrap: view.wrap_enabled(),
        scroll_top,
        viewport_height,
        stat: view.model().total_stat(),
        slice,
        tokens,
    };
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &output).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}
