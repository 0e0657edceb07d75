use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use live_diff::{BufferStore, CompareSession, ComparePair, SchedulerConfig};
use livediff::{apply_change, diff_files, read_text, render_report, FileWatcher};
use log::{debug, info};
use text_diff::{CleanupMode, DiffConfig, Side, DEFAULT_EDIT_COST, MAX_EDIT_COST};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CleanupArg {
    Semantic,
    Efficiency,
}

impl From<CleanupArg> for CleanupMode {
    fn from(arg: CleanupArg) -> Self {
        match arg {
            CleanupArg::Semantic => CleanupMode::Semantic,
            CleanupArg::Efficiency => CleanupMode::Efficiency,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "livediff",
    version,
    about = "Character-level diff of two files, once or live"
)]
struct Cli {
    /// Original file
    left: PathBuf,

    /// Modified file
    right: PathBuf,

    /// Edit cost for efficiency cleanup (0 to 10)
    #[arg(long, default_value_t = DEFAULT_EDIT_COST,
          value_parser = clap::value_parser!(u8).range(0..=MAX_EDIT_COST as i64))]
    edit_cost: u8,

    /// Cleanup applied to the raw diff
    #[arg(long, value_enum, default_value = "semantic")]
    cleanup: CleanupArg,

    /// Split operations at line boundaries
    #[arg(long)]
    lines: bool,

    /// Print a summary after the diff
    #[arg(long)]
    stats: bool,

    /// Disable ANSI colors
    #[arg(long)]
    plain: bool,

    /// Re-diff whenever either file changes
    #[arg(long, conflicts_with = "hunk")]
    watch: bool,

    /// Act on the N-th change (1-based)
    #[arg(long, value_name = "N", requires = "side")]
    hunk: Option<usize>,

    /// Side the change is applied to
    #[arg(long, value_enum, requires = "hunk")]
    side: Option<SideArg>,

    /// Write the rebuilt content back to the file instead of printing it
    #[arg(long, requires = "hunk")]
    write: bool,
}

impl Cli {
    fn config(&self) -> DiffConfig {
        DiffConfig::default()
            .edit_cost(self.edit_cost)
            .cleanup(self.cleanup.into())
            .split_by_line(self.lines)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.config();
    debug!("Diff config: {:?}", config);

    if let (Some(n), Some(side)) = (cli.hunk, cli.side) {
        let content = apply_change(&cli.left, &cli.right, &config, n, side.into(), cli.write)?;
        if !cli.write {
            print!("{}", content);
        }
        return Ok(());
    }

    if cli.watch {
        return watch(&cli, config);
    }

    let ops = diff_files(&cli.left, &cli.right, &config)?;
    print!("{}", render_report(&ops, !cli.plain, cli.stats));
    if !cli.stats {
        println!();
    }
    Ok(())
}

fn watch(cli: &Cli, config: DiffConfig) -> Result<()> {
    let mirrored = same_path(&cli.left, &cli.right);

    let mut store = BufferStore::new();
    let left = store.create(&read_text(&cli.left)?);
    let right = if mirrored {
        left
    } else {
        store.create(&read_text(&cli.right)?)
    };
    let pair = ComparePair::new(left, right);

    let watcher = FileWatcher::new(&[cli.left.as_path(), cli.right.as_path()])?;
    let mut session = CompareSession::new(store, pair, config, SchedulerConfig::default())?;
    info!("Watching {} and {}", cli.left.display(), cli.right.display());

    loop {
        if let Some(response) = session.wait_for_update(Duration::from_millis(100)) {
            if !cli.plain {
                // Clear the screen before reprinting
                print!("\x1b[2J\x1b[H");
            }
            print!("{}", render_report(&response.operations, !cli.plain, cli.stats));
            if !cli.stats {
                println!();
            }
        }

        for position in watcher.poll_changes() {
            let (path, id) = match position {
                0 => (&cli.left, left),
                1 => (&cli.right, right),
                _ => bail!("unexpected watched file #{}", position),
            };
            if position == 1 && mirrored {
                continue;
            }
            match read_text(path) {
                Ok(content) => session.replace(id, content)?,
                // Editors may briefly remove the file while saving
                Err(e) => debug!("Skipping reload: {:#}", e),
            }
        }
    }
}

fn same_path(left: &Path, right: &Path) -> bool {
    match (left.canonicalize(), right.canonicalize()) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
