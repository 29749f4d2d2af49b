use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use danci_lexicon::commands::{self, AppState};
use danci_lexicon::config::AppConfig;
use danci_lexicon::diagnostics::Diagnostics;
use danci_lexicon::import::{CancelFlag, ImportProgress};
use danci_lexicon::logging;
use danci_lexicon::shell::{self, Shell};

#[derive(Parser, Debug)]
#[command(name = "danci-lexicon", version, about = "Word/translation dictionary")]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, env = "LEXICON_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database, overrides the config file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Entry table, overrides the config file
    #[arg(long)]
    table: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List words containing TEXT (all words when omitted)
    Search { text: Option<String> },
    /// Print the translations of WORD, one per line
    Show { word: String },
    /// Merge a WORD:T1,T2 file into the dictionary
    Import { file: PathBuf },
    /// Show store information
    Status,
    /// Interactive shell (default)
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let (mut config, config_error) = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(table) = cli.table {
        config.table = table;
    }

    let _log_guard = logging::init_tracing(&config.log_level);
    let diagnostics = Diagnostics::new(config.log_capacity);

    let state = match config_error {
        Some(e) => {
            diagnostics.error(format!("configuration rejected: {e}"));
            AppState::disabled(diagnostics)
        }
        None => AppState::init(&config, diagnostics),
    };

    match cli.command.unwrap_or(Command::Shell) {
        Command::Search { text } => {
            let words = commands::search_words(&state, text.as_deref().unwrap_or(""))
                .map_err(|e| anyhow!(e))?;
            for word in words {
                println!("{word}");
            }
        }
        Command::Show { word } => {
            let translations =
                commands::show_translations(&state, &word).map_err(|e| anyhow!(e))?;
            print!("{translations}");
        }
        Command::Import { file } => import(&state, file).await?,
        Command::Status => {
            let status = commands::store_status(&state).map_err(|e| anyhow!(e))?;
            print!("{}", shell::render_status(&status));
        }
        Command::Shell => {
            let stdin = io::stdin();
            Shell::new(&state, stdin.lock(), io::stdout())
                .run()
                .context("shell I/O failed")?;
        }
    }

    Ok(())
}

/// Runs the import in the background; Ctrl-C requests cancellation between
/// lines and the partial report is still printed.
async fn import(state: &AppState, file: PathBuf) -> anyhow::Result<()> {
    let cancel = CancelFlag::new();
    let mut last_percent = None;
    let on_progress = move |progress: ImportProgress| {
        let percent = progress.percent();
        if last_percent != Some(percent) {
            last_percent = Some(percent);
            eprint!("\rimporting... {percent:>3}%");
        }
    };

    let handle = commands::start_import(state, &file, on_progress, cancel.clone())
        .map_err(|e| anyhow!(e))?;
    let finished = commands::finish_import(handle);
    tokio::pin!(finished);

    let result = loop {
        tokio::select! {
            result = &mut finished => break result,
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                    break finished.await;
                }
                if !cancel.is_cancelled() {
                    eprintln!("\ncancelling import...");
                    cancel.cancel();
                }
            }
        }
    };
    eprintln!();

    let report = result.map_err(|e| anyhow!(e))?;
    print!("{}", shell::render_report(&report));

    Ok(())
}
