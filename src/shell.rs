//! Line-oriented interactive shell over any reader/writer pair.

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::Level;

use crate::commands::{self, AppState, StoreStatus};
use crate::import::{CancelFlag, ImportReport};

const HELP: &str = "\
commands:
  search [TEXT]   list words containing TEXT (all words when empty)
  show WORD       print the translations of WORD
  import FILE     merge a WORD:T1,T2 file into the dictionary
  status          show store information
  logs [LEVEL]    show diagnostics at or above LEVEL (default info)
  help            show this text
  quit            leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand<'a> {
    Search(&'a str),
    Show(&'a str),
    Import(&'a str),
    Status,
    Logs(Level),
    Help,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_command(line: &str) -> ShellCommand<'_> {
    let line = line.trim();
    let (name, arg) = match line.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (line, ""),
    };

    match name {
        "" => ShellCommand::Empty,
        "search" | "s" => ShellCommand::Search(arg),
        "show" => ShellCommand::Show(arg),
        "import" => ShellCommand::Import(arg),
        "status" => ShellCommand::Status,
        "logs" => ShellCommand::Logs(arg.parse().unwrap_or(Level::INFO)),
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => ShellCommand::Unknown(other),
    }
}

pub struct Shell<'a, R, W> {
    state: &'a AppState,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(state: &'a AppState, input: R, output: W) -> Self {
        Self {
            state,
            input,
            output,
        }
    }

    /// Reads commands until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        if !self.state.is_available() {
            writeln!(
                self.output,
                "{}; only `logs` is usable",
                commands::STORE_UNAVAILABLE
            )?;
        }

        let mut line = String::new();
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(());
            }

            if !self.execute(&line)? {
                return Ok(());
            }
        }
    }

    /// Runs one command line; `false` ends the session.
    fn execute(&mut self, line: &str) -> io::Result<bool> {
        match parse_command(line) {
            ShellCommand::Empty => {}
            ShellCommand::Quit => return Ok(false),
            ShellCommand::Help => writeln!(self.output, "{HELP}")?,
            ShellCommand::Search(text) => match commands::search_words(self.state, text) {
                Ok(words) if words.is_empty() => writeln!(self.output, "no matches")?,
                Ok(words) => {
                    for word in words {
                        writeln!(self.output, "{word}")?;
                    }
                }
                Err(e) => writeln!(self.output, "error: {e}")?,
            },
            ShellCommand::Show("") => writeln!(self.output, "usage: show WORD")?,
            ShellCommand::Show(word) => match commands::show_translations(self.state, word) {
                Ok(text) => write!(self.output, "{text}")?,
                Err(e) => writeln!(self.output, "error: {e}")?,
            },
            ShellCommand::Import("") => writeln!(self.output, "usage: import FILE")?,
            ShellCommand::Import(path) => self.import(Path::new(path))?,
            ShellCommand::Status => match commands::store_status(self.state) {
                Ok(status) => write!(self.output, "{}", render_status(&status))?,
                Err(e) => writeln!(self.output, "error: {e}")?,
            },
            ShellCommand::Logs(level) => {
                let logs = commands::recent_logs(self.state, level);
                if logs.is_empty() {
                    writeln!(self.output, "no log records")?;
                } else {
                    writeln!(self.output, "{logs}")?;
                }
            }
            ShellCommand::Unknown(name) => {
                writeln!(self.output, "unknown command `{name}`, try `help`")?
            }
        }

        Ok(true)
    }

    fn import(&mut self, path: &Path) -> io::Result<()> {
        let output = &mut self.output;
        let mut last_percent = None;

        let result = commands::import_file(
            self.state,
            path,
            |progress| {
                let percent = progress.percent();
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    let _ = writeln!(output, "importing... {percent}%");
                }
            },
            &CancelFlag::new(),
        );

        match result {
            Ok(report) => write!(self.output, "{}", render_report(&report)),
            Err(e) => writeln!(self.output, "error: {e}"),
        }
    }
}

/// What the user sees after an import: the malformed line numbers, plus a
/// notice when the run was cancelled. A clean run renders nothing; counts go
/// to the diagnostics log.
pub fn render_report(report: &ImportReport) -> String {
    let mut text = String::new();

    if report.cancelled {
        text.push_str(&format!(
            "import cancelled after {} of {} lines\n",
            report.processed_lines, report.total_lines
        ));
    }
    if let Some(lines) = report.diagnostic() {
        text.push_str(&format!("malformed lines: {lines}\n"));
    }

    text
}

pub fn render_status(status: &StoreStatus) -> String {
    format!(
        "database: {}\ntable: {}\nschema version: {}{}\nentries: {}\nsize: {} bytes\nimport running: {}\n",
        status.database,
        status.table,
        status.schema_version,
        if status.is_healthy { "" } else { " (unhealthy)" },
        status.entry_count,
        status.db_size_bytes,
        if status.import_running { "yes" } else { "no" },
    )
}
