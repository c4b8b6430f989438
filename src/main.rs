//! Command-line entry point.
//!
//! Wires the pieces together: parse the key and target expressions,
//! index the input files, fold the join pipeline and print one line per
//! joined row. Logs go to stderr; stdout carries only data.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use stitch::join::{IndexCacheBuilder, JoinError, Joiner, Selector};
use stitch::query::{self, JoinKey, ParseError, Target};

const LONG_ABOUT: &str = "\
Join delimited text files by column equalities.

A key is a join condition like \"1.2=2.3\": join the 2nd column of
source 1 with the 3rd column of source 2. The first FILE is source 1,
the second is source 2, and so on. The default key joins first columns,
e.g. \"1.1=2.1\".

A target is an output format like \"1.1,2.1-\": the 1st column of
source 1 followed by all columns of source 2. The default target is all
columns of every source. The syntax is:

  location := natural \".\" natural   // source.column
  range    := location \"-\" location  // both ends limited
            | location \"-\"           // left limited
            | \"-\" location           // right limited
            | location                // single column
  target   := range {\",\" range}

Example:

  $ cat account.csv
  1,account1,HR
  2,account2,Dev
  $ cat department.csv
  10,HR,Human Resources
  11,Dev,Development
  $ stitch -d , -k 1.3=2.2 -t -1.2,2.3 account.csv department.csv
  1,account1,Human Resources
  2,account2,Development

With -x, standard input becomes source 1 and the FILE arguments follow.";

#[derive(Parser, Debug)]
#[command(name = "stitch", version, about = "Join delimited text files by column equalities.", long_about = LONG_ABOUT)]
struct Args {
    /// Join key expression, e.g. "1.3=2.2,2.3=3.1".
    #[arg(short = 'k', long = "key", value_name = "KEY")]
    key: Option<String>,

    /// Target expression, e.g. "1.1-,2.3".
    #[arg(short = 't', long = "target", value_name = "TARGET")]
    target: Option<String>,

    /// Field delimiter, a literal byte string.
    #[arg(short = 'd', long = "delimiter", default_value = ",", value_name = "DELIM")]
    delimiter: String,

    /// Read standard input as source 1.
    #[arg(short = 'x', long = "stdin")]
    read_stdin: bool,

    /// Maximum number of files indexed concurrently.
    #[arg(short = 'j', long = "jobs", default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..), value_name = "N")]
    jobs: u32,

    /// Per-index byte-range cache capacity, in entries.
    #[arg(short = 'c', long = "cache-size", default_value_t = 1024, value_parser = clap::value_parser!(u32).range(1..), value_name = "N")]
    cache_capacity: u32,

    /// Verbosity: 0 info, 1 debug, 2 trace.
    #[arg(short = 'v', long = "verbose", default_value_t = 0, value_name = "LEVEL")]
    verbose: u8,

    /// Input files; each is one source, in order.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

/// Driver-level failures; any of these exits with code 1.
#[derive(Debug)]
enum RunError {
    NoSources,
    EmptyDelimiter,
    Parse(ParseError),
    Join(JoinError),
    Io(std::io::Error),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::NoSources => write!(f, "no sources given"),
            RunError::EmptyDelimiter => write!(f, "delimiter must not be empty"),
            RunError::Parse(e) => write!(f, "parse: {e}"),
            RunError::Join(e) => write!(f, "join: {e}"),
            RunError::Io(e) => write!(f, "I/O: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Parse(e) => Some(e),
            RunError::Join(e) => Some(e),
            RunError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for RunError {
    fn from(e: ParseError) -> Self {
        RunError::Parse(e)
    }
}

impl From<JoinError> for RunError {
    fn from(e: JoinError) -> Self {
        RunError::Join(e)
    }
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::Io(e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, shutting down");
            signal_token.cancel();
        }
    });

    match run(args, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "stitch failed");
            ExitCode::FAILURE
        }
    }
}

/// Maps `-v` onto a tracing filter; `RUST_LOG` overrides when set.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(args: Args, cancel: CancellationToken) -> Result<(), RunError> {
    if args.delimiter.is_empty() {
        return Err(RunError::EmptyDelimiter);
    }

    let mut files = Vec::with_capacity(args.files.len() + 1);
    if args.read_stdin {
        files.push(spill_stdin().await?);
    }
    for path in &args.files {
        files.push(File::open(path).await?);
    }
    if files.is_empty() {
        return Err(RunError::NoSources);
    }
    let n = files.len();

    let key = parse_key(args.key.as_deref(), n)?;
    let target = parse_target(args.target.as_deref(), n)?;

    let cache = Arc::new(
        IndexCacheBuilder::new(
            files,
            key.locations(),
            args.delimiter.clone(),
            args.jobs as usize,
            args.cache_capacity as usize,
        )
        .build(&cancel)
        .await?,
    );

    let selector = Selector::new(cache.clone());
    let joiner = Joiner::new(cache);
    let mut rows = joiner.join(&key, cancel.clone());

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    while let Some(row) = rows.recv().await {
        match selector.select(&target, &row).await {
            Ok(line) => writeln!(out, "{line}")?,
            Err(e) => error!(error = %e, row = %row, "failed to select"),
        }
    }
    out.flush()?;
    Ok(())
}

/// Copies standard input into an unnamed temporary file so the engine
/// can seek it. The file is removed by the OS once closed.
async fn spill_stdin() -> Result<File, RunError> {
    let tmp = tempfile::tempfile()?;
    let mut file = File::from_std(tmp);
    let mut stdin = tokio::io::stdin();
    tokio::io::copy(&mut stdin, &mut file).await?;
    Ok(file)
}

fn parse_key(expr: Option<&str>, sources: usize) -> Result<JoinKey, RunError> {
    let expr = match expr {
        Some(s) => s.to_string(),
        None => default_key(sources),
    };
    Ok(query::parse_join_key(&expr)?)
}

fn parse_target(expr: Option<&str>, sources: usize) -> Result<Target, RunError> {
    let expr = match expr {
        Some(s) => s.to_string(),
        None => default_target(sources),
    };
    Ok(query::parse_target(&expr)?)
}

/// Chains first columns: `1.1=2.1,2.1=3.1,...`; a lone source joins
/// with itself.
fn default_key(sources: usize) -> String {
    if sources == 1 {
        return "1.1=1.1".to_string();
    }
    (1..sources)
        .map(|i| format!("{i}.1={}.1", i + 1))
        .collect::<Vec<_>>()
        .join(",")
}

/// All columns of every source: `1.1-,2.1-,...`.
fn default_target(sources: usize) -> String {
    (1..=sources)
        .map(|i| format!("{i}.1-"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_key_single_source_is_identity() {
        assert_eq!(default_key(1), "1.1=1.1");
    }

    #[test]
    fn test_default_key_chains_first_columns() {
        assert_eq!(default_key(2), "1.1=2.1");
        assert_eq!(default_key(3), "1.1=2.1,2.1=3.1");
    }

    #[test]
    fn test_default_target_takes_everything() {
        assert_eq!(default_target(1), "1.1-");
        assert_eq!(default_target(3), "1.1-,2.1-,3.1-");
    }

    #[test]
    fn test_defaults_parse() {
        for n in 1..5 {
            assert!(query::parse_join_key(&default_key(n)).is_ok());
            assert!(query::parse_target(&default_target(n)).is_ok());
        }
    }
}
