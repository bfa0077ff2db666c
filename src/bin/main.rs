//! Crashtrap CLI - inspect crash logs written by the capture hook
//!
//! Lists, prints, and prunes the timestamped log files a `CrashCapture`
//! handle leaves behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use colored::Colorize;
use crashtrap::record::HEADER_TIMESTAMP_FORMAT;
use crashtrap::{CrashDir, CrashLogEntry};

const DEFAULT_CRASH_DIR: &str = "crash";

#[derive(Parser)]
#[command(name = "crashtrap")]
#[command(about = "Inspect crash logs captured by the crashtrap panic hook")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List captured crash logs, newest first
    List {
        /// Crash log directory
        #[arg(short, long, env = "CRASHTRAP_DIR", default_value = DEFAULT_CRASH_DIR)]
        dir: PathBuf,

        /// Output format: pretty or json
        #[arg(short, long, default_value = "pretty")]
        format: OutputFormat,
    },

    /// Print a crash log (the newest one when no file is given)
    Show {
        /// Crash log directory
        #[arg(short, long, env = "CRASHTRAP_DIR", default_value = DEFAULT_CRASH_DIR)]
        dir: PathBuf,

        /// Log file name within the directory
        file: Option<String>,
    },

    /// Delete crash logs older than the retention window
    Prune {
        /// Crash log directory
        #[arg(short, long, env = "CRASHTRAP_DIR", default_value = DEFAULT_CRASH_DIR)]
        dir: PathBuf,

        /// Keep logs captured within this many days
        #[arg(long, default_value_t = 30)]
        keep_days: i64,
    },
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List { dir, format } => list(&dir, format),
        Commands::Show { dir, file } => show(&dir, file.as_deref()),
        Commands::Prune { dir, keep_days } => prune(&dir, keep_days),
    }
}

fn list(dir: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let entries = CrashDir::new(dir).entries()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Pretty => {
            if entries.is_empty() {
                println!("{}", "no crash logs".dimmed());
                return Ok(());
            }
            for entry in &entries {
                println!("{}", render_entry(entry));
            }
            println!("{}", format!("{} crash log(s)", entries.len()).dimmed());
        }
    }
    Ok(())
}

fn render_entry(entry: &CrashLogEntry) -> String {
    let when = entry
        .captured_at
        .map(|ts| ts.format(HEADER_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "????-??-?? ??:??:??".to_string());
    let name = entry
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<invalid>");
    format!(
        "{}  {}  {}",
        when.green(),
        name,
        format!("{} B", entry.size_bytes).dimmed()
    )
}

fn show(dir: &Path, file: Option<&str>) -> anyhow::Result<()> {
    let crash_dir = CrashDir::new(dir);
    let path = match file {
        Some(name) => crash_dir.root().join(name),
        None => {
            let entries = crash_dir.entries()?;
            let newest = entries
                .first()
                .ok_or_else(|| anyhow::anyhow!("no crash logs in {}", dir.display()))?;
            newest.path.clone()
        }
    };

    let content = fs::read_to_string(&path)?;
    eprintln!("{}", path.display().to_string().dimmed());
    print!("{content}");
    Ok(())
}

fn prune(dir: &Path, keep_days: i64) -> anyhow::Result<()> {
    let cutoff = Local::now() - Duration::days(keep_days);
    let removed = CrashDir::new(dir).prune_older_than(cutoff)?;
    println!("removed {removed} crash log(s) older than {keep_days} day(s)");
    Ok(())
}
