//! exif-rename - rename photos and videos by capture time
//!
//! Parses arguments, installs logging and the interrupt handler, runs the
//! batch and prints a summary.

use anyhow::Result;
use clap::Parser;
use exif_rename::{BackupOutcome, Cli, Config, ProcessingStatus, Processor, RunReport};
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

// CLI Output Module
mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const SUCCESS: Color = Color::Green;
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let padding = 60usize.saturating_sub(title.len()) / 2;
        let _ = stdout().execute(Print(" ".repeat(padding)));
        let _ = stdout().execute(Print(style(title).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_stat(key: &str, value: &str, color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(color).bold()));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_result(status_icon: &str, status_color: Color, source: &str, msg: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(status_icon).with(status_color).bold()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(source).italic()));
        let _ = stdout().execute(Print(" "));
        let _ = stdout().execute(Print(style(msg).with(CliTheme::HINT)));
        let _ = stdout().execute(Print("\n"));
    }

    pub fn print_blank() {
        let _ = stdout().execute(Print("\n"));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let guard = setup_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "exif-rename starting");

    let code = match load_config(&cli).and_then(run) {
        Ok((report, verbose)) => {
            print_summary(&report, verbose);
            0
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // flush the file appender before exiting
    drop(guard);
    std::process::exit(code);
}

/// Run the batch; also hands back whether the detailed listing was asked for
fn run(config: Config) -> Result<(RunReport, bool)> {
    let verbose = config.verbose;
    if verbose {
        info!(?config, "Configuration loaded");
    }

    let processor = Processor::new(config)?;

    let cancel = processor.cancel_flag();
    ctrlc::set_handler(move || {
        if !cancel.swap(true, Ordering::SeqCst) {
            warn!("Interrupt received, finishing in-flight renames");
        }
    })?;

    Ok((processor.run()?, verbose))
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => {
            info!(config_file = %path.display(), "Loading configuration from file");
            let file_config = Config::load_from_file(path)?;
            cli.merge_with_config(file_config)
        }
        None => cli.to_config(),
    };
    Ok(config)
}

/// Setup logging: stderr always, plus an optional log file
fn setup_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console = if cli.json_log {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match cli.log_file {
        Some(ref path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = if cli.json_log {
                fmt::layer().json().with_ansi(false).with_writer(writer).boxed()
            } else {
                fmt::layer().with_ansi(false).with_writer(writer).boxed()
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    Ok(std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?)
}

fn print_summary(report: &RunReport, verbose: bool) {
    use cli_output::*;

    print_separator();
    print_title("Processing complete");
    print_separator();

    print_blank();
    print_stat(
        "Renamed",
        &(report.count(ProcessingStatus::Renamed) + report.count(ProcessingStatus::DryRun))
            .to_string(),
        CliTheme::SUCCESS,
    );
    print_stat(
        "Skipped",
        &report.count(ProcessingStatus::Skipped).to_string(),
        CliTheme::WARNING,
    );
    print_stat(
        "Failed",
        &report.count(ProcessingStatus::Failed).to_string(),
        CliTheme::ERROR,
    );
    let cancelled = report.count(ProcessingStatus::Cancelled);
    if cancelled > 0 {
        print_stat("Cancelled", &cancelled.to_string(), CliTheme::WARNING);
    }
    print_stat(
        "Elapsed",
        &format!("{:.2?}", report.elapsed),
        CliTheme::ACCENT,
    );
    print_blank();

    if verbose {
        print_separator();
        for result in &report.results {
            let source = result.source.display().to_string();
            let dest = result
                .destination
                .as_ref()
                .map(|p| format!("→ {}", p.display()))
                .unwrap_or_default();
            match result.status {
                ProcessingStatus::Renamed => print_result("✓", CliTheme::SUCCESS, &source, &dest),
                ProcessingStatus::DryRun => print_result("~", CliTheme::ACCENT, &source, &dest),
                ProcessingStatus::Skipped => {
                    print_result("⊘", CliTheme::WARNING, &source, "already named")
                }
                ProcessingStatus::Cancelled => {
                    print_result("⊘", CliTheme::WARNING, &source, "cancelled")
                }
                ProcessingStatus::Failed => {}
            }
        }
    }

    let failed: Vec<_> = report.failures().collect();
    if !failed.is_empty() {
        print_separator();
        print_error(&format!("{} files could not be renamed", failed.len()));
        for result in failed {
            let msg = result
                .error
                .as_ref()
                .map(|e| format!("[{}] {}", e.kind, e.message))
                .unwrap_or_default();
            print_result("✗", CliTheme::ERROR, &result.source.display().to_string(), &msg);
        }
    }

    if !report.walk_errors.is_empty() {
        print_separator();
        print_warning(&format!(
            "{} entries could not be read while scanning",
            report.walk_errors.len()
        ));
    }

    print_separator();
    match &report.backup {
        BackupOutcome::NotTaken => print_warning("Dry run, no backup taken and nothing renamed"),
        BackupOutcome::Removed { path, count } => print_stat(
            "Backup removed",
            &format!("{} (counts matched: {})", path.display(), count),
            CliTheme::SUCCESS,
        ),
        BackupOutcome::Retained {
            path,
            original,
            backup,
        } => print_warning(&format!(
            "Backup retained due to mismatch: {} (original: {}, backup: {})",
            path.display(),
            original,
            backup
        )),
        BackupOutcome::Unverified { path, error } => print_warning(&format!(
            "Backup retained, verification failed: {} ({})",
            path.display(),
            error
        )),
    }
}
