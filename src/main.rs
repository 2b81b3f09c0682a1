//! Roll Sorter - split photo imports into shooting-session rolls
//!
//! Scans import directories, reads EXIF capture metadata, and places each
//! shooting session into `<export>/<camera model>/<extension>/<label>/`.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use rollsorter::{Cli, Config, Processor, RunSummary};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli_output {
    //! Colored summary output for the terminal

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::stdout;

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

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_error(msg: &str) {
        let _ = stdout().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_success(msg: &str) {
        let _ = stdout().execute(Print(style("✓ ").with(CliTheme::SUCCESS).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_key_value(key: &str, value: &str, value_color: Color) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style(key).with(CliTheme::HINT)));
        let _ = stdout().execute(Print(": "));
        let _ = stdout().execute(Print(style(value).with(value_color)));
        let _ = stdout().execute(Print("\n"));
    }

    /// Print one `source → destination (mode)` line
    pub fn print_placement(line: &str) {
        let _ = stdout().execute(Print("  "));
        let _ = stdout().execute(Print(style("→ ").with(CliTheme::ACCENT)));
        let _ = stdout().execute(Print(format!("{}\n", line)));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print(style("  Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::sample_config());
        return Ok(ExitCode::SUCCESS);
    }

    let exe_dir = get_executable_dir()?;
    let log_path = get_log_path(&exe_dir, &cli);
    let _guard = setup_logging(&cli, &log_path)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Roll Sorter starting");

    let config = match load_config(&cli, &exe_dir) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration failed");
            eprintln!("Error: {:#}", e);
            return Ok(ExitCode::from(2));
        }
    };
    if config.verbose {
        info!(?config, "Configuration loaded");
    }
    info!(log_file = %log_path.display(), "Log file location");

    let verbose = config.verbose;
    let dry_run = config.mode.is_dry_run();

    match Processor::new(config).and_then(|processor| processor.run()) {
        Ok(summary) => {
            print_summary(&summary, verbose, dry_run, &log_path);
            if summary.has_failures() {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Processing failed");
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_summary(summary: &RunSummary, verbose: bool, dry_run: bool, log_path: &Path) {
    use cli_output::*;

    if verbose {
        print_separator();
        for placement in &summary.placements {
            print_placement(&placement.to_string());
        }
    }

    if !summary.unreadable.is_empty() {
        print_separator();
        print_error(&format!("{} files could not be read", summary.unreadable.len()));
        for failure in &summary.unreadable {
            print_key_value(&failure.path.display().to_string(), &failure.message, CliTheme::ERROR);
        }
    }

    if !summary.failed_rolls.is_empty() {
        print_separator();
        print_error(&format!("{} rolls failed", summary.failed_rolls.len()));
        for failure in &summary.failed_rolls {
            print_key_value(
                &failure.destination.display().to_string(),
                &failure.message,
                CliTheme::ERROR,
            );
        }
    }

    print_separator();
    if dry_run {
        print_warning("Dry run: nothing was written");
    }
    print_success(&summary.to_string());
    print_log_path(&log_path.display().to_string());
}

/// Get the directory where the executable is located
fn get_executable_dir() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    Ok(exe_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".")))
}

/// Determine the log file path based on config file or timestamp
fn get_log_path(exe_dir: &Path, cli: &Cli) -> PathBuf {
    let log_dir = exe_dir.join("Log");
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if let Some(config_name) = cli.config_name() {
        log_dir
            .join(&config_name)
            .join(format!("{}_{}.log", config_name, timestamp))
    } else {
        log_dir.join(format!("RollSorter_{}.log", timestamp))
    }
}

/// Resolve config path - supports shorthand syntax
fn resolve_config_path(exe_dir: &Path, config_path: &Path) -> PathBuf {
    if config_path.exists() {
        return config_path.to_path_buf();
    }

    let with_extension = if config_path.extension().is_none() {
        config_path.with_extension("toml")
    } else {
        config_path.to_path_buf()
    };

    if with_extension.exists() {
        return with_extension;
    }

    let filename = config_path.file_name().unwrap_or(config_path.as_os_str());
    let mut in_config_dir = exe_dir.join("Config").join(filename);
    if in_config_dir.extension().is_none() {
        in_config_dir = in_config_dir.with_extension("toml");
    }

    if in_config_dir.exists() {
        return in_config_dir;
    }

    config_path.to_path_buf()
}

/// Load configuration from file or CLI arguments
fn load_config(cli: &Cli, exe_dir: &Path) -> Result<Config> {
    let config = if let Some(ref config_path) = cli.config {
        let resolved_path = resolve_config_path(exe_dir, config_path);
        info!(config_file = %resolved_path.display(), "Loading configuration from file");
        let file_config = Config::load_from_file(&resolved_path)?;
        cli.merge_with_config(file_config)
    } else {
        cli.to_config()
    };

    for input_dir in &config.input_dirs {
        if !input_dir.exists() {
            cli_output::print_warning(&format!(
                "Import directory does not exist: {}",
                input_dir.display()
            ));
        }
    }

    config.validate()?;
    Ok(config)
}

/// Setup logging (file + console)
fn setup_logging(cli: &Cli, log_path: &Path) -> Result<WorkerGuard> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_path)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(guard)
}
