//! CLI argument parsing with clap

use crate::config::{Config, FailurePolicy, PlacementMode};
use clap::Parser;
use std::path::PathBuf;

/// Roll Sorter - split photo imports into shooting-session rolls
///
/// Groups images by camera model and file type, splits each group
/// wherever two consecutive shots are further apart than the roll
/// threshold, and places every roll in its own dated directory.
#[derive(Parser, Debug)]
#[command(name = "rollsorter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// When specified, settings from the config file are used as defaults.
    /// CLI arguments will override config file settings.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Import directories to scan for images
    #[arg(short, long, num_args = 1.., env = "ROLLSORTER_IMPORT", value_delimiter = ',')]
    pub input: Option<Vec<PathBuf>>,

    /// Export root for roll directories
    #[arg(short, long, env = "ROLLSORTER_EXPORT")]
    pub output: Option<PathBuf>,

    /// Minutes between two shots that start a new roll
    #[arg(short = 't', long)]
    pub threshold: Option<i64>,

    /// strftime pattern for roll directory names
    #[arg(short = 'f', long)]
    pub label_format: Option<String>,

    /// Placement mode
    #[arg(short = 'O', long, value_enum)]
    pub mode: Option<PlacementMode>,

    /// Dry run - same as `--mode dry-run`
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Keep going after a failed roll instead of aborting the run
    #[arg(long)]
    pub keep_going: bool,

    /// Number of threads for metadata reading (0 = auto)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub print_config: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Output log format as JSON
    #[arg(long)]
    pub json_log: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments over a base config; CLI arguments take precedence
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref inputs) = self.input {
            config.input_dirs = inputs.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(threshold) = self.threshold {
            config.roll_threshold_minutes = threshold;
        }
        if let Some(ref label_format) = self.label_format {
            config.label_format = label_format.clone();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if self.dry_run {
            config.mode = PlacementMode::DryRun;
        }
        if self.keep_going {
            config.failure_policy = FailurePolicy::Continue;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.verbose {
            config.verbose = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_flags_omitted() {
        let cli = Cli::try_parse_from(["rollsorter", "-i", "/in", "-o", "/out"]).unwrap();
        let config = cli.to_config();

        assert_eq!(config.input_dirs, vec![PathBuf::from("/in")]);
        assert_eq!(config.output_dir, PathBuf::from("/out"));
        assert_eq!(config.roll_threshold_minutes, 60);
        assert_eq!(config.mode, PlacementMode::Copy);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_flags_override_config_file() {
        let cli = Cli::try_parse_from([
            "rollsorter", "-t", "15", "-O", "hardlink", "-f", "%Y%m%d", "--keep-going",
        ])
        .unwrap();
        let base = Config {
            input_dirs: vec![PathBuf::from("/from/file")],
            roll_threshold_minutes: 90,
            ..Config::default()
        };
        let config = cli.merge_with_config(base);

        assert_eq!(config.input_dirs, vec![PathBuf::from("/from/file")]);
        assert_eq!(config.roll_threshold_minutes, 15);
        assert_eq!(config.mode, PlacementMode::Hardlink);
        assert_eq!(config.label_format, "%Y%m%d");
        assert_eq!(config.failure_policy, FailurePolicy::Continue);
    }

    #[test]
    fn test_dry_run_flag_wins_over_mode() {
        let cli = Cli::try_parse_from(["rollsorter", "-O", "symlink", "-n"]).unwrap();
        assert_eq!(cli.to_config().mode, PlacementMode::DryRun);
    }

    #[test]
    fn test_multiple_inputs() {
        let cli = Cli::try_parse_from(["rollsorter", "-i", "/a", "/b"]).unwrap();
        assert_eq!(
            cli.to_config().input_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_config_name() {
        let cli = Cli::try_parse_from(["rollsorter", "-C", "configs/holiday.toml"]).unwrap();
        assert_eq!(cli.config_name().as_deref(), Some("holiday"));
    }
}
