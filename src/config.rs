//! Configuration types for the roll sorter

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

/// Default roll threshold in minutes
pub const DEFAULT_ROLL_THRESHOLD_MINUTES: i64 = 60;

/// Default roll directory label: sortable date and minute
pub const DEFAULT_LABEL_FORMAT: &str = "%Y-%m-%d_%H%M";

/// How a source file is put into its roll directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementMode {
    /// Byte-for-byte copy
    #[default]
    Copy,
    /// Hard link to the same file data (source and export must share a volume)
    Hardlink,
    /// Symbolic link pointing at the absolute source path
    Symlink,
    /// Report what would be placed without touching the filesystem
    DryRun,
}

impl PlacementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementMode::Copy => "copy",
            PlacementMode::Hardlink => "hardlink",
            PlacementMode::Symlink => "symlink",
            PlacementMode::DryRun => "dry-run",
        }
    }

    /// Whether this mode mutates the filesystem
    pub fn is_dry_run(&self) -> bool {
        matches!(self, PlacementMode::DryRun)
    }
}

impl fmt::Display for PlacementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do when placing a file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first placement error
    #[default]
    Abort,
    /// Report the failed roll and carry on with the next one
    Continue,
}

/// Configuration for the roll sorter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Import directories to scan for images
    pub input_dirs: Vec<PathBuf>,

    /// Export root where roll directories are created
    pub output_dir: PathBuf,

    /// Directories to exclude from scanning (can be absolute paths or folder names)
    pub exclude_dirs: Vec<PathBuf>,

    /// Maximum gap in minutes between adjacent images of one roll
    pub roll_threshold_minutes: i64,

    /// strftime pattern used to label roll directories
    pub label_format: String,

    /// Placement mode
    pub mode: PlacementMode,

    /// Behavior on placement failure
    pub failure_policy: FailurePolicy,

    /// Number of threads for metadata collection (0 = auto)
    pub threads: usize,

    /// Verbose output
    pub verbose: bool,

    /// Supported image extensions
    pub image_extensions: Vec<String>,

    /// Supported RAW extensions
    pub raw_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dirs: vec![],
            output_dir: PathBuf::from("."),
            exclude_dirs: vec![],
            roll_threshold_minutes: DEFAULT_ROLL_THRESHOLD_MINUTES,
            label_format: DEFAULT_LABEL_FORMAT.to_string(),
            mode: PlacementMode::default(),
            failure_policy: FailurePolicy::default(),
            threads: 0, // Auto-detect
            verbose: false,
            image_extensions: vec![
                "jpg".into(), "jpeg".into(), "jpe".into(), "png".into(), "gif".into(),
                "bmp".into(), "webp".into(), "heic".into(), "heif".into(),
                "avif".into(), "tiff".into(), "tif".into(),
            ],
            raw_extensions: vec![
                "raw".into(), "arw".into(), "cr2".into(), "cr3".into(),
                "nef".into(), "orf".into(), "rw2".into(), "dng".into(),
                "raf".into(), "srw".into(), "pef".into(),
            ],
        }
    }
}

impl Config {
    /// Check if a file extension denotes an image (including RAW formats)
    pub fn is_image(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.image_extensions.iter().any(|e| e == &ext_lower)
            || self.raw_extensions.iter().any(|e| e == &ext_lower)
    }

    /// Roll threshold as a duration
    pub fn roll_threshold(&self) -> crate::Result<TimeDelta> {
        TimeDelta::try_minutes(self.roll_threshold_minutes).ok_or_else(|| {
            crate::Error::Config(format!(
                "roll threshold of {} minutes is out of range",
                self.roll_threshold_minutes
            ))
        })
    }

    /// Check the configuration before a run
    pub fn validate(&self) -> crate::Result<()> {
        if self.input_dirs.is_empty() {
            return Err(crate::Error::Config("no import directory given".into()));
        }
        if self.roll_threshold_minutes < 0 {
            return Err(crate::Error::Config(format!(
                "roll threshold must not be negative, got {} minutes",
                self.roll_threshold_minutes
            )));
        }
        self.roll_threshold()?;
        validate_label_format(&self.label_format)?;

        let output = std::path::absolute(&self.output_dir)?;
        for input_dir in &self.input_dirs {
            let input = std::path::absolute(input_dir)?;
            if output.starts_with(&input) {
                return Err(crate::Error::Config(format!(
                    "export directory {} is inside import directory {}",
                    self.output_dir.display(),
                    input_dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            source: e,
        })?;

        fs::write(path, content).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Roll Sorter Configuration File
# This file uses TOML format (https://toml.io)

# Import directories to scan for images
input_dirs = [
    "/media/card/DCIM",
]

# Export root; rolls land in <output_dir>/<camera model>/<extension>/<label>/
output_dir = "/home/me/Pictures/Rolls"

# Directories to exclude from scanning
# Can be absolute paths or folder names (will match any folder with that name)
exclude_dirs = [
    ".thumbnails",
    "@eaDir",
]

# A gap longer than this many minutes between two shots starts a new roll
roll_threshold_minutes = 60

# strftime pattern for roll directory names, applied to the first shot of the roll
label_format = "%Y-%m-%d_%H%M"

# Placement mode: "copy", "hardlink", "symlink", or "dry-run"
mode = "copy"

# On placement failure: "abort" stops the run, "continue" reports and moves on
failure_policy = "abort"

# Number of threads for metadata reading (0 = auto-detect)
threads = 0

# Verbose output - list every placed file in the summary
verbose = false

image_extensions = ["jpg", "jpeg", "jpe", "png", "gif", "bmp", "webp", "heic", "heif", "avif", "tiff", "tif"]
raw_extensions = ["raw", "arw", "cr2", "cr3", "nef", "orf", "rw2", "dng", "raf", "srw", "pef"]
"#
        .to_string()
    }
}

/// Render a roll label, failing on patterns chrono cannot apply to a naive
/// timestamp (unparsable items, or timezone items such as `%z`)
pub fn render_label(timestamp: NaiveDateTime, format: &str) -> crate::Result<String> {
    let invalid = || crate::Error::Config(format!("invalid label format '{}'", format));

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    let mut label = String::new();
    write!(label, "{}", timestamp.format(format)).map_err(|_| invalid())?;
    Ok(label)
}

/// Reject label patterns that cannot be rendered, and ones that render to nothing
pub fn validate_label_format(format: &str) -> crate::Result<()> {
    let label = render_label(NaiveDateTime::default(), format)?;
    if label.trim().is_empty() {
        return Err(crate::Error::Config("label format must not be empty".into()));
    }
    Ok(())
}

/// Errors that can occur when loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Failed to write configuration file
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize configuration
    SerializeError {
        source: toml::ser::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::WriteError { path, source } => {
                write!(f, "Failed to write config file '{}': {}", path.display(), source)
            }
            ConfigError::SerializeError { source } => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::WriteError { source, .. } => Some(source),
            ConfigError::SerializeError { source } => Some(source),
        }
    }
}
