//! Run pipeline
//!
//! Handles the core logic of:
//! - Scanning import directories for images
//! - Collecting per-file metadata
//! - Segmenting records into rolls
//! - Materializing each roll under the export root

use crate::config::{Config, FailurePolicy};
use crate::error::Result;
use crate::metadata::{CollectFailure, collect_records};
use crate::roll::{Materializer, Placement, Segmenter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, span, warn};
use walkdir::WalkDir;

/// A roll that could not be fully materialized under [`FailurePolicy::Continue`]
#[derive(Debug, Clone)]
pub struct RollFailure {
    pub destination: PathBuf,
    pub message: String,
}

/// Outcome of one run
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Images placed (or planned, under dry-run)
    pub images: usize,
    /// Rolls produced
    pub rolls: usize,
    /// Files excluded because their metadata could not be read
    pub unreadable: Vec<CollectFailure>,
    /// Rolls that failed part-way
    pub failed_rolls: Vec<RollFailure>,
    /// Every placement, in materialization order
    pub placements: Vec<Placement>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }

    /// Whether anything was excluded or failed
    pub fn has_failures(&self) -> bool {
        !self.unreadable.is_empty() || !self.failed_rolls.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} images into {} rolls in {:.2} minutes",
            self.images,
            self.rolls,
            self.elapsed_minutes()
        )?;
        if !self.unreadable.is_empty() {
            write!(f, ", {} unreadable", self.unreadable.len())?;
        }
        if !self.failed_rolls.is_empty() {
            write!(f, ", {} rolls failed", self.failed_rolls.len())?;
        }
        Ok(())
    }
}

/// Main processor for sorting images into rolls
pub struct Processor {
    config: Config,
}

impl Processor {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        // Configure Rayon thread pool
        if config.threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.threads)
                .build_global()
                .ok(); // Ignore if already initialized
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the processing pipeline
    pub fn run(&self) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "processor_run").entered();
        let started = Instant::now();

        info!("Scanning import directories...");
        let files = self.collect_files()?;
        info!(count = files.len(), "Found image files");

        let collection = collect_records(&files);
        let mut summary = RunSummary {
            unreadable: collection.failures,
            ..RunSummary::default()
        };

        let segmenter = Segmenter::new(self.config.roll_threshold()?);
        let materializer = Materializer::new(
            &self.config.output_dir,
            self.config.label_format.as_str(),
            self.config.mode,
        );

        for roll in segmenter.segment(&collection.records) {
            summary.rolls += 1;
            match materializer.materialize(&roll) {
                Ok(placements) => {
                    summary.images += placements.len();
                    summary.placements.extend(placements);
                }
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        error!(error = %e, "Placement failed, aborting run");
                        return Err(e);
                    }
                    FailurePolicy::Continue => {
                        let destination = materializer
                            .destination_dir(&roll)
                            .unwrap_or_else(|_| self.config.output_dir.clone());
                        error!(error = %e, roll = %destination.display(), "Placement failed, continuing");
                        summary.failed_rolls.push(RollFailure {
                            destination,
                            message: e.to_string(),
                        });
                    }
                },
            }
        }

        summary.elapsed = started.elapsed();
        info!("{}", summary);
        Ok(summary)
    }

    /// Collect all image files from import directories, in walk order
    fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input_dir in &self.config.input_dirs {
            if !input_dir.exists() {
                warn!(?input_dir, "Import directory does not exist, skipping");
                continue;
            }

            for entry in WalkDir::new(input_dir)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !self.is_excluded_dir(e.path()))
            {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Cannot read directory entry, skipping");
                        continue;
                    }
                };
                let path = entry.path();
                if entry.file_type().is_file()
                    && let Some(ext) = path.extension().and_then(|e| e.to_str())
                    && self.config.is_image(ext)
                {
                    files.push(path.to_path_buf());
                }
            }
        }

        debug!("Collected {} candidate images", files.len());
        Ok(files)
    }

    /// Check if a path should be excluded based on exclude_dirs configuration
    fn is_excluded_dir(&self, path: &Path) -> bool {
        if self.config.exclude_dirs.is_empty() {
            return false;
        }

        for exclude in &self.config.exclude_dirs {
            // Check if it's an absolute path match
            if exclude.is_absolute() {
                if path.starts_with(exclude) {
                    debug!(?path, ?exclude, "Excluding directory (absolute path match)");
                    return true;
                }
            } else if let Some(exclude_name) = exclude.file_name() {
                // Check if any component of the path matches the exclude pattern
                for component in path.components() {
                    if let std::path::Component::Normal(name) = component
                        && name == exclude_name
                    {
                        debug!(?path, ?exclude, "Excluding directory (folder name match)");
                        return true;
                    }
                }
            }
        }

        false
    }
}
