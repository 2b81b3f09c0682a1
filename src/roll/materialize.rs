//! Roll materialization
//!
//! Each roll becomes `export_root/<camera model>/<extension>/<label>/`, where
//! the label is the roll's first timestamp rendered with the configured
//! strftime pattern. Two rolls rendering to the same label share a
//! directory; a file already present under the same name is replaced, so the
//! last placement wins. Each file is first placed under a hidden staging name
//! next to its destination and then renamed over it, so a failed placement
//! leaves the previous entry in place.

use super::Roll;
use crate::config::{PlacementMode, render_label};
use crate::error::{Error, Result};
use regex::Regex;
use std::ffi::OsStr;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Characters that cannot appear in a directory name on common platforms
static UNSAFE_PATH_CHARS: OnceLock<Regex> = OnceLock::new();

fn unsafe_path_chars() -> &'static Regex {
    UNSAFE_PATH_CHARS.get_or_init(|| {
        Regex::new(r#"[/\\:*?"<>|\x00-\x1f]+"#).expect("static regex is valid")
    })
}

/// Make a camera model usable as a single path component
pub fn sanitize_component(name: &str) -> String {
    let replaced = unsafe_path_chars().replace_all(name.trim(), "_");
    let cleaned = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}

/// One file put (or, under dry-run, reported) into a roll directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: PlacementMode,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} ({})",
            self.source.display(),
            self.destination.display(),
            self.mode
        )
    }
}

/// Creates roll directories and places member files into them
#[derive(Debug, Clone)]
pub struct Materializer {
    export_root: PathBuf,
    label_format: String,
    mode: PlacementMode,
}

impl Materializer {
    /// `label_format` must already be validated with
    /// [`validate_label_format`](crate::config::validate_label_format)
    pub fn new(export_root: impl Into<PathBuf>, label_format: impl Into<String>, mode: PlacementMode) -> Self {
        Self {
            export_root: export_root.into(),
            label_format: label_format.into(),
            mode,
        }
    }

    pub fn mode(&self) -> PlacementMode {
        self.mode
    }

    /// Directory a roll is materialized into
    pub fn destination_dir(&self, roll: &Roll<'_>) -> Result<PathBuf> {
        let label = render_label(roll.start(), &self.label_format)?;
        Ok(self
            .export_root
            .join(sanitize_component(roll.camera_model()))
            .join(roll.extension())
            .join(label))
    }

    /// Create the roll directory and place every member file in it.
    ///
    /// Stops at the first failing file of the roll.
    pub fn materialize(&self, roll: &Roll<'_>) -> Result<Vec<Placement>> {
        let dir = self.destination_dir(roll)?;

        if !self.mode.is_dry_run() {
            fs::create_dir_all(&dir).map_err(|source| Error::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        debug!(dir = %dir.display(), files = roll.len(), mode = %self.mode, "Materializing roll");

        let mut placements = Vec::with_capacity(roll.len());
        for record in roll.records() {
            let file_name = record.path.file_name().ok_or_else(|| Error::UnsupportedFormat {
                path: record.path.clone(),
            })?;
            let destination = dir.join(file_name);

            if !self.mode.is_dry_run() {
                place_file(&record.path, &destination, self.mode).map_err(|io| Error::Placement {
                    source_path: record.path.clone(),
                    destination: destination.clone(),
                    mode: self.mode,
                    io,
                })?;
            }

            let placement = Placement {
                source: record.path.clone(),
                destination,
                mode: self.mode,
            };
            info!("{}", placement);
            placements.push(placement);
        }

        Ok(placements)
    }
}

/// Hidden sibling of `dest` that a file is placed under before the final rename
fn staging_path(dest: &Path) -> PathBuf {
    let name = dest.file_name().unwrap_or(OsStr::new("file"));
    let mut staged = std::ffi::OsString::from(".");
    staged.push(name);
    staged.push(".rollsorter-tmp");
    dest.with_file_name(staged)
}

/// Place `source` at `dest`, replacing whatever entry is already there.
///
/// The rename swaps the directory entry itself, so an existing symlink at
/// `dest` is replaced rather than written through.
fn place_file(source: &Path, dest: &Path, mode: PlacementMode) -> io::Result<()> {
    if mode.is_dry_run() {
        return Ok(());
    }

    let staging = staging_path(dest);
    if fs::symlink_metadata(&staging).is_ok() {
        fs::remove_file(&staging)?;
    }

    if let Err(e) = place_new(source, &staging, mode) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    if let Err(e) = fs::rename(&staging, dest) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    // rename is a no-op when both names already link the same file
    if fs::symlink_metadata(&staging).is_ok() {
        fs::remove_file(&staging)?;
    }
    Ok(())
}

/// Create `dest`, which must not exist yet, according to `mode`
fn place_new(source: &Path, dest: &Path, mode: PlacementMode) -> io::Result<()> {
    match mode {
        PlacementMode::Copy => {
            copy_file(source, dest)?;
            // Preserve modification time
            if let Ok(metadata) = fs::metadata(source)
                && let Ok(mtime) = metadata.modified()
            {
                filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(mtime))?;
            }
        }
        PlacementMode::Hardlink => {
            fs::hard_link(source, dest)?;
        }
        PlacementMode::Symlink => {
            #[cfg(unix)]
            {
                std::os::unix::fs::symlink(source, dest)?;
            }
            #[cfg(windows)]
            {
                std::os::windows::fs::symlink_file(source, dest)?;
            }
        }
        PlacementMode::DryRun => {}
    }

    Ok(())
}

/// Copy file with buffered I/O
fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    let mut reader = BufReader::with_capacity(256 * 1024, File::open(source)?);
    let mut writer = BufWriter::with_capacity(256 * 1024, File::create(dest)?);
    io::copy(&mut reader, &mut writer)?;
    writer.flush()
}
