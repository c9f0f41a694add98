//! Folder-layout export.
//!
//! Moves or copies tracks into a directory tree described by a layout
//! string with `%field%` placeholders, e.g.
//! `%genre%/%year%/[%catalognumber%] %albumartist% - %album%/%artist% - %title%`.
//!
//! # Features
//! - Placeholder substitution from the track's tags
//! - Preview mode to see destinations before touching the filesystem
//! - Copy or move, with cross-device moves falling back to copy+remove

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::TrackRecord;

/// Layout applied when the config does not specify one. Mirrors the
/// grouping collectors tend to use: genre, then year, then release.
pub const DEFAULT_LAYOUT: &str =
    "%genre%/%year%/[%catalognumber%] %albumartist% - %album%/%artist% - %title%";

/// What to do with the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportMode {
    /// Leave the source in place
    #[default]
    Copy,
    /// Relocate the source
    Move,
}

/// One planned export, produced by [`plan`].
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Source already sits at the destination; nothing to do
    pub in_place: bool,
}

/// Compute the destination path for a track without touching the filesystem.
pub fn plan(track: &TrackRecord, layout: &str, destination_root: &Path) -> ExportPlan {
    let ext = track
        .path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3");

    let year = track
        .year
        .map(|y| y.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut path_str = layout
        .replace("%genre%", &component(&track.genre))
        .replace("%year%", &sanitize_filename(&year))
        .replace("%catalognumber%", &component(&track.catalog_number))
        .replace("%albumartist%", &component(&track.album_artist))
        .replace("%album%", &component(&track.album))
        .replace("%artist%", &component(&track.artist))
        .replace("%title%", &component(&track.title));

    if !path_str.ends_with(&format!(".{ext}")) {
        path_str.push('.');
        path_str.push_str(ext);
    }

    let destination = destination_root.join(&path_str);
    ExportPlan {
        in_place: destination == track.path,
        source: track.path.clone(),
        destination,
    }
}

/// Execute one planned export. In-place plans are a no-op.
pub fn export_track(plan: &ExportPlan, mode: ExportMode) -> Result<()> {
    if plan.in_place {
        tracing::debug!(path = ?plan.source, "already at destination");
        return Ok(());
    }

    if let Some(parent) = plan.destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    match mode {
        ExportMode::Copy => {
            fs::copy(&plan.source, &plan.destination)
                .with_context(|| format!("Failed to copy file to: {:?}", plan.destination))?;
        }
        ExportMode::Move => {
            // Cross-device rename fails; fall back to copy + delete
            if fs::rename(&plan.source, &plan.destination).is_err() {
                fs::copy(&plan.source, &plan.destination).with_context(|| {
                    format!("Failed to copy file to: {:?}", plan.destination)
                })?;
                fs::remove_file(&plan.source)
                    .with_context(|| format!("Failed to remove source file: {:?}", plan.source))?;
            }
        }
    }

    Ok(())
}

/// One sanitized path component. Empty tags become "Unknown" rather than
/// collapsing a directory level.
fn component(value: &str) -> String {
    // Multi-valued genre tags use "\" or ";" separators; keep the first
    let value = value
        .split(['\\', ';'])
        .next()
        .unwrap_or(value)
        .trim();
    if value.is_empty() {
        "Unknown".to_string()
    } else {
        sanitize_filename(value)
    }
}

/// Sanitizes a filename by replacing filesystem-invalid characters.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}
