//! CLI command definitions and handlers.
//!
//! Each subcommand is implemented as a function that takes the parsed arguments
//! and returns an `anyhow::Result<()>`.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::enrichment::{self, EnrichmentFields, JobState, OldestRelease};
use crate::{config, export, metadata};

/// Phonodex CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Enrich file tags from the Discogs catalog
    Enrich {
        /// Path to file or directory to enrich
        path: PathBuf,
        /// Discogs personal access token (or set DISCOGS_TOKEN env var)
        #[arg(short, long, env = "DISCOGS_TOKEN")]
        token: Option<String>,
        /// Recursive directory scan
        #[arg(short, long)]
        recursive: bool,
        /// Update cover art (no field flag = update everything)
        #[arg(long)]
        art: bool,
        /// Update release year
        #[arg(long)]
        year: bool,
        /// Update catalog number
        #[arg(long)]
        catalog: bool,
        /// Prefer the oldest catalogued pressing over the best search match
        #[arg(long)]
        oldest: bool,
        /// Dry run - show what would change without writing tags
        #[arg(long)]
        dry_run: bool,
    },
    /// Export files into a folder layout built from their tags
    Export {
        /// Path to file or directory to export
        path: PathBuf,
        /// Destination root directory (falls back to the config file)
        #[arg(short, long)]
        destination: Option<PathBuf>,
        /// Layout with %field% placeholders
        /// (default: %genre%/%year%/[%catalognumber%] %albumartist% - %album%/%artist% - %title%)
        #[arg(short, long)]
        layout: Option<String>,
        /// Move files instead of copying them
        #[arg(long = "move")]
        move_files: bool,
        /// Recursive directory scan
        #[arg(short, long)]
        recursive: bool,
        /// Dry run - show destinations without touching files
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the tags of an audio file
    Tags {
        /// Path to the audio file
        path: PathBuf,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;

    match &cli.command {
        Commands::Enrich {
            path,
            token,
            recursive,
            art,
            year,
            catalog,
            oldest,
            dry_run,
        } => {
            let fields = field_flags(*art, *year, *catalog);
            cmd_enrich(
                &rt,
                path,
                token.as_deref(),
                *recursive,
                fields,
                *oldest,
                *dry_run,
            )
        }
        Commands::Export {
            path,
            destination,
            layout,
            move_files,
            recursive,
            dry_run,
        } => cmd_export(
            path,
            destination.as_deref(),
            layout.as_deref(),
            *move_files,
            *recursive,
            *dry_run,
        ),
        Commands::Tags { path } => cmd_tags(path),
    }
}

/// Translate the --art/--year/--catalog flags into a field mask.
/// No flag means "everything", matching what the config UI would send.
fn field_flags(art: bool, year: bool, catalog: bool) -> EnrichmentFields {
    if !art && !year && !catalog {
        return EnrichmentFields::all();
    }
    let mut fields = EnrichmentFields::empty();
    if art {
        fields |= EnrichmentFields::ART;
    }
    if year {
        fields |= EnrichmentFields::YEAR;
    }
    if catalog {
        fields |= EnrichmentFields::CATALOG;
    }
    fields
}

// ============================================================================
// Individual command implementations
// ============================================================================

fn cmd_enrich(
    rt: &Runtime,
    path: &PathBuf,
    token: Option<&str>,
    recursive: bool,
    fields: EnrichmentFields,
    oldest: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let cfg = config::load();
    let enrichment_config = cfg.enrichment_config(token);

    if enrichment_config.token.is_empty() {
        eprintln!("Error: Discogs token required.");
        eprintln!("Get one at: https://www.discogs.com/settings/developers");
        eprintln!("Then use: --token YOUR_TOKEN or set DISCOGS_TOKEN env var");
        std::process::exit(1);
    }

    let files = collect_audio_files(path, recursive);
    if files.is_empty() {
        println!("No audio files found.");
        return Ok(());
    }

    // Read tags up front; unreadable files are reported and left out
    let mut tracks = Vec::with_capacity(files.len());
    let mut load_errors = 0;
    for file in &files {
        match metadata::load(file) {
            Ok(track) => tracks.push(track),
            Err(e) => {
                eprintln!("✗ {}: {}", file.display(), e);
                load_errors += 1;
            }
        }
    }
    if tracks.is_empty() {
        println!("No readable audio files found.");
        return Ok(());
    }

    if dry_run {
        println!("DRY RUN - no tags will be written\n");
    }
    println!("Enriching {} file(s)...\n", tracks.len());

    let mut service = enrichment::EnrichmentService::new(&enrichment_config)?;
    if oldest || cfg.enrichment.prefer_oldest_release {
        service = service.with_selector(Arc::new(OldestRelease));
    }

    rt.block_on(async {
        let total = tracks.len();
        let (handle, mut events) = service.start_batch(tracks, fields);

        let mut done = 0;
        while let Some(event) = events.recv().await {
            if !event.state.is_terminal() {
                continue;
            }
            done += 1;
            let name = filename(&event.path);
            match &event.state {
                JobState::Succeeded { changed } if changed.is_empty() => {
                    println!("[{done}/{total}] {name}... ✓ no changes");
                }
                JobState::Succeeded { changed } => {
                    let fields: Vec<&str> = changed.iter().map(|f| f.as_str()).collect();
                    println!("[{done}/{total}] {name}... ✓ {}", fields.join(", "));
                }
                JobState::Failed { reason } => {
                    println!("[{done}/{total}] {name}... ✗ {reason}");
                }
                JobState::Skipped { reason } => {
                    println!("[{done}/{total}] {name}... - skipped ({})", reason.as_str());
                }
                JobState::Pending | JobState::InFlight => {}
            }
        }

        let mut outcome = handle.wait().await;

        let mut written = 0;
        let mut write_errors = 0;
        if !dry_run {
            for track in &mut outcome.tracks {
                if !track.dirty {
                    continue;
                }
                match metadata::save(track) {
                    Ok(()) => written += 1,
                    Err(e) => {
                        eprintln!("✗ Failed to write {}: {}", track.path.display(), e);
                        write_errors += 1;
                    }
                }
            }
        }

        println!();
        println!(
            "Done! {} enriched, {} failed, {} skipped",
            outcome.summary.succeeded, outcome.summary.failed, outcome.summary.skipped
        );
        if load_errors > 0 {
            println!("{load_errors} file(s) could not be read");
        }
        if !dry_run {
            println!("{written} file(s) written, {write_errors} write error(s)");
        } else if outcome.summary.succeeded > 0 {
            println!("Run without --dry-run to write tags.");
        }

        if let Some(err) = outcome.auth_error {
            eprintln!("\nError: {err}");
            eprintln!("Check the token at: https://www.discogs.com/settings/developers");
            std::process::exit(1);
        }
    });

    Ok(())
}

fn cmd_export(
    path: &PathBuf,
    destination: Option<&Path>,
    layout: Option<&str>,
    move_files: bool,
    recursive: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let cfg = config::load();

    let destination = match destination {
        Some(d) => d.to_path_buf(),
        None => match cfg.export.destination {
            Some(d) => d,
            None => {
                eprintln!("Error: no destination given.");
                eprintln!("Use --destination or set export.destination in the config file.");
                std::process::exit(1);
            }
        },
    };
    let layout = layout.unwrap_or(&cfg.export.layout);
    let mode = if move_files {
        export::ExportMode::Move
    } else {
        export::ExportMode::Copy
    };

    let files = collect_audio_files(path, recursive);
    if files.is_empty() {
        println!("No audio files found.");
        return Ok(());
    }

    println!("Exporting {} file(s)...", files.len());
    println!("Layout: {layout}");
    println!("Destination: {:?}", destination);
    if dry_run {
        println!("\n[DRY RUN MODE - no files will be touched]\n");
    }

    let verb = if move_files { "MOVE" } else { "COPY" };
    let mut success_count = 0;
    let mut error_count = 0;

    for file in &files {
        let track = match metadata::load(file) {
            Ok(track) => track,
            Err(e) => {
                eprintln!("ERROR reading {}: {}", file.display(), e);
                error_count += 1;
                continue;
            }
        };

        let plan = export::plan(&track, layout, &destination);
        if plan.in_place {
            println!("SKIP (already in place): {}", file.display());
            continue;
        }

        if dry_run {
            println!("WOULD {verb}: {} -> {:?}", file.display(), plan.destination);
            success_count += 1;
        } else {
            match export::export_track(&plan, mode) {
                Ok(()) => {
                    println!("{verb}: {} -> {:?}", file.display(), plan.destination);
                    success_count += 1;
                }
                Err(e) => {
                    eprintln!("ERROR exporting {}: {}", file.display(), e);
                    error_count += 1;
                }
            }
        }
    }

    println!("\nCompleted: {success_count} successful, {error_count} errors");
    Ok(())
}

fn cmd_tags(path: &PathBuf) -> anyhow::Result<()> {
    let track = metadata::load(path)?;

    println!("Tags for {:?}:", path);
    println!("  Artist:       {}", or_empty(&track.artist));
    println!("  Title:        {}", or_empty(&track.title));
    println!("  Album:        {}", or_empty(&track.album));
    println!("  Album artist: {}", or_empty(&track.album_artist));
    println!("  Genre:        {}", or_empty(&track.genre));
    match track.year {
        Some(year) => println!("  Year:         {year}"),
        None => println!("  Year:         (empty)"),
    }
    println!("  Catalog:      {}", or_empty(&track.catalog_number));

    Ok(())
}

// ============================================================================
// Helper functions
// ============================================================================

fn or_empty(value: &str) -> &str {
    if value.is_empty() { "(empty)" } else { value }
}

fn filename(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("?")
}

/// Collect audio files from a path (file or directory)
fn collect_audio_files(path: &PathBuf, recursive: bool) -> Vec<PathBuf> {
    if path.is_dir() {
        if recursive {
            walkdir::WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| is_audio_file(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect()
        } else {
            let Ok(entries) = std::fs::read_dir(path) else {
                eprintln!("Error: failed to read directory {:?}", path);
                return vec![];
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .filter(|e| is_audio_file(&e.path()))
                .map(|e| e.path())
                .collect();
            files.sort();
            files
        }
    } else {
        vec![path.clone()]
    }
}

/// Check if a path has an audio file extension
fn is_audio_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    matches!(ext.as_deref(), Some("mp3" | "flac" | "ogg" | "m4a" | "wav"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_flags_default_to_all() {
        assert_eq!(field_flags(false, false, false), EnrichmentFields::all());
    }

    #[test]
    fn test_field_flags_union() {
        let fields = field_flags(true, false, true);
        assert!(fields.contains(EnrichmentFields::ART));
        assert!(!fields.contains(EnrichmentFields::YEAR));
        assert!(fields.contains(EnrichmentFields::CATALOG));
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("song.mp3")));
        assert!(is_audio_file(Path::new("song.FLAC")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[test]
    fn test_collect_from_single_file() {
        let path = PathBuf::from("song.mp3");
        assert_eq!(collect_audio_files(&path, false), vec![path]);
    }

    #[test]
    fn test_collect_from_directory() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("a.mp3"), b"x").unwrap();
        std::fs::write(temp.path().join("b.txt"), b"x").unwrap();
        let sub = temp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("c.flac"), b"x").unwrap();

        let flat = collect_audio_files(&temp.path().to_path_buf(), false);
        assert_eq!(flat.len(), 1);

        let deep = collect_audio_files(&temp.path().to_path_buf(), true);
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_cli_parses_enrich() {
        let cli = Cli::try_parse_from([
            "phonodex", "enrich", "/music", "--token", "t", "--year", "--art", "--dry-run",
        ])
        .unwrap();
        match cli.command {
            Commands::Enrich {
                token,
                year,
                art,
                catalog,
                dry_run,
                ..
            } => {
                assert_eq!(token.as_deref(), Some("t"));
                assert!(year && art && !catalog && dry_run);
            }
            _ => panic!("expected enrich"),
        }
    }

    #[test]
    fn test_cli_parses_export_move() {
        let cli = Cli::try_parse_from([
            "phonodex", "export", "/music", "--destination", "/out", "--move",
        ])
        .unwrap();
        match cli.command {
            Commands::Export {
                destination,
                move_files,
                ..
            } => {
                assert_eq!(destination, Some(PathBuf::from("/out")));
                assert!(move_files);
            }
            _ => panic!("expected export"),
        }
    }
}
