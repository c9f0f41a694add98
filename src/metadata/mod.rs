//! Audio file metadata reading and writing.
//!
//! Uses the lofty crate for format-independent tag access. Supports the
//! formats the original collection tooling handled: MP3 (ID3v2), FLAC,
//! M4A/MP4, OGG Vorbis, and WAV.
//!
//! The [`TrackRecord`] is the in-memory working copy of a file's editable
//! tags: the enrichment pipeline mutates it in place, and [`save`] flushes
//! it back to the tag container only when the dirty flag is set. Nothing in
//! this crate writes to disk behind the record's back.

use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};

use crate::enrichment::domain::CoverArt;
use crate::error::{Error, Result};

/// One audio file's editable metadata. Identity is the file path.
///
/// Empty strings mean "tag absent" - that is how the tag containers
/// themselves behave, and it keeps merge logic uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub path: PathBuf,
    pub artist: String,
    pub title: String,
    pub album: String,
    pub album_artist: String,
    /// User-owned; the enrichment path never writes this field
    pub genre: String,
    pub year: Option<u32>,
    pub catalog_number: String,
    /// URL the current cover decision came from (reconciler output)
    pub cover_source: Option<String>,
    /// Downloaded art awaiting save; `None` leaves embedded art untouched
    pub cover_art: Option<CoverArt>,
    /// Set when in-memory state diverges from the file on disk
    pub dirty: bool,
}

impl TrackRecord {
    /// Attach downloaded cover bytes to the record.
    pub fn set_cover(&mut self, art: CoverArt) {
        self.cover_source = Some(art.url.clone());
        self.cover_art = Some(art);
        self.dirty = true;
    }
}

/// Read a file's tags into a fresh [`TrackRecord`].
pub fn load(path: &Path) -> Result<TrackRecord> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("failed to open: {e}")))?
        .read()
        .map_err(|e| Error::metadata(path, format!("failed to read tags: {e}")))?;

    // Primary tag for the format, falling back to whatever tag exists
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    Ok(TrackRecord {
        path: path.to_path_buf(),
        artist: tag
            .and_then(|t| t.artist().map(|s| s.to_string()))
            .unwrap_or_default(),
        title: tag
            .and_then(|t| t.title().map(|s| s.to_string()))
            .unwrap_or_default(),
        album: tag
            .and_then(|t| t.album().map(|s| s.to_string()))
            .unwrap_or_default(),
        album_artist: tag
            .and_then(|t| t.get_string(&ItemKey::AlbumArtist))
            .unwrap_or_default()
            .to_string(),
        genre: tag
            .and_then(|t| t.genre().map(|s| s.to_string()))
            .unwrap_or_default(),
        year: tag.and_then(|t| t.year()),
        catalog_number: tag
            .and_then(|t| t.get_string(&ItemKey::CatalogNumber))
            .unwrap_or_default()
            .to_string(),
        cover_source: None,
        cover_art: None,
        dirty: false,
    })
}

/// Flush a dirty record back to its tag container.
///
/// Clean records are a no-op. Only fields with values are written; the
/// embedded front cover is replaced when downloaded art is attached.
/// Clears the dirty flag on success.
pub fn save(track: &mut TrackRecord) -> Result<()> {
    if !track.dirty {
        tracing::debug!(path = ?track.path, "record is clean, skipping save");
        return Ok(());
    }

    let mut tagged_file = Probe::open(&track.path)
        .map_err(|e| Error::metadata(&track.path, format!("failed to open: {e}")))?
        .read()
        .map_err(|e| Error::metadata(&track.path, format!("failed to read tags: {e}")))?;

    let tag_type = tagged_file.primary_tag_type();
    let tag = match tagged_file.tag_mut(tag_type) {
        Some(tag) => tag,
        None => {
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file
                .tag_mut(tag_type)
                .ok_or_else(|| Error::metadata(&track.path, "failed to create tag"))?
        }
    };

    if !track.artist.is_empty() {
        tag.set_artist(track.artist.clone());
    }
    if !track.title.is_empty() {
        tag.set_title(track.title.clone());
    }
    if !track.album.is_empty() {
        tag.set_album(track.album.clone());
    }
    if !track.album_artist.is_empty() {
        tag.insert_text(ItemKey::AlbumArtist, track.album_artist.clone());
    }
    if !track.genre.is_empty() {
        tag.set_genre(track.genre.clone());
    }
    if let Some(year) = track.year {
        tag.set_year(year);
    }
    if !track.catalog_number.is_empty() {
        tag.insert_text(ItemKey::CatalogNumber, track.catalog_number.clone());
    }

    if let Some(ref art) = track.cover_art {
        // Replace any existing front cover rather than stacking pictures
        tag.remove_picture_type(PictureType::CoverFront);
        let mime = if art.mime_type.eq_ignore_ascii_case("image/png") {
            MimeType::Png
        } else {
            MimeType::Jpeg
        };
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime),
            None,
            art.data.clone(),
        ));
    }

    tag.save_to_path(&track.path, WriteOptions::default())
        .map_err(|e| Error::metadata(&track.path, format!("failed to write tags: {e}")))?;

    track.dirty = false;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_non_audio_file_returns_error() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "This is just some text, not music.").expect("write");

        let result = load(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_non_existent_file_returns_error() {
        let result = load(Path::new("does_not_exist.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_clean_record_is_noop() {
        // A clean record never touches the file, even a bogus one
        let mut track = TrackRecord {
            path: PathBuf::from("does_not_exist.mp3"),
            artist: String::new(),
            title: String::new(),
            album: String::new(),
            album_artist: String::new(),
            genre: String::new(),
            year: None,
            catalog_number: String::new(),
            cover_source: None,
            cover_art: None,
            dirty: false,
        };
        assert!(save(&mut track).is_ok());
    }

    #[test]
    fn test_set_cover_marks_dirty() {
        let mut track = TrackRecord {
            path: PathBuf::from("a.mp3"),
            artist: String::new(),
            title: String::new(),
            album: String::new(),
            album_artist: String::new(),
            genre: String::new(),
            year: None,
            catalog_number: String::new(),
            cover_source: None,
            cover_art: None,
            dirty: false,
        };
        track.set_cover(CoverArt {
            data: vec![0xFF, 0xD8],
            mime_type: "image/jpeg".to_string(),
            url: "https://img/full.jpg".to_string(),
        });
        assert!(track.dirty);
        assert_eq!(track.cover_source.as_deref(), Some("https://img/full.jpg"));
        assert!(track.cover_art.is_some());
    }
}
