//! Locally available tracks
//!
//! The catalog is read on demand and never cached, so a reply is always
//! resolved against what is on disk at that moment.

use crate::error::CatalogError;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub file_name: String,
    pub display_name: String,
}

impl Track {
    pub fn new(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let display_name = strip_extension(&file_name).to_string();
        Self { file_name, display_name }
    }
}

/// File name without its final extension. Names without a dot are kept whole.
pub fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    }
}

pub trait TrackCatalog: Send + Sync {
    /// Tracks in enumeration order. Resolution depends on this order.
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError>;
}

/// Catalog backed by a music folder
#[derive(Debug, Clone)]
pub struct DirCatalog {
    root: PathBuf,
}

impl DirCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TrackCatalog for DirCatalog {
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: self.root.display().to_string(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.file_type().map_err(io_err)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        // read_dir order is platform dependent
        names.sort();
        Ok(names.into_iter().map(Track::new).collect())
    }
}

/// Fixed list of tracks in the given order
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tracks: Vec<Track>,
}

impl StaticCatalog {
    pub fn new<I, S>(file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracks: file_names.into_iter().map(Track::new).collect(),
        }
    }
}

impl TrackCatalog for StaticCatalog {
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
        Ok(self.tracks.clone())
    }
}

/// Display names joined for the system prompt
pub fn catalog_prompt_listing(tracks: &[Track]) -> String {
    tracks
        .iter()
        .map(|t| t.display_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("夜曲-周杰伦.mp3"), "夜曲-周杰伦");
        assert_eq!(strip_extension("a.b.flac"), "a.b");
        assert_eq!(strip_extension("README"), "README");
    }

    #[test]
    fn test_prompt_listing() {
        let catalog = StaticCatalog::new(["晴天.mp3", "Moonlight Sonata.mp3"]);
        let tracks = catalog.list_tracks().unwrap();
        assert_eq!(catalog_prompt_listing(&tracks), "晴天, Moonlight Sonata");
        assert_eq!(catalog_prompt_listing(&[]), "");
    }

    #[test]
    fn test_dir_catalog_lists_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.ogg"), b"").unwrap();
        fs::create_dir(dir.path().join("covers")).unwrap();

        let catalog = DirCatalog::new(dir.path());
        let names: Vec<String> = catalog
            .list_tracks()
            .unwrap()
            .into_iter()
            .map(|t| t.file_name)
            .collect();
        assert_eq!(names, vec!["a.ogg", "b.mp3"]);
    }

    #[test]
    fn test_dir_catalog_missing_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = DirCatalog::new(dir.path().join("nope"));
        assert!(matches!(catalog.list_tracks(), Err(CatalogError::Io { .. })));
    }
}
