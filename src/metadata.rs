use std::path::Path;

use crate::filename::{extract_episode_tag, file_stem};

/// Album written on every movie
pub const MOVIE_ALBUM: &str = "Movies";

pub const KEY_TITLE: &str = "title";
pub const KEY_ALBUM: &str = "album";
pub const KEY_SHOW: &str = "show";
pub const KEY_EPISODE_ID: &str = "episode_id";

/// What kind of content the directory holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Movie,
    TvShow(String),
}

impl Content {
    /// Build the container tags for one video.
    ///
    /// Movies get `title` and `album`. TV episodes additionally get `show`
    /// and, when the filename carries one, `episode_id`.
    pub fn record_for(&self, video: &Path) -> MetadataRecord {
        let title = file_stem(video);
        let mut record = MetadataRecord::new();

        match self {
            Content::Movie => {
                record.insert(KEY_TITLE, &title);
                record.insert(KEY_ALBUM, MOVIE_ALBUM);
            }
            Content::TvShow(show) => {
                record.insert(KEY_TITLE, &title);
                record.insert(KEY_ALBUM, show);
                record.insert(KEY_SHOW, show);
                if let Some(episode) = extract_episode_tag(&title) {
                    record.insert(KEY_EPISODE_ID, episode.as_str());
                }
            }
        }

        record
    }
}

/// Container-level tags for one video, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    entries: Vec<(String, String)>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a tag, replacing the value in place if the key is already present
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
