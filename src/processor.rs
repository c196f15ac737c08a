use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cleanup::cleanup_directory;
use crate::cover::generate_thumbnail;
use crate::failed::{print_failures, record_failure, FailedFile, Stage};
use crate::filename::{is_video_file, sidecar_path};
use crate::metadata::{Content, MetadataRecord, KEY_EPISODE_ID};
use crate::tagger::tag_video;
use crate::transcoder::Transcoder;

pub struct Processor<T> {
    transcoder: T,
    verify: bool,
    stats: ProcessingStats,
}

#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub total_videos: usize,
    pub tagged: usize,
    pub sidecars: usize,
    pub verified: usize,
    pub removed: usize,
    pub cleanup_failed: usize,
    pub failures: Vec<FailedFile>,
}

impl ProcessingStats {
    /// Videos whose metadata could not be written
    pub fn failed_videos(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.stage == Stage::Metadata)
            .count()
    }
}

/// List the videos directly inside `dir`, sorted by file name
pub fn collect_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();

    for entry_result in WalkDir::new(dir)
        .max_depth(1)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(err)
                        .with_context(|| format!("Failed to read directory {}", dir.display()));
                }
                match err.path() {
                    Some(path) => {
                        eprintln!("Warning: Failed to access {}: {}", path.display(), err)
                    }
                    None => eprintln!("Warning: WalkDir error: {}", err),
                }
                continue;
            }
        };

        if entry.file_type().is_file() && is_video_file(entry.path()) {
            videos.push(entry.into_path());
        }
    }

    Ok(videos)
}

impl<T: Transcoder> Processor<T> {
    pub fn new(transcoder: T, verify: bool) -> Self {
        Processor {
            transcoder,
            verify,
            stats: ProcessingStats::default(),
        }
    }

    pub fn transcoder(&self) -> &T {
        &self.transcoder
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Tag every video in `dir`, write thumbnail sidecars, then clean up.
    ///
    /// Failures of individual videos are recorded in the stats and never
    /// stop the batch. Only a directory that cannot be listed is an error.
    pub fn run(&mut self, dir: &Path, content: &Content) -> Result<()> {
        println!();
        match content {
            Content::Movie => println!("Processing movies in: {}", dir.display()),
            Content::TvShow(show) => {
                println!("Processing TV show '{}' in: {}", show, dir.display())
            }
        }

        let thumbnail = generate_thumbnail(&self.transcoder, dir);

        let videos = collect_videos(dir)?;
        self.stats.total_videos = videos.len();
        println!("Found {} MP4 files", videos.len());

        for video in &videos {
            self.process_video(video, content, thumbnail.as_deref());
        }

        let report = cleanup_directory(dir);
        self.stats.removed = report.removed.len();
        self.stats.cleanup_failed = report.failed.len();

        self.print_summary();
        Ok(())
    }

    fn process_video(&mut self, video: &Path, content: &Content, thumbnail: Option<&Path>) {
        let name = video.file_name().unwrap_or_default().to_string_lossy();
        println!();
        println!("Processing: {}", name);

        // Build tags
        let record = content.record_for(video);
        if let Some(episode) = record.get(KEY_EPISODE_ID) {
            println!("  Episode: {}", episode);
        }

        // Write metadata; nothing else happens to a video that fails here
        if let Err(e) = tag_video(&self.transcoder, video, &record) {
            self.stats
                .failures
                .push(record_failure(video, Stage::Metadata, &e));
            return;
        }
        self.stats.tagged += 1;
        println!("✓ Metadata added to {}", name);

        // Read back
        if self.verify {
            match self.verify_tags(video, &record) {
                Ok(()) => {
                    self.stats.verified += 1;
                    println!("✓ Metadata verified for {}", name);
                }
                Err(e) => self
                    .stats
                    .failures
                    .push(record_failure(video, Stage::Verify, &e)),
            }
        }

        // Copy thumbnail sidecar
        if let Some(thumbnail) = thumbnail {
            let sidecar = sidecar_path(video);
            let copied = fs::copy(thumbnail, &sidecar)
                .with_context(|| format!("Failed to copy thumbnail to {}", sidecar.display()));
            match copied {
                Ok(_) => {
                    self.stats.sidecars += 1;
                    println!("✓ PSP thumbnail created for {}", name);
                }
                Err(e) => self
                    .stats
                    .failures
                    .push(record_failure(video, Stage::Thumbnail, &e)),
            }
        }
    }

    /// Read the tags back and check every written key/value is present
    fn verify_tags(&self, video: &Path, record: &MetadataRecord) -> Result<()> {
        let tags = self
            .transcoder
            .read_tags(video)
            .with_context(|| format!("Failed to read tags of {}", video.display()))?;

        let mismatched: Vec<&str> = record
            .iter()
            .filter(|(key, value)| tags.get(*key).map(String::as_str) != Some(*value))
            .map(|(key, _)| key)
            .collect();

        if !mismatched.is_empty() {
            bail!("Tags missing or different after writing: {}", mismatched.join(", "));
        }
        Ok(())
    }

    fn print_summary(&self) {
        let stats = &self.stats;

        println!();
        println!("=== PROCESSING COMPLETE ===");
        println!("Total videos: {}", stats.total_videos);
        println!("Metadata written: {}", stats.tagged);
        println!("Failed: {}", stats.failed_videos());
        println!("PSP thumbnails created: {}", stats.sidecars);
        if self.verify {
            println!("Verified: {}", stats.verified);
        }
        println!("Temporary files removed: {}", stats.removed);
        if stats.cleanup_failed > 0 {
            println!("Temporary files left behind: {}", stats.cleanup_failed);
        }

        print_failures(&stats.failures);
    }
}
