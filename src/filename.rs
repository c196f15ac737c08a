use regex::{Captures, Regex};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Extension of the videos picked up from the media directory (case-sensitive)
pub const VIDEO_EXTENSION: &str = "mp4";

/// Extension the PSP looks for next to a video to use as its thumbnail
pub const SIDECAR_EXTENSION: &str = "THM";

/// Prefix of the temp files written while a video is being remuxed
pub const TEMP_PREFIX: &str = ".psp_tagger-";

/// Normalized season/episode identifier, e.g. `S01E02` or `E07`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeTag(String);

impl EpisodeTag {
    fn season_episode(season: &str, episode: &str) -> Self {
        EpisodeTag(format!("S{}E{}", pad2(season), pad2(episode)))
    }

    fn episode(episode: &str) -> Self {
        EpisodeTag(format!("E{}", pad2(episode)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format a run of ASCII digits as an integer padded to two places.
/// Works on the digit string so arbitrarily long numbers never overflow.
fn pad2(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    let value = if trimmed.is_empty() { "0" } else { trimmed };
    format!("{:0>2}", value)
}

struct EpisodeRule {
    regex: &'static LazyLock<Regex>,
    build: fn(&Captures) -> EpisodeTag,
}

static RE_SXXEXX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)S([0-9]+)E([0-9]+)").unwrap());
static RE_NXN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([0-9]+)x([0-9]+)").unwrap());
static RE_EP_GLUED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)EP([0-9]+)").unwrap());
static RE_LEADING_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)-").unwrap());
static RE_EPISODE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Episode\s*([0-9]+)").unwrap());
static RE_EP_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Ep\s*([0-9]+)").unwrap());
static RE_ANY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)").unwrap());

fn with_season(caps: &Captures) -> EpisodeTag {
    EpisodeTag::season_episode(&caps[1], &caps[2])
}

fn first_season(caps: &Captures) -> EpisodeTag {
    EpisodeTag::season_episode("1", &caps[1])
}

fn episode_only(caps: &Captures) -> EpisodeTag {
    EpisodeTag::episode(&caps[1])
}

// Order matters: later rules are broader fallbacks.
static RULES: &[EpisodeRule] = &[
    EpisodeRule { regex: &RE_SXXEXX, build: with_season },
    EpisodeRule { regex: &RE_NXN, build: with_season },
    EpisodeRule { regex: &RE_EP_GLUED, build: first_season },
    EpisodeRule { regex: &RE_LEADING_DASH, build: first_season },
    EpisodeRule { regex: &RE_EPISODE_WORD, build: episode_only },
    EpisodeRule { regex: &RE_EP_WORD, build: episode_only },
    EpisodeRule { regex: &RE_ANY_NUMBER, build: episode_only },
];

/// Derive an episode tag from a file stem (no extension).
///
/// Rules are tried in order and the first match wins:
/// `S1E2`, `1x2`, `EP2` (season 1), a leading `2-` (season 1),
/// `Episode 2`, `Ep 2`, and finally the first bare number anywhere.
///
/// The bare-number fallback is a weak heuristic: in `Movie 1080p` it picks
/// up the resolution and yields `E1080`.
///
/// Only ASCII digits count. Other decimal digits, such as the fullwidth
/// `１` common in Japanese filenames, are treated as plain text, so
/// `Ep１` has no tag and `S０1E０2` only yields the bare number `E01`.
pub fn extract_episode_tag(stem: &str) -> Option<EpisodeTag> {
    RULES
        .iter()
        .find_map(|rule| rule.regex.captures(stem).map(|caps| (rule.build)(&caps)))
}

/// Path of the thumbnail sidecar for a video: same stem, `.THM` extension
pub fn sidecar_path(video: &Path) -> PathBuf {
    video.with_extension(SIDECAR_EXTENSION)
}

/// Get the file stem as a string, lossily converted
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether a path names a video this tool should process.
///
/// Only the extension and name are checked here; the caller makes sure the
/// path is a regular file.
pub fn is_video_file(path: &Path) -> bool {
    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    // AppleDouble files (._*) sit next to every video on macOS-written drives
    if filename.starts_with("._") || filename.starts_with(TEMP_PREFIX) {
        return false;
    }

    path.extension().and_then(|e| e.to_str()) == Some(VIDEO_EXTENSION)
}
