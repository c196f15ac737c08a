//! The external transcoder behind a narrow interface.
//!
//! [`FfmpegTranscoder`] drives the `ffmpeg`/`ffprobe` binaries. Everything
//! else in the crate only sees the [`Transcoder`] trait, so the pipeline can
//! be exercised with a fake in tests.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use crate::metadata::MetadataRecord;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// JPEG quality passed to `-q:v` (2 is near the top of the 2-31 scale)
const THUMBNAIL_QUALITY: &str = "2";

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("{tool} not found (looked for {})", requested.display())]
    NotFound { tool: String, requested: PathBuf },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to parse {tool} output: {message}")]
    Parse { tool: String, message: String },
}

impl TranscodeError {
    /// Install instructions for a tool that could not be found
    pub fn install_hint(&self) -> Option<String> {
        let TranscodeError::NotFound { tool, .. } = self else {
            return None;
        };
        // ffprobe ships in the ffmpeg package
        Some(format!(
            "{tool} is not installed or not available in PATH.\n\
             Please install FFmpeg:\n  \
             macOS: brew install ffmpeg\n  \
             Linux: sudo apt-get install ffmpeg"
        ))
    }
}

/// Operations the tagging pipeline needs from a transcoder
pub trait Transcoder {
    /// Scale an image to `width`x`height` and encode it as a high quality still
    fn scale_image(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), TranscodeError>;

    /// Stream-copy `input` into `output`, writing `record` as container tags
    fn remux_with_metadata(
        &self,
        input: &Path,
        output: &Path,
        record: &MetadataRecord,
    ) -> Result<(), TranscodeError>;

    /// Read back the container-level tags of a file
    fn read_tags(&self, input: &Path) -> Result<BTreeMap<String, String>, TranscodeError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    ffprobe: Option<PathBuf>,
}

impl FfmpegTranscoder {
    /// Resolve `ffmpeg` (and optionally `ffprobe`) from explicit paths or `PATH`
    pub fn discover(
        ffmpeg: Option<&Path>,
        ffprobe: Option<&Path>,
        need_ffprobe: bool,
    ) -> Result<Self, TranscodeError> {
        let ffmpeg = resolve_tool(FFMPEG, ffmpeg)?;
        let ffprobe = if need_ffprobe {
            Some(resolve_tool(FFPROBE, ffprobe)?)
        } else {
            None
        };

        tracing::debug!(ffmpeg = %ffmpeg.display(), ffprobe = ?ffprobe, "resolved transcoder");
        Ok(FfmpegTranscoder { ffmpeg, ffprobe })
    }

    fn run(
        &self,
        tool: &str,
        program: &Path,
        args: &[OsString],
    ) -> Result<Vec<u8>, TranscodeError> {
        tracing::debug!(program = %program.display(), ?args, "running {}", tool);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| TranscodeError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(%stderr, "{} failed", tool);
            return Err(TranscodeError::Failed {
                tool: tool.to_string(),
                status: output.status,
                stderr: last_line(&stderr),
            });
        }

        Ok(output.stdout)
    }
}

impl Transcoder for FfmpegTranscoder {
    fn scale_image(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), TranscodeError> {
        self.run(FFMPEG, &self.ffmpeg, &scale_args(input, output, width, height))?;
        Ok(())
    }

    fn remux_with_metadata(
        &self,
        input: &Path,
        output: &Path,
        record: &MetadataRecord,
    ) -> Result<(), TranscodeError> {
        self.run(FFMPEG, &self.ffmpeg, &remux_args(input, output, record))?;
        Ok(())
    }

    fn read_tags(&self, input: &Path) -> Result<BTreeMap<String, String>, TranscodeError> {
        let ffprobe = self.ffprobe.as_deref().ok_or_else(|| TranscodeError::NotFound {
            tool: FFPROBE.to_string(),
            requested: PathBuf::from(FFPROBE),
        })?;
        let stdout = self.run(FFPROBE, ffprobe, &probe_args(input))?;
        parse_format_tags(&stdout)
    }
}

fn resolve_tool(tool: &str, requested: Option<&Path>) -> Result<PathBuf, TranscodeError> {
    let requested = requested.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(tool));
    which::which(&requested).map_err(|_| TranscodeError::NotFound {
        tool: tool.to_string(),
        requested,
    })
}

/// ffmpeg prints the actual reason on the last line of stderr
fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}

fn scale_args(input: &Path, output: &Path, width: u32, height: u32) -> Vec<OsString> {
    vec![
        "-nostdin".into(),
        "-i".into(),
        input.into(),
        "-vf".into(),
        format!("scale={}:{}", width, height).into(),
        "-q:v".into(),
        THUMBNAIL_QUALITY.into(),
        "-y".into(),
        output.into(),
    ]
}

fn remux_args(input: &Path, output: &Path, record: &MetadataRecord) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-nostdin".into(),
        "-i".into(),
        input.into(),
        "-c".into(),
        "copy".into(),
    ];
    for (key, value) in record.iter() {
        args.push("-metadata".into());
        args.push(format!("{}={}", key, value).into());
    }
    args.push("-y".into());
    args.push(output.into());
    args
}

fn probe_args(input: &Path) -> Vec<OsString> {
    vec![
        "-v".into(),
        "quiet".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        input.into(),
    ]
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Pull the container tags out of `ffprobe -show_format` JSON
fn parse_format_tags(json: &[u8]) -> Result<BTreeMap<String, String>, TranscodeError> {
    let probe: ProbeOutput = serde_json::from_slice(json).map_err(|e| TranscodeError::Parse {
        tool: FFPROBE.to_string(),
        message: e.to_string(),
    })?;

    probe
        .format
        .map(|f| f.tags)
        .ok_or_else(|| TranscodeError::Parse {
            tool: FFPROBE.to_string(),
            message: "missing 'format'".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_scale_args() {
        let args = scale_args(Path::new("/v/cover.png"), Path::new("/v/thumbnail.jpg"), 160, 120);
        assert_eq!(
            strings(&args),
            vec![
                "-nostdin", "-i", "/v/cover.png", "-vf", "scale=160:120", "-q:v", "2", "-y",
                "/v/thumbnail.jpg",
            ]
        );
    }

    #[test]
    fn test_remux_args_carry_every_tag_in_order() {
        let mut record = MetadataRecord::new();
        record.insert("title", "Pilot = Part 1");
        record.insert("album", "Show");
        let args = remux_args(Path::new("/v/a.mp4"), Path::new("/v/.tmp.mp4"), &record);
        assert_eq!(
            strings(&args),
            vec![
                "-nostdin",
                "-i",
                "/v/a.mp4",
                "-c",
                "copy",
                "-metadata",
                "title=Pilot = Part 1",
                "-metadata",
                "album=Show",
                "-y",
                "/v/.tmp.mp4",
            ]
        );
    }

    #[test]
    fn test_parse_format_tags() {
        let json = br#"{
            "format": {
                "filename": "a.mp4",
                "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
                "tags": {
                    "major_brand": "isom",
                    "title": "Pilot",
                    "album": "Show",
                    "show": "Show",
                    "episode_id": "S01E01"
                }
            }
        }"#;
        let tags = parse_format_tags(json).unwrap();
        assert_eq!(tags.get("title").map(String::as_str), Some("Pilot"));
        assert_eq!(tags.get("episode_id").map(String::as_str), Some("S01E01"));
        assert_eq!(tags.len(), 5);
    }

    #[test]
    fn test_parse_format_without_tags() {
        let tags = parse_format_tags(br#"{"format": {"filename": "a.mp4"}}"#).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn test_parse_rejects_missing_format() {
        assert!(matches!(
            parse_format_tags(b"{}"),
            Err(TranscodeError::Parse { .. })
        ));
        assert!(matches!(
            parse_format_tags(b"not json"),
            Err(TranscodeError::Parse { .. })
        ));
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("a\nb: Permission denied\n\n"), "b: Permission denied");
        assert_eq!(last_line(""), "no output");
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let result = resolve_tool(FFMPEG, Some(Path::new("/nonexistent/dir/ffmpeg_xyz_12345")));
        assert!(matches!(result, Err(TranscodeError::NotFound { .. })));
    }

    #[test]
    fn test_install_hint_names_missing_tool() {
        let missing = |tool: &str| TranscodeError::NotFound {
            tool: tool.to_string(),
            requested: PathBuf::from(tool),
        };

        let hint = missing(FFPROBE).install_hint().unwrap();
        assert!(hint.starts_with("ffprobe is not installed or not available in PATH."));
        assert!(hint.contains("brew install ffmpeg"));

        let hint = missing(FFMPEG).install_hint().unwrap();
        assert!(hint.starts_with("ffmpeg is not installed"));

        let parse = TranscodeError::Parse {
            tool: FFPROBE.to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(parse.install_hint(), None);
    }

    #[test]
    fn test_read_tags_needs_ffprobe() {
        let transcoder = FfmpegTranscoder {
            ffmpeg: PathBuf::from("/usr/bin/ffmpeg"),
            ffprobe: None,
        };
        let result = transcoder.read_tags(Path::new("/v/a.mp4"));
        assert!(matches!(result, Err(TranscodeError::NotFound { tool, .. }) if tool == FFPROBE));
    }

    /// Shell scripts standing in for the real binaries, run through `Command`
    #[cfg(unix)]
    mod scripted {
        use super::*;
        use crate::tagger::tag_video;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn spawned(ffmpeg: &Path, ffprobe: Option<&PathBuf>) -> FfmpegTranscoder {
            let need_ffprobe = ffprobe.is_some();
            FfmpegTranscoder::discover(Some(ffmpeg), ffprobe.map(PathBuf::as_path), need_ffprobe)
                .unwrap()
        }

        fn record() -> MetadataRecord {
            let mut record = MetadataRecord::new();
            record.insert("title", "Pilot S01E01");
            record.insert("album", "Show");
            record
        }

        fn dir_names(dir: &Path) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        #[test]
        fn test_discover_explicit_paths() {
            let bin = tempfile::tempdir().unwrap();
            let ffmpeg = script(bin.path(), "my-ffmpeg", "exit 0");
            let ffprobe = script(bin.path(), "my-ffprobe", "exit 0");

            let transcoder = spawned(&ffmpeg, Some(&ffprobe));
            assert_eq!(transcoder.ffmpeg, ffmpeg);
            assert_eq!(transcoder.ffprobe, Some(ffprobe));

            let transcoder = spawned(&ffmpeg, None);
            assert_eq!(transcoder.ffprobe, None);
        }

        #[test]
        fn test_remux_through_process() {
            let bin = tempfile::tempdir().unwrap();
            let media = tempfile::tempdir().unwrap();
            let log = bin.path().join("args.log");
            // $3 is the input, the last argument the output
            let ffmpeg = script(
                bin.path(),
                "ffmpeg",
                &format!(
                    "printf '%s\\n' \"$@\" > '{}'\nfor last; do :; done\ncp \"$3\" \"$last\"",
                    log.display()
                ),
            );
            let video = media.path().join("Pilot S01E01.mp4");
            fs::write(&video, b"payload").unwrap();

            let transcoder = spawned(&ffmpeg, None);
            tag_video(&transcoder, &video, &record()).unwrap();

            assert_eq!(fs::read(&video).unwrap(), b"payload");
            assert_eq!(dir_names(media.path()), vec!["Pilot S01E01.mp4"]);

            let logged = fs::read_to_string(&log).unwrap();
            let args: Vec<&str> = logged.lines().collect();
            assert_eq!(args[..5], ["-nostdin", "-i", video.to_str().unwrap(), "-c", "copy"]);
            assert_eq!(
                args[5..9],
                ["-metadata", "title=Pilot S01E01", "-metadata", "album=Show"]
            );
            assert_eq!(args[9], "-y");
            assert!(args[10].contains(crate::filename::TEMP_PREFIX));
            assert_eq!(args.len(), 11);
        }

        #[test]
        fn test_failed_process_reports_last_stderr_line() {
            let bin = tempfile::tempdir().unwrap();
            let media = tempfile::tempdir().unwrap();
            let ffmpeg = script(
                bin.path(),
                "ffmpeg",
                "for last; do :; done\n\
                 echo partial > \"$last\"\n\
                 echo 'ffmpeg version n7.0' >&2\n\
                 echo 'out.mp4: Permission denied' >&2\n\
                 exit 1",
            );
            let video = media.path().join("Clip.mp4");
            fs::write(&video, b"payload").unwrap();
            let transcoder = spawned(&ffmpeg, None);

            let direct = transcoder.remux_with_metadata(
                &video,
                &media.path().join("out.mp4"),
                &record(),
            );
            match direct {
                Err(TranscodeError::Failed { tool, status, stderr }) => {
                    assert_eq!(tool, FFMPEG);
                    assert_eq!(status.code(), Some(1));
                    assert_eq!(stderr, "out.mp4: Permission denied");
                }
                other => panic!("unexpected result: {:?}", other),
            }
            fs::remove_file(media.path().join("out.mp4")).unwrap();

            let err = tag_video(&transcoder, &video, &record()).unwrap_err();
            assert!(format!("{:#}", err).ends_with("out.mp4: Permission denied"));
            assert_eq!(fs::read(&video).unwrap(), b"payload");
            assert_eq!(dir_names(media.path()), vec!["Clip.mp4"]);
        }

        #[test]
        fn test_read_tags_through_process() {
            let bin = tempfile::tempdir().unwrap();
            let json = bin.path().join("probe.json");
            fs::write(
                &json,
                br#"{"format": {"filename": "a.mp4", "tags": {"title": "Pilot", "show": "Show"}}}"#,
            )
            .unwrap();
            let ffmpeg = script(bin.path(), "ffmpeg", "exit 0");
            let ffprobe = script(bin.path(), "ffprobe", &format!("cat '{}'", json.display()));

            let transcoder = spawned(&ffmpeg, Some(&ffprobe));
            let tags = transcoder.read_tags(Path::new("/v/a.mp4")).unwrap();

            assert_eq!(tags.len(), 2);
            assert_eq!(tags.get("title").map(String::as_str), Some("Pilot"));
            assert_eq!(tags.get("show").map(String::as_str), Some("Show"));
        }

        #[test]
        fn test_garbled_probe_output() {
            let bin = tempfile::tempdir().unwrap();
            let ffmpeg = script(bin.path(), "ffmpeg", "exit 0");
            let ffprobe = script(bin.path(), "ffprobe", "echo 'not json'");

            let transcoder = spawned(&ffmpeg, Some(&ffprobe));
            let result = transcoder.read_tags(Path::new("/v/a.mp4"));

            assert!(matches!(result, Err(TranscodeError::Parse { .. })));
        }

        #[test]
        fn test_scale_through_process() {
            let bin = tempfile::tempdir().unwrap();
            let media = tempfile::tempdir().unwrap();
            let ffmpeg = script(
                bin.path(),
                "ffmpeg",
                "for last; do :; done\nprintf '%s' \"$5\" > \"$last\"",
            );
            let cover = media.path().join("cover.png");
            let thumbnail = media.path().join("thumbnail.jpg");
            fs::write(&cover, b"png").unwrap();

            let transcoder = spawned(&ffmpeg, None);
            transcoder.scale_image(&cover, &thumbnail, 160, 120).unwrap();

            assert_eq!(fs::read_to_string(&thumbnail).unwrap(), "scale=160:120");
        }
    }
}
