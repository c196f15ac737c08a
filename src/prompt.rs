//! Interactive collection of the run's inputs.
//!
//! Values passed on the command line are validated the same way as typed
//! answers; an invalid one is reported and then asked for again.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::args::{Args, ContentType};
use crate::metadata::Content;
use crate::processor::collect_videos;

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        if read == 0 {
            bail!("Input closed before an answer was given");
        }
        Ok(line.trim().to_string())
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    /// Directory that exists and holds at least one video
    pub fn directory(&mut self, initial: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = initial {
            match check_directory(path) {
                Ok(found) => {
                    self.say(&found)?;
                    return Ok(path.to_path_buf());
                }
                Err(problem) => self.say(&problem)?,
            }
        }

        loop {
            let answer = self.ask("Enter the directory containing the video files: ")?;
            if answer.is_empty() {
                self.say("Please enter a valid directory path.")?;
                continue;
            }

            let path = PathBuf::from(shellexpand::tilde(&answer).into_owned());
            match check_directory(&path) {
                Ok(found) => {
                    self.say(&found)?;
                    return Ok(path);
                }
                Err(problem) => self.say(&problem)?,
            }
        }
    }

    pub fn content_type(&mut self, initial: Option<ContentType>) -> Result<ContentType> {
        if let Some(content_type) = initial {
            return Ok(content_type);
        }

        loop {
            let answer = self.ask("Is the content a (M)ovie or a (T)V show? [M/T]: ")?;
            match parse_content_type(&answer) {
                Some(content_type) => return Ok(content_type),
                None => self.say("Invalid input. Please enter 'M' for Movie or 'T' for TV show.")?,
            }
        }
    }

    pub fn show_name(&mut self, initial: Option<&str>) -> Result<String> {
        if let Some(name) = initial.map(str::trim).filter(|n| !n.is_empty()) {
            return Ok(name.to_string());
        }

        loop {
            let answer = self.ask("Enter the TV show name: ")?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("Please enter a valid TV show name.")?;
        }
    }
}

/// Resolve the directory and content for this run, asking for what is missing
pub fn collect_inputs<R: BufRead, W: Write>(
    args: &Args,
    prompter: &mut Prompter<R, W>,
) -> Result<(PathBuf, Content)> {
    let directory = prompter.directory(args.directory.as_deref())?;
    let content = match prompter.content_type(args.content_type())? {
        ContentType::Movie => Content::Movie,
        ContentType::Tv => Content::TvShow(prompter.show_name(args.show.as_deref())?),
    };
    Ok((directory, content))
}

fn parse_content_type(answer: &str) -> Option<ContentType> {
    match answer.trim().to_uppercase().as_str() {
        "M" | "MOVIE" => Some(ContentType::Movie),
        "T" | "TV" | "TV SHOW" | "SHOW" => Some(ContentType::Tv),
        _ => None,
    }
}

/// Ok with the "found" line, or Err with what is wrong with the directory
fn check_directory(path: &Path) -> std::result::Result<String, String> {
    if !path.exists() {
        return Err(format!("Directory '{}' does not exist.", path.display()));
    }
    if !path.is_dir() {
        return Err(format!("'{}' is not a directory.", path.display()));
    }

    let videos = collect_videos(path).map_err(|e| format!("{:#}", e))?;
    if videos.is_empty() {
        return Err(format!("No MP4 files found in '{}'.", path.display()));
    }

    Ok(format!(
        "✓ Found {} MP4 files in '{}'",
        videos.len(),
        path.display()
    ))
}
