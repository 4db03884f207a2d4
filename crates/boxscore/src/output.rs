//! Engine output types and file I/O.
//!
//! A [`GameOutput`] bundles one game's box score, its validation report and
//! the notes gathered while processing it. [`OutputWriter`] appends outputs
//! to JSON Lines files and [`OutputReader`] reads them back.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use pbp_events::{AdminKind, ClassifiedEvent};

use crate::aggregator::BoxScoreResult;
use crate::possession::AmbiguousTransition;
use crate::validator::ValidationReport;

/// Things noticed while processing a game that did not stop it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessingNotes {
    /// Vocabulary the events were classified with
    pub vocabulary: String,
    pub vocabulary_version: u32,
    /// Sequences whose type was not in the vocabulary
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecognized: Vec<u64>,
    /// Sequences removed by a skip rule
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_duplicates: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_transitions: Vec<AmbiguousTransition>,
    /// True if the input had to be sorted by sequence
    #[serde(default)]
    pub reordered: bool,
}

impl ProcessingNotes {
    /// Creates notes for a vocabulary.
    pub fn new(vocabulary: impl Into<String>, vocabulary_version: u32) -> Self {
        Self {
            vocabulary: vocabulary.into(),
            vocabulary_version,
            ..Self::default()
        }
    }

    /// Records unrecognized and skipped events from a classified stream.
    pub fn record_events(&mut self, events: &[ClassifiedEvent]) {
        for event in events {
            match event.admin {
                Some(AdminKind::Unrecognized) => self.unrecognized.push(event.sequence),
                Some(AdminKind::DuplicateSkipped) => self.skipped_duplicates.push(event.sequence),
                _ => {}
            }
        }
    }

    /// Returns true if nothing was noted.
    pub fn is_clean(&self) -> bool {
        self.unrecognized.is_empty()
            && self.skipped_duplicates.is_empty()
            && self.ambiguous_transitions.is_empty()
            && !self.reordered
    }
}

/// Everything produced for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOutput {
    pub game_id: String,
    pub box_score: BoxScoreResult,
    pub validation: ValidationReport,
    pub notes: ProcessingNotes,
}

impl GameOutput {
    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serializes to compact JSON.
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Returns true if every consistency check passed.
    pub fn passed(&self) -> bool {
        self.validation.passed()
    }
}

/// Errors that can occur during output operations.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const BOX_SCORES_FILE: &str = "box_scores.jsonl";
const VALIDATION_FILE: &str = "validation.jsonl";
const SUMMARY_FILE: &str = "summary.json";

/// Writes game outputs to a directory.
///
/// # Output Files
///
/// - `box_scores.jsonl` - One complete [`GameOutput`] per line
/// - `validation.jsonl` - One [`ValidationReport`] per line
/// - `summary.json` - Counts, written by [`OutputWriter::write_summary`]
#[derive(Debug)]
pub struct OutputWriter {
    output_dir: PathBuf,
    box_score_writer: BufWriter<File>,
    validation_writer: BufWriter<File>,
    games_written: u64,
    games_failed: u64,
}

impl OutputWriter {
    /// Creates a new output writer for the given directory.
    ///
    /// Creates the directory if it doesn't exist and truncates existing files.
    pub fn new(output_dir: &Path) -> Result<Self, OutputError> {
        fs::create_dir_all(output_dir)?;

        let box_score_file = File::create(output_dir.join(BOX_SCORES_FILE))?;
        let validation_file = File::create(output_dir.join(VALIDATION_FILE))?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            box_score_writer: BufWriter::new(box_score_file),
            validation_writer: BufWriter::new(validation_file),
            games_written: 0,
            games_failed: 0,
        })
    }

    /// Appends one game to both files.
    pub fn write_game(&mut self, output: &GameOutput) -> Result<(), OutputError> {
        let full_json = serde_json::to_string(output)?;
        writeln!(self.box_score_writer, "{}", full_json)?;

        let validation_json = serde_json::to_string(&output.validation)?;
        writeln!(self.validation_writer, "{}", validation_json)?;

        self.games_written += 1;
        if !output.passed() {
            self.games_failed += 1;
        }
        Ok(())
    }

    /// Appends every game, in order.
    pub fn write_all(&mut self, outputs: &[GameOutput]) -> Result<(), OutputError> {
        for output in outputs {
            self.write_game(output)?;
        }
        Ok(())
    }

    /// Flushes all buffered writers to disk.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.box_score_writer.flush()?;
        self.validation_writer.flush()?;
        Ok(())
    }

    pub fn games_written(&self) -> u64 {
        self.games_written
    }

    /// Number of written games with at least one failing check.
    pub fn games_failed(&self) -> u64 {
        self.games_failed
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes a summary file with counts about the output.
    pub fn write_summary(&self) -> Result<(), OutputError> {
        let summary = serde_json::json!({
            "games_written": self.games_written,
            "games_failed_validation": self.games_failed,
            "files": {
                "box_scores": BOX_SCORES_FILE,
                "validation": VALIDATION_FILE
            }
        });

        let file = File::create(self.output_dir.join(SUMMARY_FILE))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &summary)?;
        Ok(())
    }
}

/// Reads game outputs back from an output directory.
#[derive(Debug)]
pub struct OutputReader {
    output_dir: PathBuf,
}

impl OutputReader {
    /// Creates a reader for the files in a directory.
    pub fn from_dir(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Reads every game output, in file order.
    pub fn read_all(&self) -> Result<Vec<GameOutput>, OutputError> {
        read_lines(&self.output_dir.join(BOX_SCORES_FILE))
    }

    /// Reads every validation report, in file order.
    pub fn read_reports(&self) -> Result<Vec<ValidationReport>, OutputError> {
        read_lines(&self.output_dir.join(VALIDATION_FILE))
    }

    /// Reads the output for one game, if present.
    pub fn read_game(&self, game_id: &str) -> Result<Option<GameOutput>, OutputError> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|output| output.game_id == game_id))
    }
}

fn read_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, OutputError> {
    let content = fs::read_to_string(path)?;
    let mut values = Vec::new();

    for line in content.lines() {
        if !line.trim().is_empty() {
            values.push(serde_json::from_str(line)?);
        }
    }

    Ok(values)
}
