//! Core data models used throughout the search pipeline.
//!
//! These types represent the records, corpus and annotated results that flow
//! from the source files through filtering and enrichment.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Logical column holding the publication year.
pub const YEAR: &str = "year";
/// Logical column holding the post body.
pub const TEXT: &str = "text";
/// Logical column holding the social network name.
pub const PLATFORM: &str = "platform";

/// One normalized row of source data.
///
/// `text` and `platform` are always lowercase; `year` is either an integer or
/// absent. Any other common column is carried verbatim in `extra`, keyed by
/// its lowercased name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub year: Option<i64>,
    pub text: String,
    pub platform: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// Build a record from raw cell values, applying the normalization rules.
    pub fn new(year: Option<&str>, text: &str, platform: &str) -> Self {
        Self {
            year: year.and_then(parse_year),
            text: normalize_text(text),
            platform: normalize_platform(platform),
            extra: BTreeMap::new(),
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

pub fn normalize_text(raw: &str) -> String {
    raw.to_lowercase()
}

pub fn normalize_platform(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Coerce a year cell to an integer. Unparseable or fractional values
/// become `None`.
pub fn parse_year(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(year) = raw.parse::<i64>() {
        return Some(year);
    }
    // Spreadsheet exports often write "2016.0".
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

/// A source file that was not loaded, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// What happened while assembling a corpus.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub files_loaded: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.files_loaded.extend(other.files_loaded);
        self.skipped.extend(other.skipped);
    }
}

/// The union of all successfully parsed source files.
///
/// `columns` holds the logical (lowercased) common columns that at least
/// one loaded file provided.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub records: Vec<Record>,
    pub columns: BTreeSet<String>,
    pub report: LoadReport,
}

impl Corpus {
    /// Wrap already-normalized records, e.g. the output of a previous filter.
    pub fn from_records(records: Vec<Record>, columns: &[&str]) -> Self {
        Self {
            records,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            report: LoadReport::default(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append another corpus, keeping row order.
    pub fn extend(&mut self, other: Corpus) {
        self.records.extend(other.records);
        self.columns.extend(other.columns);
        self.report.merge(other.report);
    }
}

/// Polarity scores in the VADER layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    #[serde(rename = "neg")]
    pub negative: f64,
    #[serde(rename = "neu")]
    pub neutral: f64,
    #[serde(rename = "pos")]
    pub positive: f64,
    pub compound: f64,
}

/// Dominant emotion and the classifier's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    pub label: String,
    pub confidence: f64,
}

/// Output of one analyzer call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub sentiment: SentimentScores,
    pub emotion: Emotion,
}

/// How a record's annotations were produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Ok,
    NoText,
    Failed,
}

/// Keys added next to a record's columns in an [`AnalyzedRecord`]. A common
/// column may not use one of these names.
pub const ANNOTATION_KEYS: [&str; 3] = ["sentiment", "mental_health", "analysis"];

/// A record plus its sentiment and emotion annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedRecord {
    #[serde(flatten)]
    pub record: Record,
    pub sentiment: Option<SentimentScores>,
    pub mental_health: Option<Emotion>,
    pub analysis: AnalysisStatus,
}

impl AnalyzedRecord {
    pub fn analyzed(record: Record, analysis: Analysis) -> Self {
        Self {
            record,
            sentiment: Some(analysis.sentiment),
            mental_health: Some(analysis.emotion),
            analysis: AnalysisStatus::Ok,
        }
    }

    pub fn unannotated(record: Record, status: AnalysisStatus) -> Self {
        Self {
            record,
            sentiment: None,
            mental_health: None,
            analysis: status,
        }
    }
}
