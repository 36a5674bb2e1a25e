//! Corpus loading from a directory of delimited files.
//!
//! Every file in the source directory whose name matches `*.{extension}` is
//! parsed with the configured delimiter. Only the configured common columns
//! are kept (header names are compared trimmed and case-insensitively), the
//! `text` column is lowercased and the `platform` column lowercased and
//! trimmed. A file that cannot be parsed, or that shares no column with the
//! common schema, is recorded in the [`LoadReport`] and skipped.

use globset::Glob;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::DataSourceError;
use crate::models::{
    normalize_platform, normalize_text, parse_year, Corpus, LoadReport, Record, SkippedFile,
    PLATFORM, TEXT, YEAR,
};

/// Reads source directories into a [`Corpus`].
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    /// Logical (lowercased) names of the columns to keep.
    columns: Vec<String>,
    delimiter: u8,
    extension: String,
}

/// Positions of the kept columns within one file's header.
struct ColumnMap {
    year: Option<usize>,
    text: Option<usize>,
    platform: Option<usize>,
    extra: Vec<(String, usize)>,
}

impl ColumnMap {
    fn logical_columns(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        if self.year.is_some() {
            set.insert(YEAR.to_string());
        }
        if self.text.is_some() {
            set.insert(TEXT.to_string());
        }
        if self.platform.is_some() {
            set.insert(PLATFORM.to_string());
        }
        set.extend(self.extra.iter().map(|(name, _)| name.clone()));
        set
    }

    fn is_empty(&self) -> bool {
        self.year.is_none() && self.text.is_none() && self.platform.is_none() && self.extra.is_empty()
    }
}

impl CorpusLoader {
    pub fn new(common_columns: &[String], delimiter: u8, extension: &str) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for c in common_columns {
            let name = c.trim().to_lowercase();
            if !name.is_empty() && !columns.contains(&name) {
                columns.push(name);
            }
        }
        Self {
            columns,
            delimiter,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &CorpusConfig) -> Self {
        Self::new(
            &config.common_columns,
            config.delimiter_byte(),
            &config.extension,
        )
    }

    /// List the files in `dir` this loader would read, sorted by name.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>, DataSourceError> {
        if !dir.is_dir() {
            return Err(DataSourceError::MissingDirectory(dir.to_path_buf()));
        }

        let matcher = Glob::new(&format!("*.{}", self.extension))?.compile_matcher();
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|source| DataSourceError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if matcher.is_match(entry.file_name()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Load and union every matching file in `dir`.
    ///
    /// Fails only when the directory is unusable, holds no matching files,
    /// or none of them produced a row.
    pub fn load(&self, dir: &Path) -> Result<Corpus, DataSourceError> {
        let files = self.discover(dir)?;
        if files.is_empty() {
            return Err(DataSourceError::NoMatchingFiles {
                dir: dir.to_path_buf(),
                extension: self.extension.clone(),
            });
        }

        let mut corpus = Corpus::default();
        let mut report = LoadReport::default();

        for path in files {
            match self.read_file(&path) {
                Ok((records, columns)) => {
                    tracing::debug!(file = %path.display(), rows = records.len(), "loaded source file");
                    corpus.records.extend(records);
                    corpus.columns.extend(columns);
                    report.files_loaded.push(path);
                }
                Err(reason) => {
                    tracing::warn!(file = %path.display(), %reason, "skipping source file");
                    report.skipped.push(SkippedFile { path, reason });
                }
            }
        }

        if corpus.records.is_empty() {
            return Err(DataSourceError::NoUsableRows {
                dir: dir.to_path_buf(),
                skipped: report.skipped,
            });
        }

        tracing::info!(
            dir = %dir.display(),
            files = report.files_loaded.len(),
            skipped = report.skipped.len(),
            rows = corpus.records.len(),
            "corpus loaded"
        );
        corpus.report = report;
        Ok(corpus)
    }

    fn map_header(&self, headers: &csv::StringRecord) -> ColumnMap {
        let mut map = ColumnMap {
            year: None,
            text: None,
            platform: None,
            extra: Vec::new(),
        };
        for (idx, raw) in headers.iter().enumerate() {
            let name = raw.trim_start_matches('\u{feff}').trim().to_lowercase();
            if !self.columns.contains(&name) {
                continue;
            }
            match name.as_str() {
                YEAR if map.year.is_none() => map.year = Some(idx),
                TEXT if map.text.is_none() => map.text = Some(idx),
                PLATFORM if map.platform.is_none() => map.platform = Some(idx),
                YEAR | TEXT | PLATFORM => {}
                _ => {
                    if !map.extra.iter().any(|(n, _)| *n == name) {
                        map.extra.push((name, idx));
                    }
                }
            }
        }
        map
    }

    /// Parse one file. Any error is reported as a skip reason.
    ///
    /// Rows shorter than the header are padded with empty cells; a row
    /// longer than the header rejects the whole file.
    fn read_file(&self, path: &Path) -> Result<(Vec<Record>, BTreeSet<String>), String> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| e.to_string())?;

        let headers = reader.headers().map_err(|e| e.to_string())?.clone();
        let map = self.map_header(&headers);
        if map.is_empty() {
            return Err("no common columns".to_string());
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row.map_err(|e| e.to_string())?;
            if row.len() > headers.len() {
                let line = row.position().map_or(0, |p| p.line());
                return Err(format!(
                    "line {}: expected at most {} fields, found {}",
                    line,
                    headers.len(),
                    row.len()
                ));
            }
            records.push(row_to_record(&row, &map));
        }

        Ok((records, map.logical_columns()))
    }
}

fn row_to_record(row: &csv::StringRecord, map: &ColumnMap) -> Record {
    let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

    let extra: BTreeMap<String, String> = map
        .extra
        .iter()
        .map(|(name, idx)| (name.clone(), row.get(*idx).unwrap_or("").to_string()))
        .collect();

    Record {
        year: map.year.and_then(|i| row.get(i)).and_then(parse_year),
        text: normalize_text(cell(map.text)),
        platform: normalize_platform(cell(map.platform)),
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn loader() -> CorpusLoader {
        CorpusLoader::new(
            &["Year".to_string(), "Text".to_string(), "Platform".to_string()],
            b';',
            "csv",
        )
    }

    #[test]
    fn test_load_normalizes_and_restricts_columns() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "Year;Text;Platform;Likes\n2016;I Feel ANXIOUS;  Facebook ;12\n2021;Great day;Twitter;3\n",
        )
        .unwrap();

        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        let first = &corpus.records[0];
        assert_eq!(first.year, Some(2016));
        assert_eq!(first.text, "i feel anxious");
        assert_eq!(first.platform, "facebook");
        assert!(first.extra.is_empty(), "Likes is not a common column");
        assert!(corpus.has_column("year"));
        assert!(corpus.has_column("platform"));
        assert_eq!(corpus.report.files_loaded.len(), 1);
    }

    #[test]
    fn test_partial_load_skips_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("good.csv"),
            "Year;Text;Platform\n2015;hola;instagram\n",
        )
        .unwrap();
        // More fields than the header rejects the file.
        fs::write(
            tmp.path().join("bad.csv"),
            "Year;Text;Platform\n2015;uno;dos;tres;cuatro\n",
        )
        .unwrap();

        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.records[0].text, "hola");
        assert_eq!(corpus.report.skipped.len(), 1);
        assert!(corpus.report.skipped[0].path.ends_with("bad.csv"));
    }

    #[test]
    fn test_short_row_padded_not_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "Year;Text;Platform;Likes\n2015;uno;facebook;3\n2016;dos;twitter\n2017;tres;instagram;1\n",
        )
        .unwrap();
        fs::write(tmp.path().join("b.csv"), "Year;Text;Platform\n2018;cuatro;x\n").unwrap();

        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 4);
        assert!(corpus.report.skipped.is_empty());
        assert_eq!(corpus.records[1].text, "dos");
        assert_eq!(corpus.records[1].platform, "twitter");

        // A short row missing a kept column yields an empty cell.
        fs::write(tmp.path().join("c.csv"), "Year;Text;Platform\n2019;cinco\n").unwrap();
        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 5);
        assert_eq!(corpus.records[4].platform, "");
    }

    #[test]
    fn test_invalid_utf8_file_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "Year;Text;Platform\n2015;ok;x\n").unwrap();
        fs::write(tmp.path().join("b.csv"), b"Year;Text;Platform\n2015;\xff\xfe;x\n").unwrap();

        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.report.skipped.len(), 1);
    }

    #[test]
    fn test_file_with_partial_schema_is_usable() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "Text;Platform\nsolo texto;Facebook\n").unwrap();
        fs::write(tmp.path().join("b.csv"), "Year;Text\n2012;otro texto\n").unwrap();

        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.records[0].year, None);
        assert_eq!(corpus.records[0].platform, "facebook");
        assert_eq!(corpus.records[1].year, Some(2012));
        assert_eq!(corpus.records[1].platform, "");
        let cols: Vec<_> = corpus.columns.iter().cloned().collect();
        assert_eq!(cols, vec!["platform", "text", "year"]);
    }

    #[test]
    fn test_file_without_common_columns_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.csv"), "Year;Text;Platform\n2015;hola;x\n").unwrap();
        fs::write(tmp.path().join("b.csv"), "id;body\n1;nada\n").unwrap();

        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.report.skipped[0].reason, "no common columns");
    }

    #[test]
    fn test_header_case_and_bom_tolerated() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "\u{feff}YEAR; text ;PLATFORM\n2018;Hola;X\n",
        )
        .unwrap();
        let corpus = loader().load(tmp.path()).unwrap();
        assert_eq!(corpus.records[0].year, Some(2018));
        assert_eq!(corpus.records[0].text, "hola");
        assert_eq!(corpus.records[0].platform, "x");
    }

    #[test]
    fn test_extra_common_column_is_passed_through() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.csv"),
            "Year;Text;Platform;Country\n2018;Hola;X;Chile\n",
        )
        .unwrap();
        let loader = CorpusLoader::new(
            &[
                "Year".to_string(),
                "Text".to_string(),
                "Platform".to_string(),
                "Country".to_string(),
            ],
            b';',
            "csv",
        );
        let corpus = loader.load(tmp.path()).unwrap();
        assert_eq!(corpus.records[0].extra["country"], "Chile");
    }

    #[test]
    fn test_non_matching_extension_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "Year;Text;Platform\n2015;x;y\n").unwrap();
        let err = loader().load(tmp.path()).unwrap_err();
        assert!(matches!(err, DataSourceError::NoMatchingFiles { .. }));
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = loader().load(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, DataSourceError::MissingDirectory(_)));
    }

    #[test]
    fn test_no_usable_rows() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("empty.csv"), "").unwrap();
        fs::write(tmp.path().join("header_only.csv"), "Year;Text;Platform\n").unwrap();
        let err = loader().load(tmp.path()).unwrap_err();
        match err {
            DataSourceError::NoUsableRows { skipped, .. } => assert_eq!(skipped.len(), 1),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_subdirectories_not_scanned() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/a.csv"), "Year;Text;Platform\n2015;x;y\n").unwrap();
        fs::write(tmp.path().join("b.csv"), "Year;Text;Platform\n2016;z;w\n").unwrap();
        let files = loader().discover(tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("b.csv"));
    }
}
