//! Compound filtering over a corpus.
//!
//! Three independent, conjunctive criteria narrow the working set in turn:
//!
//! | Pass | Keeps a record when | Skipped when |
//! |------|---------------------|--------------|
//! | year | `year` is set and inside at least one range | no valid ranges |
//! | platform | `platform` equals one of the names | no names |
//! | text | `text` contains at least one term | no terms |
//!
//! Ranges, names and terms within one criterion are OR'd together.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FilterError, MalformedCriteriaError};
use crate::models::{Corpus, Record, PLATFORM, TEXT, YEAR};

static YEAR_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]").unwrap());

/// An inclusive range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i64,
    pub end: i64,
}

impl YearRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Parse `"YYYY-YYYY"` or `"YYYY_YYYY"`.
    ///
    /// A reversed range (`2019-2015`) parses but matches nothing.
    pub fn parse(token: &str) -> Result<Self, MalformedCriteriaError> {
        let malformed = || MalformedCriteriaError::InvalidYearRange {
            token: token.to_string(),
        };

        let parts: Vec<&str> = YEAR_SEPARATOR.split(token.trim()).collect();
        if parts.len() != 2 {
            return Err(malformed());
        }
        let start = parts[0].trim().parse::<i64>().map_err(|_| malformed())?;
        let end = parts[1].trim().parse::<i64>().map_err(|_| malformed())?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, year: i64) -> bool {
        self.start <= year && year <= self.end
    }
}

/// The combined filter for one request. An empty list means "no restriction
/// on that axis".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub year_ranges: Vec<YearRange>,
    pub platforms: Vec<String>,
    pub terms: Vec<String>,
}

impl FilterCriteria {
    /// Build criteria from raw request lists.
    ///
    /// Malformed year-range tokens are dropped and returned alongside the
    /// criteria; blank entries are ignored. Platform names and terms are
    /// lowercased.
    pub fn from_raw(
        time: &[String],
        platforms: &[String],
        terms: &[String],
    ) -> (Self, Vec<MalformedCriteriaError>) {
        let mut rejected = Vec::new();
        let mut year_ranges = Vec::new();
        for token in time.iter().filter(|t| !t.trim().is_empty()) {
            match YearRange::parse(token) {
                Ok(range) => year_ranges.push(range),
                Err(e) => {
                    tracing::warn!(token = %token, "dropping malformed year range");
                    rejected.push(e);
                }
            }
        }

        let criteria = Self {
            year_ranges,
            platforms: clean_list(platforms),
            terms: clean_list(terms),
        };
        (criteria, rejected)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.year_ranges.is_empty() && self.platforms.is_empty() && self.terms.is_empty()
    }

    fn year_matches(&self, record: &Record) -> bool {
        match record.year {
            Some(year) => self.year_ranges.iter().any(|r| r.contains(year)),
            None => false,
        }
    }

    fn platform_matches(&self, record: &Record) -> bool {
        self.platforms.iter().any(|p| *p == record.platform)
    }

    fn text_matches(&self, record: &Record) -> bool {
        let text = record.text.to_lowercase();
        self.terms.iter().any(|t| text.contains(t.as_str()))
    }

    /// Whether a single record passes every active criterion.
    pub fn matches(&self, record: &Record) -> bool {
        (self.year_ranges.is_empty() || self.year_matches(record))
            && (self.platforms.is_empty() || self.platform_matches(record))
            && (self.terms.is_empty() || self.text_matches(record))
    }
}

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Filter a loaded corpus.
///
/// Returns [`FilterError::MissingColumn`] when an active criterion targets a
/// column that no loaded file provided, so an impossible filter is never
/// mistaken for an empty match.
pub fn filter_corpus(corpus: &Corpus, criteria: &FilterCriteria) -> Result<Vec<Record>, FilterError> {
    let required = [
        (!criteria.year_ranges.is_empty(), YEAR),
        (!criteria.platforms.is_empty(), PLATFORM),
        (!criteria.terms.is_empty(), TEXT),
    ];
    for (active, column) in required {
        if active && !corpus.has_column(column) {
            return Err(FilterError::MissingColumn {
                column: column.to_string(),
            });
        }
    }

    Ok(filter_records(&corpus.records, criteria))
}

/// Apply the three passes to a slice of records, preserving order.
pub fn filter_records(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    let mut working: Vec<&Record> = records.iter().collect();
    tracing::debug!(rows = working.len(), "before year filter");

    if !criteria.year_ranges.is_empty() {
        working.retain(|r| criteria.year_matches(r));
        tracing::debug!(rows = working.len(), ranges = ?criteria.year_ranges, "after year filter");
    }

    if !criteria.platforms.is_empty() {
        working.retain(|r| criteria.platform_matches(r));
        tracing::debug!(rows = working.len(), platforms = ?criteria.platforms, "after platform filter");
    }

    if !criteria.terms.is_empty() {
        working.retain(|r| criteria.text_matches(r));
        tracing::debug!(rows = working.len(), terms = ?criteria.terms, "after text filter");
    }

    working.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(year: Option<&str>, text: &str, platform: &str) -> Record {
        Record::new(year, text, platform)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn corpus(records: Vec<Record>) -> Corpus {
        Corpus::from_records(records, &[YEAR, TEXT, PLATFORM])
    }

    #[test]
    fn test_year_range_parse_formats() {
        assert_eq!(YearRange::parse("2010-2014").unwrap(), YearRange::new(2010, 2014));
        assert_eq!(YearRange::parse("2015_2019").unwrap(), YearRange::new(2015, 2019));
        assert_eq!(YearRange::parse(" 2020_2023 ").unwrap(), YearRange::new(2020, 2023));
    }

    #[test]
    fn test_year_range_parse_rejects_malformed() {
        for token in ["2010", "2010-", "abcd-efgh", "2010-2014-2018", "2010/2014", ""] {
            let err = YearRange::parse(token).unwrap_err();
            assert_eq!(err.token(), token);
        }
    }

    #[test]
    fn test_year_filter_or_across_ranges() {
        let (criteria, rejected) =
            FilterCriteria::from_raw(&strings(&["2010-2014", "2015_2019"]), &[], &[]);
        assert!(rejected.is_empty());

        assert!(criteria.matches(&rec(Some("2016"), "", "")));
        assert!(!criteria.matches(&rec(Some("2021"), "", "")));
        assert!(!criteria.matches(&rec(None, "", "")));
        assert!(!criteria.matches(&rec(Some("n/a"), "", "")));
    }

    #[test]
    fn test_malformed_range_dropped_rest_applies() {
        let (criteria, rejected) = FilterCriteria::from_raw(
            &strings(&["bogus", "2015-2019"]),
            &strings(&["facebook"]),
            &[],
        );
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].token(), "bogus");
        assert_eq!(criteria.year_ranges, vec![YearRange::new(2015, 2019)]);

        let records = vec![
            rec(Some("2016"), "a", "facebook"),
            rec(Some("2016"), "b", "twitter"),
            rec(Some("2012"), "c", "facebook"),
        ];
        let out = filter_records(&records, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "a");
    }

    #[test]
    fn test_all_ranges_malformed_means_no_year_restriction() {
        let (criteria, rejected) = FilterCriteria::from_raw(&strings(&["x-y"]), &[], &[]);
        assert_eq!(rejected.len(), 1);
        assert!(criteria.is_unrestricted());
        assert!(criteria.matches(&rec(None, "", "")));
    }

    #[test]
    fn test_platform_filter_normalized() {
        let (criteria, _) = FilterCriteria::from_raw(&[], &strings(&["Facebook", " twitter"]), &[]);
        assert!(criteria.matches(&rec(None, "", "Facebook ")));
        assert!(criteria.matches(&rec(None, "", "twitter")));
        assert!(!criteria.matches(&rec(None, "", "tiktok")));
    }

    #[test]
    fn test_text_filter_is_or_substring() {
        let (criteria, _) = FilterCriteria::from_raw(&[], &[], &strings(&["anxious", "happy"]));
        assert!(criteria.matches(&rec(None, "I feel anxious today", "")));
        assert!(criteria.matches(&rec(None, "unhappy", "")));
        assert!(!criteria.matches(&rec(None, "great day", "")));
    }

    #[test]
    fn test_empty_criteria_pass_through() {
        let records = vec![rec(None, "", ""), rec(Some("1999"), "x", "y")];
        let out = filter_records(&records, &FilterCriteria::default());
        assert_eq!(out, records);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = vec![
            rec(Some("2011"), "ansiedad en redes", "facebook"),
            rec(Some("2016"), "dia feliz", "facebook"),
            rec(Some("2017"), "mucha ansiedad", "twitter"),
            rec(Some("2018"), "ansiedad", "instagram"),
            rec(None, "ansiedad", "twitter"),
        ];
        let (criteria, _) = FilterCriteria::from_raw(
            &strings(&["2015-2019"]),
            &strings(&["facebook", "twitter"]),
            &strings(&["ansiedad"]),
        );
        let once = filter_corpus(&corpus(records), &criteria).unwrap();
        let twice = filter_corpus(&corpus(once.clone()), &criteria).unwrap();
        assert_eq!(once.len(), 1);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = vec![
            rec(Some("2015"), "b", "x"),
            rec(Some("2016"), "a", "x"),
            rec(Some("2017"), "c", "x"),
        ];
        let (criteria, _) = FilterCriteria::from_raw(&strings(&["2015-2019"]), &[], &[]);
        let out = filter_records(&records, &criteria);
        let texts: Vec<_> = out.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_missing_column_is_an_error_not_empty() {
        let c = Corpus::from_records(vec![rec(None, "hola", "")], &[TEXT]);
        let (criteria, _) = FilterCriteria::from_raw(&strings(&["2010-2014"]), &[], &[]);
        let err = filter_corpus(&c, &criteria).unwrap_err();
        assert_eq!(
            err,
            FilterError::MissingColumn {
                column: "year".to_string()
            }
        );

        // The same corpus filters fine on an axis it does have.
        let (criteria, _) = FilterCriteria::from_raw(&[], &[], &strings(&["hola"]));
        assert_eq!(filter_corpus(&c, &criteria).unwrap().len(), 1);
    }
}
