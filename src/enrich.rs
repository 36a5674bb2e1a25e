//! Per-record sentiment and emotion enrichment.
//!
//! Each filtered record is scored independently, so records are analyzed
//! concurrently (bounded by `enrichment.concurrency`) with a per-call
//! timeout. Output order always follows input order.
//!
//! Records with empty text are kept with null annotations and never reach
//! the analyzer. A failed or timed-out analyzer call is handled according
//! to [`FailurePolicy`]: `Drop` removes the record, `Keep` returns it with
//! null annotations and a `failed` status. Either way the failure is
//! reported in [`EnrichmentOutcome::failures`].

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::TextAnalyzer;
use crate::config::{EnrichmentConfig, FailurePolicy};
use crate::error::AnalysisError;
use crate::models::{Analysis, AnalysisStatus, AnalyzedRecord, Record};

/// One record the analyzer could not score.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentFailure {
    /// Position of the record in the enrichment input.
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct EnrichmentOutcome {
    pub records: Vec<AnalyzedRecord>,
    pub failures: Vec<EnrichmentFailure>,
}

impl EnrichmentOutcome {
    /// Number of input records missing from `records`.
    pub fn dropped(&self, input_len: usize) -> usize {
        input_len.saturating_sub(self.records.len())
    }
}

pub struct EnrichmentPipeline {
    analyzer: Arc<dyn TextAnalyzer>,
    concurrency: usize,
    timeout: Duration,
    on_failure: FailurePolicy,
}

impl EnrichmentPipeline {
    pub fn new(
        analyzer: Arc<dyn TextAnalyzer>,
        concurrency: usize,
        timeout: Duration,
        on_failure: FailurePolicy,
    ) -> Self {
        Self {
            analyzer,
            concurrency: concurrency.max(1),
            timeout,
            on_failure,
        }
    }

    pub fn from_config(analyzer: Arc<dyn TextAnalyzer>, config: &EnrichmentConfig) -> Self {
        Self::new(
            analyzer,
            config.concurrency,
            Duration::from_secs(config.timeout_secs),
            config.on_failure,
        )
    }

    pub fn analyzer(&self) -> &Arc<dyn TextAnalyzer> {
        &self.analyzer
    }

    /// Annotate `records`, tolerating individual analyzer failures.
    pub async fn enrich(&self, records: Vec<Record>) -> EnrichmentOutcome {
        let scored: Vec<(usize, Record, Result<Option<Analysis>, AnalysisError>)> =
            stream::iter(records.into_iter().enumerate())
                .map(|(index, record)| async move {
                    let result = self.score(&record).await;
                    (index, record, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut outcome = EnrichmentOutcome::default();
        for (index, record, result) in scored {
            match result {
                Ok(Some(analysis)) => outcome
                    .records
                    .push(AnalyzedRecord::analyzed(record, analysis)),
                Ok(None) => outcome
                    .records
                    .push(AnalyzedRecord::unannotated(record, AnalysisStatus::NoText)),
                Err(e) => {
                    tracing::warn!(index, error = %e, policy = ?self.on_failure, "text analysis failed");
                    outcome.failures.push(EnrichmentFailure {
                        index,
                        error: e.to_string(),
                    });
                    if self.on_failure == FailurePolicy::Keep {
                        outcome
                            .records
                            .push(AnalyzedRecord::unannotated(record, AnalysisStatus::Failed));
                    }
                }
            }
        }
        outcome
    }

    /// `Ok(None)` means there was no text to analyze.
    async fn score(&self, record: &Record) -> Result<Option<Analysis>, AnalysisError> {
        if !record.has_text() {
            return Ok(None);
        }
        match tokio::time::timeout(self.timeout, self.analyzer.analyze(&record.text)).await {
            Ok(result) => result.map(Some),
            Err(_) => Err(AnalysisError::Timeout(self.timeout)),
        }
    }
}
