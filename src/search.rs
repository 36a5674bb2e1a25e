//! Search orchestration.
//!
//! A [`SearchService`] owns everything a request needs: the corpus loader,
//! the stopword set, and the enrichment pipeline with its analyzer. One call
//! to [`SearchService::search`] runs the full flow:
//!
//! ```text
//! source dirs ─▶ CorpusLoader ─▶ Corpus ─▶ filter_corpus ─▶ EnrichmentPipeline ─▶ SearchResponse
//!                                           ▲
//!                           query ─▶ normalize (terms)
//! ```
//!
//! Under the `per_request` reload policy every search re-reads the selected
//! source directories. Under `startup` each source is read once and the
//! resulting [`Corpus`] is shared read-only between requests.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::{create_analyzer, TextAnalyzer};
use crate::config::{Config, ReloadPolicy, SourceConfig};
use crate::corpus::CorpusLoader;
use crate::enrich::{EnrichmentFailure, EnrichmentPipeline};
use crate::error::{DataSourceError, SearchError};
use crate::filter::{filter_corpus, FilterCriteria};
use crate::models::{AnalyzedRecord, Corpus, SkippedFile};
use crate::tokenizer::{self, Stopwords};

/// Raw search parameters, as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// Source ids; empty selects every configured source.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Year ranges such as `"2010_2014"`.
    #[serde(default)]
    pub time: Vec<String>,
}

impl SearchRequest {
    /// Build a request from comma-separated parameter strings.
    pub fn from_params(
        query: Option<&str>,
        sources: Option<&str>,
        platforms: Option<&str>,
        time: Option<&str>,
    ) -> Self {
        Self {
            query: query.unwrap_or_default().to_string(),
            sources: split_list(sources),
            platforms: split_list(platforms),
            time: split_list(time),
        }
    }
}

/// Split a comma-separated parameter. Absent or empty input gives an empty list.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(s) if !s.trim().is_empty() => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// The request's filter lists, echoed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct EchoedFilters {
    pub source: Vec<String>,
    #[serde(rename = "socialNetwork")]
    pub social_network: Vec<String>,
    pub time: Vec<String>,
}

/// Counters describing how the result set was produced.
#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub corpus_rows: usize,
    pub matched: usize,
    pub returned: usize,
    pub dropped: usize,
    pub failures: Vec<EnrichmentFailure>,
    pub rejected_ranges: Vec<String>,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    /// Normalized terms joined by a space.
    pub query: String,
    pub terms: Vec<String>,
    pub filters: EchoedFilters,
    pub results: Vec<AnalyzedRecord>,
    pub stats: SearchStats,
}

pub struct SearchService {
    config: Arc<Config>,
    loader: CorpusLoader,
    stopwords: Stopwords,
    pipeline: EnrichmentPipeline,
    cache: RwLock<HashMap<String, Arc<Corpus>>>,
}

impl SearchService {
    /// Build a service using the analyzer named in `[analyzer]`.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let analyzer = create_analyzer(&config.analyzer)?;
        Self::with_analyzer(config, analyzer)
    }

    /// Build a service around a caller-supplied analyzer.
    pub fn with_analyzer(config: Arc<Config>, analyzer: Arc<dyn TextAnalyzer>) -> Result<Self> {
        let stopwords = tokenizer::load_stopwords(&config.query)?;
        let loader = CorpusLoader::from_config(&config.corpus);
        let pipeline = EnrichmentPipeline::from_config(analyzer, &config.enrichment);
        Ok(Self {
            config,
            loader,
            stopwords,
            pipeline,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Initialize the analyzer and, under the `startup` policy, read every
    /// source. A source that fails here is retried on first use.
    pub async fn start(&self) -> Result<()> {
        self.pipeline.analyzer().initialize().await?;
        tracing::info!(analyzer = self.pipeline.analyzer().name(), "analyzer initialized");

        if self.config.corpus.reload == ReloadPolicy::Startup {
            for source in &self.config.corpus.sources {
                if let Err(e) = self.source_corpus(source).await {
                    tracing::warn!(source = %source.id, error = %e, "could not preload source");
                }
            }
        }
        Ok(())
    }

    /// Release the analyzer.
    pub async fn stop(&self) {
        if let Err(e) = self.pipeline.analyzer().shutdown().await {
            tracing::warn!(error = %e, "analyzer shutdown failed");
        }
    }

    /// Normalize a free-text query with the configured stopwords.
    pub fn terms(&self, query: &str) -> Vec<String> {
        tokenizer::normalize(query, &self.stopwords)
    }

    /// Resolve source ids against the configuration. Repeated ids select
    /// the source once.
    fn select_sources(&self, ids: &[String]) -> Result<Vec<&SourceConfig>, SearchError> {
        if ids.is_empty() {
            return Ok(self.config.corpus.sources.iter().collect());
        }
        let mut selected: Vec<&SourceConfig> = Vec::with_capacity(ids.len());
        for id in ids {
            let source = self
                .config
                .corpus
                .find_source(id)
                .ok_or_else(|| SearchError::UnknownSource(id.clone()))?;
            if !selected.iter().any(|s| s.id == source.id) {
                selected.push(source);
            }
        }
        Ok(selected)
    }

    async fn source_corpus(&self, source: &SourceConfig) -> Result<Arc<Corpus>, SearchError> {
        let cached = self.config.corpus.reload == ReloadPolicy::Startup;
        if cached {
            if let Some(corpus) = self.cache.read().await.get(&source.id) {
                return Ok(corpus.clone());
            }
        }

        let loader = self.loader.clone();
        let dir = source.dir.clone();
        let corpus = Arc::new(tokio::task::spawn_blocking(move || loader.load(&dir)).await??);

        if cached {
            self.cache
                .write()
                .await
                .insert(source.id.clone(), corpus.clone());
        }
        Ok(corpus)
    }

    /// Load and union the selected sources.
    ///
    /// A failing source is skipped while at least one other loads; if all
    /// fail, the first error is returned.
    pub async fn corpus(&self, source_ids: &[String]) -> Result<Arc<Corpus>, SearchError> {
        let selected = self.select_sources(source_ids)?;

        let mut parts = Vec::with_capacity(selected.len());
        let mut first_err: Option<DataSourceError> = None;
        for source in selected {
            match self.source_corpus(source).await {
                Ok(corpus) => parts.push(corpus),
                Err(SearchError::DataSource(e)) => {
                    tracing::warn!(source = %source.id, error = %e, "source unavailable");
                    first_err.get_or_insert(e);
                }
                Err(other) => return Err(other),
            }
        }

        match parts.len() {
            0 => Err(first_err
                .map(SearchError::DataSource)
                .unwrap_or_else(|| SearchError::UnknownSource(String::new()))),
            1 => Ok(parts.remove(0)),
            _ => {
                let mut union = Corpus::default();
                for part in parts {
                    union.extend(Corpus::clone(&part));
                }
                Ok(Arc::new(union))
            }
        }
    }

    /// Run the full search flow for one request.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let terms = self.terms(&request.query);
        tracing::debug!(?terms, "normalized query");

        let corpus = self.corpus(&request.sources).await?;

        let (criteria, rejected) =
            FilterCriteria::from_raw(&request.time, &request.platforms, &terms);
        let matched = filter_corpus(&corpus, &criteria)?;
        let matched_len = matched.len();

        let outcome = self.pipeline.enrich(matched).await;
        let dropped = outcome.dropped(matched_len);

        tracing::info!(
            corpus_rows = corpus.len(),
            matched = matched_len,
            returned = outcome.records.len(),
            dropped,
            "search complete"
        );

        Ok(SearchResponse {
            query: terms.join(" "),
            terms,
            filters: EchoedFilters {
                source: request.sources.clone(),
                social_network: request.platforms.clone(),
                time: request.time.clone(),
            },
            stats: SearchStats {
                corpus_rows: corpus.len(),
                matched: matched_len,
                returned: outcome.records.len(),
                dropped,
                failures: outcome.failures,
                rejected_ranges: rejected.iter().map(|e| e.token().to_string()).collect(),
                skipped_files: corpus.report.skipped.clone(),
            },
            results: outcome.records,
        })
    }
}
