use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::ANNOTATION_KEYS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub menu: MenuConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_common_columns")]
    pub common_columns: Vec<String>,
    #[serde(default)]
    pub reload: ReloadPolicy,
    pub sources: Vec<SourceConfig>,
}

fn default_extension() -> String {
    "csv".to_string()
}
fn default_delimiter() -> String {
    ";".to_string()
}
fn default_common_columns() -> Vec<String> {
    vec!["Year".to_string(), "Text".to_string(), "Platform".to_string()]
}

impl CorpusConfig {
    /// The delimiter as a single byte. Only valid after [`load_config`] has
    /// checked it.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b';')
    }

    pub fn find_source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}

/// When the corpus is read from disk.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Re-read every source directory for each search.
    #[default]
    PerRequest,
    /// Read once when the service starts and share the result.
    Startup,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub dir: PathBuf,
}

impl SourceConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_stopwords")]
    pub stopwords: String,
    #[serde(default)]
    pub stopwords_file: Option<PathBuf>,
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stopwords: default_stopwords(),
            stopwords_file: None,
            extra_stopwords: Vec::new(),
        }
    }
}

fn default_stopwords() -> String {
    "spanish".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyzerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_analyzer_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: None,
            timeout_secs: default_analyzer_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "lexicon".to_string()
}
fn default_analyzer_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_record_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_record_timeout(),
            on_failure: FailurePolicy::default(),
        }
    }
}

fn default_concurrency() -> usize {
    8
}
fn default_record_timeout() -> u64 {
    15
}

/// What happens to a record whose analyzer call fails.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Remove the record from the results.
    #[default]
    Drop,
    /// Return the record with null annotations and a `failed` status.
    Keep,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MenuConfig {
    #[serde(default = "default_menu_platforms")]
    pub platforms: Vec<MenuOptionConfig>,
    #[serde(default = "default_menu_time_ranges")]
    pub time_ranges: Vec<MenuOptionConfig>,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            platforms: default_menu_platforms(),
            time_ranges: default_menu_time_ranges(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MenuOptionConfig {
    pub id: String,
    pub name: String,
}

fn option(id: &str, name: &str) -> MenuOptionConfig {
    MenuOptionConfig {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn default_menu_platforms() -> Vec<MenuOptionConfig> {
    vec![
        option("facebook", "Facebook"),
        option("twitter", "X o Twitter"),
        option("instagram", "Instagram"),
    ]
}

fn default_menu_time_ranges() -> Vec<MenuOptionConfig> {
    vec![
        option("2010_2014", "2010-2014"),
        option("2015_2019", "2015-2019"),
        option("2020_2023", "2020-2023"),
    ]
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

fn validate(config: &Config) -> Result<()> {
    // Corpus
    let delimiter = &config.corpus.delimiter;
    if delimiter.len() != 1 || !delimiter.is_ascii() {
        anyhow::bail!(
            "corpus.delimiter must be a single ASCII character, got '{}'",
            delimiter
        );
    }
    let extension = &config.corpus.extension;
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        anyhow::bail!(
            "corpus.extension must be a plain file extension such as 'csv', got '{}'",
            extension
        );
    }
    if config.corpus.common_columns.is_empty() {
        anyhow::bail!("corpus.common_columns must not be empty");
    }
    for column in &config.corpus.common_columns {
        let name = column.trim().to_lowercase();
        if ANNOTATION_KEYS.contains(&name.as_str()) {
            anyhow::bail!(
                "corpus.common_columns: '{}' is reserved for analysis output",
                column
            );
        }
    }
    if config.corpus.sources.is_empty() {
        anyhow::bail!("at least one [[corpus.sources]] entry is required");
    }
    let mut seen = HashSet::new();
    for source in &config.corpus.sources {
        if source.id.trim().is_empty() {
            anyhow::bail!("corpus.sources[].id must not be empty");
        }
        if !seen.insert(source.id.as_str()) {
            anyhow::bail!("duplicate corpus source id: '{}'", source.id);
        }
    }

    // Query
    match config.query.stopwords.as_str() {
        "spanish" | "none" => {}
        other => anyhow::bail!(
            "Unknown stopword set: '{}'. Must be spanish or none.",
            other
        ),
    }

    // Enrichment
    if config.enrichment.concurrency == 0 {
        anyhow::bail!("enrichment.concurrency must be >= 1");
    }
    if config.enrichment.timeout_secs == 0 {
        anyhow::bail!("enrichment.timeout_secs must be >= 1");
    }

    // Analyzer
    match config.analyzer.provider.as_str() {
        "lexicon" | "disabled" => {}
        "http" => {
            if config.analyzer.url.is_none() {
                anyhow::bail!("analyzer.url must be specified when provider is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown analyzer provider: '{}'. Must be lexicon, http, or disabled.",
            other
        ),
    }

    Ok(())
}
