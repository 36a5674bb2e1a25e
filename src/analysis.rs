//! Text analysis provider abstraction and implementations.
//!
//! Defines the [`TextAnalyzer`] trait and the concrete providers:
//! - **[`LexiconAnalyzer`]**: in-process VADER-style polarity scoring and a
//!   keyword emotion classifier. No external dependencies.
//! - **[`HttpAnalyzer`]**: delegates to an external scoring service, with
//!   timeout, retry and backoff.
//! - **[`DisabledAnalyzer`]**: always fails; used when analysis is switched off.
//!
//! # Provider Selection
//!
//! Use [`create_analyzer`] to instantiate the provider named in the
//! `[analyzer]` configuration section:
//!
//! ```rust
//! # use social_pulse::config::AnalyzerConfig;
//! # use social_pulse::analysis::create_analyzer;
//! let analyzer = create_analyzer(&AnalyzerConfig::default()).unwrap();
//! assert_eq!(analyzer.name(), "lexicon");
//! ```
//!
//! # Lifecycle
//!
//! Callers invoke [`TextAnalyzer::initialize`] once before the first
//! [`analyze`](TextAnalyzer::analyze) and [`TextAnalyzer::shutdown`] when done.
//! Implementations must tolerate concurrent `analyze` calls.
//!
//! # Retry Strategy
//!
//! The HTTP provider retries transient errors with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 250ms, 500ms, 1s, 2s (capped at 2^3)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::models::{Analysis, Emotion, SentimentScores};

/// A sentiment + emotion scoring capability.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Returns the provider identifier (e.g. `"lexicon"`).
    fn name(&self) -> &str;

    /// Prepare the provider (open clients, load models).
    async fn initialize(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Score one text.
    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError>;

    /// Release whatever [`initialize`](TextAnalyzer::initialize) acquired.
    async fn shutdown(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

// ============ Disabled Provider ============

/// An analyzer that always fails.
///
/// Used when `analyzer.provider = "disabled"`. Combined with
/// `enrichment.on_failure = "keep"` this returns plain filtered records.
pub struct DisabledAnalyzer;

#[async_trait]
impl TextAnalyzer for DisabledAnalyzer {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn analyze(&self, _text: &str) -> Result<Analysis, AnalysisError> {
        Err(AnalysisError::Disabled)
    }
}

// ============ Lexicon Provider ============

/// Scalar added to a word's valence by a preceding intensifier.
const BOOST: f64 = 0.293;
/// Factor applied to a word's valence when negated.
const NEGATION_SCALAR: f64 = -0.74;
/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;
/// Per-exclamation-mark emphasis, up to four marks.
const EXCLAMATION_BOOST: f64 = 0.292;

const VALENCE: &[(&str, f64)] = &[
    // English
    ("good", 1.9),
    ("great", 3.1),
    ("happy", 2.7),
    ("love", 3.2),
    ("loved", 2.9),
    ("excellent", 2.7),
    ("amazing", 2.8),
    ("wonderful", 2.7),
    ("nice", 1.8),
    ("calm", 1.3),
    ("hope", 1.9),
    ("hopeful", 2.3),
    ("better", 1.9),
    ("best", 3.2),
    ("fun", 2.3),
    ("glad", 2.0),
    ("thanks", 1.9),
    ("support", 1.7),
    ("bad", -2.5),
    ("sad", -2.1),
    ("terrible", -2.1),
    ("awful", -2.0),
    ("hate", -2.7),
    ("angry", -2.3),
    ("anxious", -1.0),
    ("anxiety", -0.7),
    ("depressed", -2.3),
    ("depression", -1.9),
    ("lonely", -1.5),
    ("afraid", -2.0),
    ("scared", -1.9),
    ("stress", -1.8),
    ("stressed", -1.4),
    ("tired", -1.9),
    ("worse", -2.1),
    ("worst", -3.1),
    ("cry", -2.1),
    ("pain", -2.3),
    ("hurt", -2.4),
    ("suicide", -3.5),
    // Spanish
    ("bueno", 1.9),
    ("buena", 1.9),
    ("bien", 1.6),
    ("feliz", 2.7),
    ("felicidad", 2.6),
    ("alegría", 2.6),
    ("alegre", 2.4),
    ("amor", 3.2),
    ("excelente", 2.7),
    ("genial", 2.8),
    ("maravilloso", 2.7),
    ("tranquilo", 1.3),
    ("tranquila", 1.3),
    ("esperanza", 1.9),
    ("mejor", 1.9),
    ("gracias", 1.9),
    ("apoyo", 1.7),
    ("divertido", 2.3),
    ("malo", -2.5),
    ("mala", -2.5),
    ("mal", -2.1),
    ("triste", -2.1),
    ("tristeza", -2.2),
    ("terrible", -2.1),
    ("horrible", -2.5),
    ("odio", -2.7),
    ("enojo", -2.3),
    ("enojado", -2.3),
    ("ansiedad", -0.7),
    ("ansioso", -1.0),
    ("ansiosa", -1.0),
    ("depresión", -1.9),
    ("deprimido", -2.3),
    ("deprimida", -2.3),
    ("soledad", -1.5),
    ("solo", -0.8),
    ("miedo", -2.0),
    ("estrés", -1.8),
    ("estresado", -1.4),
    ("cansado", -1.9),
    ("cansada", -1.9),
    ("peor", -2.1),
    ("llorar", -2.1),
    ("dolor", -2.3),
    ("suicidio", -3.5),
];

const BOOSTERS: &[&str] = &[
    "very", "really", "extremely", "so", "totally", "incredibly", "muy", "mucho", "muchísimo",
    "demasiado", "tan", "super", "súper", "bastante", "totalmente",
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "without", "cannot", "nunca", "jamás", "ni",
    "nada", "nadie", "tampoco", "sin",
];

const EMOTIONS: &[(&str, &[&str])] = &[
    (
        "sadness",
        &[
            "sad", "cry", "lonely", "depressed", "depression", "hurt", "grief", "triste",
            "tristeza", "llorar", "soledad", "deprimido", "deprimida", "depresión", "dolor",
        ],
    ),
    (
        "joy",
        &[
            "happy", "glad", "fun", "great", "excited", "feliz", "felicidad", "alegría", "alegre",
            "genial", "divertido", "contento", "contenta",
        ],
    ),
    (
        "love",
        &[
            "love", "loved", "caring", "adore", "amor", "querer", "quiero", "cariño", "adoro",
        ],
    ),
    (
        "anger",
        &[
            "angry", "hate", "furious", "mad", "rage", "annoyed", "enojo", "enojado", "odio",
            "rabia", "furia", "ira", "molesto",
        ],
    ),
    (
        "fear",
        &[
            "afraid", "scared", "fear", "anxious", "anxiety", "panic", "worried", "stress",
            "miedo", "ansiedad", "ansioso", "ansiosa", "pánico", "preocupado", "estrés", "temor",
        ],
    ),
    (
        "surprise",
        &[
            "surprised", "shocked", "amazed", "unexpected", "wow", "sorpresa", "sorprendido",
            "asombro", "increíble",
        ],
    ),
];

/// Label used when no emotion keyword appears in the text.
pub const NEUTRAL_EMOTION: &str = "neutral";

/// In-process sentiment and emotion scoring.
///
/// Polarity follows the VADER scheme: each lexicon word contributes its
/// valence (boosted by a preceding intensifier, flipped and damped by a
/// negation within the three previous words), exclamation marks add
/// emphasis, and the sum is squashed into `[-1, 1]` as
/// `x / sqrt(x² + 15)`. Emotion is the label whose keywords occur most
/// often; ties resolve in declaration order.
pub struct LexiconAnalyzer {
    valence: HashMap<&'static str, f64>,
}

impl LexiconAnalyzer {
    pub fn new() -> Self {
        Self {
            valence: VALENCE.iter().copied().collect(),
        }
    }

    /// Score a text synchronously.
    pub fn score(&self, text: &str) -> Analysis {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered.unicode_words().collect();
        Analysis {
            sentiment: self.polarity(&lowered, &words),
            emotion: classify_emotion(&words),
        }
    }

    fn polarity(&self, raw: &str, words: &[&str]) -> SentimentScores {
        let mut sentiments = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let Some(&base) = self.valence.get(word) else {
                sentiments.push(0.0);
                continue;
            };
            let mut valence = base;
            if i > 0 && BOOSTERS.contains(&words[i - 1]) {
                valence += BOOST * valence.signum();
            }
            let window = &words[i.saturating_sub(3)..i];
            if window.iter().any(|w| NEGATIONS.contains(w) || w.ends_with("n't")) {
                valence *= NEGATION_SCALAR;
            }
            sentiments.push(valence);
        }

        let mut sum: f64 = sentiments.iter().sum();
        let exclamations = raw.matches('!').count().min(4) as f64;
        if sum > 0.0 {
            sum += exclamations * EXCLAMATION_BOOST;
        } else if sum < 0.0 {
            sum -= exclamations * EXCLAMATION_BOOST;
        }
        let compound = if sum == 0.0 {
            0.0
        } else {
            (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
        };

        let mut pos_sum = 0.0;
        let mut neg_sum = 0.0;
        let mut neu_count = 0.0;
        for s in &sentiments {
            if *s > 0.0 {
                pos_sum += s + 1.0;
            } else if *s < 0.0 {
                neg_sum += s - 1.0;
            } else {
                neu_count += 1.0;
            }
        }
        let total = pos_sum + neg_sum.abs() + neu_count;
        if total == 0.0 {
            return SentimentScores {
                negative: 0.0,
                neutral: 0.0,
                positive: 0.0,
                compound: 0.0,
            };
        }

        SentimentScores {
            negative: round(neg_sum.abs() / total, 3),
            neutral: round(neu_count / total, 3),
            positive: round(pos_sum / total, 3),
            compound: round(compound, 4),
        }
    }
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_emotion(words: &[&str]) -> Emotion {
    let mut best: Option<(&str, usize)> = None;
    let mut total = 0usize;
    for (label, keywords) in EMOTIONS {
        let hits = words.iter().filter(|w| keywords.contains(*w)).count();
        total += hits;
        if hits > 0 && best.map_or(true, |(_, h)| hits > h) {
            best = Some((label, hits));
        }
    }

    match best {
        Some((label, hits)) => Emotion {
            label: label.to_string(),
            confidence: round(hits as f64 / total as f64, 4),
        },
        None => Emotion {
            label: NEUTRAL_EMOTION.to_string(),
            confidence: 0.0,
        },
    }
}

fn round(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[async_trait]
impl TextAnalyzer for LexiconAnalyzer {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        Ok(self.score(text))
    }
}

// ============ HTTP Provider ============

/// Analyzer backed by an external scoring service.
///
/// Sends `POST {url}` with `{"text": "..."}` and expects
/// `{"sentiment": {"neg","neu","pos","compound"}, "emotion": {"label","confidence"}}`.
/// The HTTP client is created by [`initialize`](TextAnalyzer::initialize) and
/// dropped by [`shutdown`](TextAnalyzer::shutdown).
pub struct HttpAnalyzer {
    url: String,
    timeout: Duration,
    max_retries: u32,
    client: RwLock<Option<reqwest::Client>>,
}

impl HttpAnalyzer {
    pub fn new(url: impl Into<String>, timeout: Duration, max_retries: u32) -> Self {
        Self {
            url: url.into(),
            timeout,
            max_retries,
            client: RwLock::new(None),
        }
    }

    fn client(&self) -> Result<reqwest::Client, AnalysisError> {
        self.client
            .read()
            .map_err(|_| AnalysisError::NotReady("client lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| AnalysisError::NotReady("HTTP analyzer not initialized".to_string()))
    }
}

#[async_trait]
impl TextAnalyzer for HttpAnalyzer {
    fn name(&self) -> &str {
        "http"
    }

    async fn initialize(&self) -> Result<(), AnalysisError> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let mut slot = self
            .client
            .write()
            .map_err(|_| AnalysisError::NotReady("client lock poisoned".to_string()))?;
        *slot = Some(client);
        Ok(())
    }

    async fn analyze(&self, text: &str) -> Result<Analysis, AnalysisError> {
        let client = self.client()?;
        let body = serde_json::json!({ "text": text });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms, 1s, 2s
                let delay = Duration::from_millis(250 << (attempt - 1).min(3));
                tokio::time::sleep(delay).await;
            }

            match client.post(&self.url).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_analysis_response(json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = AnalysisError::Service {
                        status: status.as_u16(),
                        body: body_text,
                    };

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }

                    // Client error (not 429): no retry
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| AnalysisError::InvalidResponse("no attempt was made".to_string())))
    }

    async fn shutdown(&self) -> Result<(), AnalysisError> {
        if let Ok(mut slot) = self.client.write() {
            slot.take();
        }
        Ok(())
    }
}

/// Parse the scoring service response.
fn parse_analysis_response(json: serde_json::Value) -> Result<Analysis, AnalysisError> {
    if json.get("sentiment").is_none() {
        return Err(AnalysisError::InvalidResponse(
            "missing sentiment object".to_string(),
        ));
    }
    if json.get("emotion").is_none() {
        return Err(AnalysisError::InvalidResponse(
            "missing emotion object".to_string(),
        ));
    }
    serde_json::from_value(json).map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
}

/// Create the [`TextAnalyzer`] named by the configuration.
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"lexicon"` | [`LexiconAnalyzer`] |
/// | `"http"` | [`HttpAnalyzer`] |
/// | `"disabled"` | [`DisabledAnalyzer`] |
pub fn create_analyzer(config: &AnalyzerConfig) -> Result<Arc<dyn TextAnalyzer>> {
    match config.provider.as_str() {
        "lexicon" => Ok(Arc::new(LexiconAnalyzer::new())),
        "disabled" => Ok(Arc::new(DisabledAnalyzer)),
        "http" => {
            let url = config
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("analyzer.url required for http provider"))?;
            Ok(Arc::new(HttpAnalyzer::new(
                url,
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )))
        }
        other => bail!("Unknown analyzer provider: {}", other),
    }
}
