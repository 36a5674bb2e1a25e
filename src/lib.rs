//! # Social Pulse
//!
//! Year-range, platform and keyword search over social-media text corpora,
//! with per-record sentiment and emotion annotation.
//!
//! Corpora are directories of delimited text files (one per export, with
//! differing schemas). Each search loads the selected directories into a
//! unified record set, narrows it with three conjunctive filters, and runs
//! every surviving record through a pluggable text analyzer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │ CSV sources │──▶│  Corpus  │──▶│  Filter  │──▶│  Enrichment  │
//! │ (per dir)   │   │  loader  │   │ y/p/text │   │  (analyzer)  │
//! └─────────────┘   └──────────┘   └────▲─────┘   └──────┬───────┘
//!                                       │                │
//!                               query ─▶ tokenizer       ▼
//!                                                ┌──────────────┐
//!                                                │ CLI / HTTP   │
//!                                                │ (pulse)      │
//!                                                └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed errors per pipeline stage |
//! | [`models`] | Records, corpus and analysis types |
//! | [`tokenizer`] | Query normalization and stopwords |
//! | [`corpus`] | Multi-file corpus loading |
//! | [`filter`] | Year, platform and text filtering |
//! | [`analysis`] | Text analyzer trait and providers |
//! | [`enrich`] | Concurrent, failure-tolerant enrichment |
//! | [`search`] | Request orchestration |
//! | [`sources`] | Source listing and health |
//! | [`menu`] | Filter menu metadata |
//! | [`server`] | HTTP API |

pub mod analysis;
pub mod config;
pub mod corpus;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod menu;
pub mod models;
pub mod search;
pub mod server;
pub mod sources;
pub mod tokenizer;
