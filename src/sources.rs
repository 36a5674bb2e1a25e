use anyhow::Result;
use globset::Glob;
use serde::Serialize;
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;

/// Health of one configured corpus source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub id: String,
    pub name: String,
    pub dir: PathBuf,
    pub exists: bool,
    /// Number of top-level files with the configured extension.
    pub files: usize,
}

pub fn get_sources(config: &Config) -> Result<Vec<SourceStatus>> {
    let matcher = Glob::new(&format!("*.{}", config.corpus.extension))?.compile_matcher();

    let mut statuses = Vec::with_capacity(config.corpus.sources.len());
    for source in &config.corpus.sources {
        let exists = source.dir.is_dir();
        let files = if exists {
            WalkDir::new(&source.dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && matcher.is_match(e.file_name()))
                .count()
        } else {
            0
        };
        statuses.push(SourceStatus {
            id: source.id.clone(),
            name: source.display_name().to_string(),
            dir: source.dir.clone(),
            exists,
            files,
        });
    }
    Ok(statuses)
}

pub fn list_sources(config: &Config) -> Result<()> {
    let statuses = get_sources(config)?;

    println!("{:<16} {:<24} {:<8} {:<6} DIR", "SOURCE", "NAME", "STATUS", "FILES");
    for s in statuses {
        let status = if !s.exists {
            "MISSING"
        } else if s.files == 0 {
            "EMPTY"
        } else {
            "OK"
        };
        println!(
            "{:<16} {:<24} {:<8} {:<6} {}",
            s.id,
            s.name,
            status,
            s.files,
            s.dir.display()
        );
    }

    Ok(())
}
