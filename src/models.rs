//! Data models threaded through the pipeline.
//!
//! - [`Article`]: an extracted news article, immutable once built
//! - [`PipelineState`]: the record each stage receives, extends and returns

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A scraped article that passed extraction.
///
/// The URL is the article's identity for deduplication. Construction goes
/// through [`Article::new`], which refuses empty titles, URLs or bodies, and
/// the fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    title: String,
    url: String,
    content: String,
}

impl Article {
    /// Build an article, trimming the title. Returns `None` when any field is blank.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Option<Self> {
        let title = title.into().trim().to_string();
        let url = url.into();
        let content = content.into();
        if title.is_empty() || url.trim().is_empty() || content.trim().is_empty() {
            return None;
        }
        Some(Self {
            title,
            url,
            content,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The evolving result of one run.
///
/// Owned by the stage runner; acquisition fills `articles`, later stages fill
/// the remaining fields in order.
#[derive(Debug, Default, Serialize)]
pub struct PipelineState {
    /// Normalized topic name.
    pub topic: String,
    /// Source URLs configured for the topic, in visiting order.
    pub sources: Vec<String>,
    /// Newly acquired articles.
    pub articles: Vec<Article>,
    /// One summary per article, same order.
    pub summaries: Vec<String>,
    /// Whether the digest email went out.
    pub email_sent: bool,
    /// Narration script for the reel.
    pub script_text: Option<String>,
    /// Rendered narration audio, if a TTS backend was configured.
    pub voiceover_path: Option<PathBuf>,
    /// On-screen headlines, aligned with `summaries`.
    pub video_headlines: Vec<String>,
    /// Social captions keyed by platform.
    pub descriptions: BTreeMap<String, String>,
}

impl PipelineState {
    pub fn new(topic: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            topic: topic.into(),
            sources,
            ..Default::default()
        }
    }
}
