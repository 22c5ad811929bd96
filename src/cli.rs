//! Command-line interface definitions for News Brief.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can also be provided through an environment variable, and
//! `main` loads a `.env` file before parsing.

use crate::acquire::AcquirePolicy;
use crate::scrapers::ExtractOptions;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the News Brief pipeline.
///
/// # Examples
///
/// ```sh
/// # Default topic ("tech")
/// news_brief
///
/// # Cyprus news, fewer articles, fresh seen-URL ledger
/// MIN_TOTAL_ARTICLES=3 news_brief cyprus --clear-seen
///
/// # With email and voiceover enabled
/// POSTMARK_SERVER_TOKEN=... DIGEST_FROM=desk@example.com DIGEST_TO=me@example.com \
/// ELEVENLABS_API_KEY=... news_brief techcrunch-latest
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic to build the brief for
    #[arg(default_value = "tech")]
    pub topic: String,

    /// Stop acquiring once this many new articles are collected
    #[arg(long, env = "MIN_TOTAL_ARTICLES", default_value_t = 5)]
    pub min_total_articles: usize,

    /// Maximum passes over the source list
    #[arg(long, env = "MAX_PASSES", default_value_t = 2)]
    pub max_passes: usize,

    /// Candidate articles attempted per source
    #[arg(long, env = "ARTICLES_PER_SOURCE", default_value_t = 5)]
    pub articles_per_source: usize,

    /// Article bodies shorter than this many characters are discarded
    #[arg(long, env = "MIN_CONTENT_CHARS", default_value_t = 200)]
    pub min_content_chars: usize,

    /// Timeout for each page load, in seconds
    #[arg(long, env = "NAV_TIMEOUT_SECS", default_value_t = 30)]
    pub nav_timeout_secs: u64,

    /// Wall-clock budget for acquisition, in seconds (0 disables)
    #[arg(long, env = "ACQUIRE_DEADLINE_SECS", default_value_t = 600)]
    pub acquire_deadline_secs: u64,

    /// JSON file recording every URL already processed
    #[arg(long, env = "SEEN_URLS_FILE", default_value = ".seen_urls.json")]
    pub seen_urls_file: PathBuf,

    /// Root folder for downloaded banner images
    #[arg(long, env = "ASSETS_DIR", default_value = "assets")]
    pub assets_dir: PathBuf,

    /// Output directory for headlines, audio, captions and run records
    #[arg(short, long, env = "OUTPUT_DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Output directory for the narration script
    #[arg(long, env = "SCRIPT_OUTPUT_DIR", default_value = "output")]
    pub script_output_dir: PathBuf,

    /// Optional path to the awful_aj config.yaml file
    #[arg(short, long, env = "AJ_CONFIG")]
    pub config: Option<String>,

    /// awful_aj chat template used for every generation
    #[arg(short, long, env = "AJ_TEMPLATE", default_value = "news_brief")]
    pub template: String,

    /// ElevenLabs API key (voiceover audio is skipped without it)
    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<String>,

    /// ElevenLabs voice used for narration
    #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = "xAVsdcJvD1uegu8lFEE2")]
    pub elevenlabs_voice_id: String,

    /// Postmark server token (the digest email is skipped without it)
    #[arg(long, env = "POSTMARK_SERVER_TOKEN", hide_env_values = true)]
    pub postmark_server_token: Option<String>,

    /// Sender address for the digest email
    #[arg(long, env = "DIGEST_FROM")]
    pub digest_from: Option<String>,

    /// Recipient address for the digest email
    #[arg(long, env = "DIGEST_TO")]
    pub digest_to: Option<String>,

    /// Forget every previously seen URL before running
    #[arg(long)]
    pub clear_seen: bool,
}

impl Cli {
    pub fn acquire_policy(&self) -> AcquirePolicy {
        AcquirePolicy {
            min_total: self.min_total_articles,
            max_passes: self.max_passes,
            deadline: (self.acquire_deadline_secs > 0)
                .then(|| Duration::from_secs(self.acquire_deadline_secs)),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            limit: self.articles_per_source,
            min_content_chars: self.min_content_chars,
            nav_timeout: Duration::from_secs(self.nav_timeout_secs),
            assets_dir: self.assets_dir.clone(),
        }
    }

    /// Token, sender and recipient, when all three are set.
    pub fn postmark(&self) -> Option<(&str, &str, &str)> {
        Some((
            self.postmark_server_token.as_deref()?,
            self.digest_from.as_deref()?,
            self.digest_to.as_deref()?,
        ))
    }
}
