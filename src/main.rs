//! # News Brief
//!
//! A topic-driven news pipeline: it scrapes fresh articles from a small set
//! of news sites, skips anything processed on an earlier run, and turns the
//! rest into a digest email, a 60-second narration script with audio,
//! on-screen headlines and a social caption.
//!
//! ## Usage
//!
//! ```sh
//! news_brief cyprus
//! ```
//!
//! ## Architecture
//!
//! The application runs a fixed sequence of stages over one evolving state:
//! 1. **Acquisition**: multi-pass scraping of the topic's sources, deduplicated
//!    against a durable seen-URL ledger
//! 2. **Summarization**: one LLM summary per article
//! 3. **Dispatch**: digest email via Postmark
//! 4. **Media**: narration script, ElevenLabs voiceover, headlines, caption
//!
//! The first failing stage aborts the run with a non-zero exit.

use awful_aj::{config, config_dir, template};
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod acquire;
mod api;
mod cli;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod seen;
mod stages;
mod topics;
mod utils;

use api::{AskFnWrapper, RetryAsk};
use cli::Cli;
use outputs::json;
use pipeline::{NewsPipeline, PipelineSettings, Stage, initial_state, run_stages};
use scrapers::Registry;
use seen::SeenStore;
use stages::email::PostmarkMailer;
use stages::voiceover::ElevenLabs;
use topics::supported_topics;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_brief starting up");

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => warn!(error = %e, "Failed to read .env; continuing with process environment"),
    }

    // Parse CLI
    let args = Cli::parse();
    debug!(topic = %args.topic, output_dir = %args.output_dir.display(), "Parsed CLI arguments");

    // ---- Topic lookup ----
    let Some(state) = initial_state(&args.topic) else {
        error!(
            topic = %args.topic,
            supported = %supported_topics().join(", "),
            "No sources configured for topic; nothing to do"
        );
        return Ok(());
    };
    info!(topic = %state.topic, sources = state.sources.len(), "Topic resolved");

    // ---- Seen-URL ledger ----
    let mut seen = SeenStore::load(&args.seen_urls_file);
    if args.clear_seen {
        seen.clear();
    }

    // Early check: ensure output dirs are writable
    for dir in [&args.output_dir, &args.script_output_dir] {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    // ---- Load template & config ----
    let template = template::load_template(&args.template).await?;
    info!(template = %args.template, "Loaded template");
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml").to_string_lossy().into_owned(),
    };
    let config = config::load_config(&config_path)
        .map_err(|e| format!("failed to load awful_aj config {config_path}: {e}"))?;
    info!(config_path = %config_path, "Loaded configuration");

    let generator = RetryAsk::new(
        AskFnWrapper {
            config: &config,
            template: &template,
        },
        3,
        Duration::from_secs(1),
    )
    .with_multiplier(1.7);

    // ---- Optional collaborators ----
    let mailer = match args.postmark() {
        Some((token, from, to)) => Some(PostmarkMailer::new(token, from, to)?),
        None => {
            info!("Postmark not configured (POSTMARK_SERVER_TOKEN, DIGEST_FROM, DIGEST_TO)");
            None
        }
    };
    let tts = match args.elevenlabs_api_key.as_deref() {
        Some(key) => Some(ElevenLabs::new(key, args.elevenlabs_voice_id.as_str())?),
        None => {
            info!("ElevenLabs not configured (ELEVENLABS_API_KEY)");
            None
        }
    };

    let mut pipeline = NewsPipeline {
        registry: Registry::standard(&args.extract_options()),
        seen,
        generator,
        mailer,
        tts,
        settings: PipelineSettings {
            policy: args.acquire_policy(),
            output_dir: args.output_dir.clone(),
            script_output_dir: args.script_output_dir.clone(),
        },
    };

    // ---- Run ----
    info!(adapters = pipeline.registry.len(), seen = pipeline.seen.len(), "Pipeline ready");
    let state = run_stages(&mut pipeline, &Stage::ALL, state).await?;

    if let Err(e) = json::write_run_record(&state, &args.output_dir).await {
        error!(error = %e, "Failed to write run record");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = state.articles.len(),
        seen_total = pipeline.seen.len(),
        "Execution complete"
    );

    Ok(())
}
