//! Linear stage runner.
//!
//! A run threads one [`PipelineState`] through [`Stage::ALL`] in order. Each
//! stage consumes the state and hands back an extended one; the first stage
//! that fails ends the run with a [`PipelineFailure`] naming it.
//!
//! The runner knows nothing about what a stage does. [`NewsPipeline`] is the
//! executor that binds each [`Stage`] to its implementation.

use crate::acquire::{AcquirePolicy, Orchestrator};
use crate::api::AskAsync;
use crate::error::StageError;
use crate::models::PipelineState;
use crate::scrapers::session::HttpSession;
use crate::scrapers::{Registry, SiteAdapter};
use crate::seen::SeenStore;
use crate::stages::email::{PostmarkMailer, send_email};
use crate::stages::voiceover::{ElevenLabs, generate_voiceover_audio};
use crate::stages::{captions, headlines, script, summarize};
use crate::topics::{normalize_topic, sources_for_topic};
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, instrument};

/// One named step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ScrapeArticles,
    SummarizeArticles,
    SendEmail,
    GenerateVoiceoverScript,
    GenerateVoiceoverAudio,
    GenerateVideoHeadlines,
    GenerateDescriptions,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 7] = [
        Stage::ScrapeArticles,
        Stage::SummarizeArticles,
        Stage::SendEmail,
        Stage::GenerateVoiceoverScript,
        Stage::GenerateVoiceoverAudio,
        Stage::GenerateVideoHeadlines,
        Stage::GenerateDescriptions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::ScrapeArticles => "scrape_articles",
            Stage::SummarizeArticles => "summarize_articles",
            Stage::SendEmail => "send_email",
            Stage::GenerateVoiceoverScript => "generate_voiceover_script",
            Stage::GenerateVoiceoverAudio => "generate_voiceover_audio",
            Stage::GenerateVideoHeadlines => "generate_video_headlines",
            Stage::GenerateDescriptions => "generate_descriptions",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The stage that ended a run, and why.
#[derive(Debug, Error)]
#[error("stage {stage} failed: {source}")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

/// Binds stages to their implementations.
pub trait StageExecutor {
    async fn execute(
        &mut self,
        stage: Stage,
        state: PipelineState,
    ) -> Result<PipelineState, StageError>;
}

/// State for `topic`, or `None` when the topic has no sources and nothing should run.
pub fn initial_state(topic: &str) -> Option<PipelineState> {
    let topic = normalize_topic(topic);
    let sources = sources_for_topic(&topic);
    if sources.is_empty() {
        return None;
    }
    Some(PipelineState::new(topic, sources))
}

/// Run `stages` in order, stopping at the first failure.
#[instrument(level = "info", skip_all, fields(topic = %state.topic, stages = stages.len()))]
pub async fn run_stages<E: StageExecutor>(
    executor: &mut E,
    stages: &[Stage],
    mut state: PipelineState,
) -> Result<PipelineState, PipelineFailure> {
    for &stage in stages {
        let t0 = Instant::now();
        info!(%stage, "Stage starting");
        match executor.execute(stage, state).await {
            Ok(next) => {
                log_stage_metrics(stage, &next, t0.elapsed().as_millis() as u64);
                state = next;
            }
            Err(source) => {
                error!(%stage, elapsed_ms = t0.elapsed().as_millis() as u64, error = %source, "Stage failed; aborting run");
                return Err(PipelineFailure { stage, source });
            }
        }
    }
    Ok(state)
}

fn log_stage_metrics(stage: Stage, state: &PipelineState, elapsed_ms: u64) {
    match stage {
        Stage::ScrapeArticles => info!(%stage, elapsed_ms, articles = state.articles.len(), "Stage finished"),
        Stage::SummarizeArticles => info!(%stage, elapsed_ms, summaries = state.summaries.len(), "Stage finished"),
        Stage::SendEmail => info!(%stage, elapsed_ms, sent = state.email_sent, "Stage finished"),
        Stage::GenerateVoiceoverScript => info!(
            %stage,
            elapsed_ms,
            words = state.script_text.as_deref().map(crate::utils::count_words).unwrap_or(0),
            "Stage finished"
        ),
        Stage::GenerateVoiceoverAudio => info!(
            %stage,
            elapsed_ms,
            rendered = state.voiceover_path.is_some(),
            "Stage finished"
        ),
        Stage::GenerateVideoHeadlines => info!(%stage, elapsed_ms, headlines = state.video_headlines.len(), "Stage finished"),
        Stage::GenerateDescriptions => info!(%stage, elapsed_ms, descriptions = state.descriptions.len(), "Stage finished"),
    }
}

/// Where a run writes and how hard it tries to acquire.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: AcquirePolicy,
    pub output_dir: PathBuf,
    pub script_output_dir: PathBuf,
}

/// The production executor.
pub struct NewsPipeline<G> {
    pub registry: Registry<SiteAdapter>,
    pub seen: SeenStore,
    pub generator: G,
    pub mailer: Option<PostmarkMailer>,
    pub tts: Option<ElevenLabs>,
    pub settings: PipelineSettings,
}

impl<G> NewsPipeline<G>
where
    G: AskAsync<Response = String>,
{
    async fn scrape_articles(&mut self, mut state: PipelineState) -> Result<PipelineState, StageError> {
        let mut session = HttpSession::new()?;
        let mut orchestrator =
            Orchestrator::new(&self.registry, &mut self.seen, self.settings.policy.clone());
        let report = orchestrator.run(&state.sources, &mut session).await;
        info!(
            collected = report.articles.len(),
            passes = report.passes,
            attempted = report.sources_attempted,
            failures = report.source_failures,
            deadline_hit = report.deadline_hit,
            seen_total = self.seen.len(),
            "Acquisition report"
        );
        state.articles = report.articles;
        Ok(state)
    }
}

impl<G> StageExecutor for NewsPipeline<G>
where
    G: AskAsync<Response = String>,
{
    async fn execute(
        &mut self,
        stage: Stage,
        state: PipelineState,
    ) -> Result<PipelineState, StageError> {
        match stage {
            Stage::ScrapeArticles => self.scrape_articles(state).await,
            Stage::SummarizeArticles => summarize::summarize_articles(state, &self.generator).await,
            Stage::SendEmail => send_email(state, self.mailer.as_ref()).await,
            Stage::GenerateVoiceoverScript => {
                script::generate_voiceover_script(state, &self.generator, &self.settings.script_output_dir)
                    .await
            }
            Stage::GenerateVoiceoverAudio => {
                generate_voiceover_audio(state, self.tts.as_ref(), &self.settings.output_dir).await
            }
            Stage::GenerateVideoHeadlines => {
                headlines::generate_video_headlines(state, &self.generator, &self.settings.output_dir)
                    .await
            }
            Stage::GenerateDescriptions => {
                captions::generate_descriptions(state, &self.generator, &self.settings.output_dir).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedAsk;
    use crate::models::Article;
    use crate::scrapers::ExtractOptions;

    #[derive(Default)]
    struct RecordingExecutor {
        executed: Vec<Stage>,
        fail_at: Option<Stage>,
    }

    impl StageExecutor for RecordingExecutor {
        async fn execute(
            &mut self,
            stage: Stage,
            mut state: PipelineState,
        ) -> Result<PipelineState, StageError> {
            self.executed.push(stage);
            if self.fail_at == Some(stage) {
                return Err(StageError::Precondition(format!("{stage} not ready")));
            }
            state.summaries.push(stage.name().to_string());
            Ok(state)
        }
    }

    #[test]
    fn test_stage_names_follow_run_order() {
        let names: Vec<_> = Stage::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "scrape_articles",
                "summarize_articles",
                "send_email",
                "generate_voiceover_script",
                "generate_voiceover_audio",
                "generate_video_headlines",
                "generate_descriptions",
            ]
        );
    }

    #[tokio::test]
    async fn test_runs_every_stage_in_order() {
        let mut exec = RecordingExecutor::default();
        let state = run_stages(&mut exec, &Stage::ALL, PipelineState::new("tech", vec![]))
            .await
            .unwrap();
        assert_eq!(exec.executed, Stage::ALL.to_vec());
        assert_eq!(state.summaries.len(), 7);
    }

    #[tokio::test]
    async fn test_first_failure_aborts_run() {
        let mut exec = RecordingExecutor {
            fail_at: Some(Stage::SendEmail),
            ..Default::default()
        };
        let failure = run_stages(&mut exec, &Stage::ALL, PipelineState::new("tech", vec![]))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::SendEmail);
        assert!(matches!(failure.source, StageError::Precondition(_)));
        assert_eq!(
            exec.executed,
            vec![Stage::ScrapeArticles, Stage::SummarizeArticles, Stage::SendEmail]
        );
        assert!(failure.to_string().starts_with("stage send_email failed"));
    }

    #[test]
    fn test_unknown_topic_has_no_initial_state() {
        assert!(initial_state("sports").is_none());
        let state = initial_state("  Cyprus ").unwrap();
        assert_eq!(state.topic, "cyprus");
        assert_eq!(state.sources.len(), 1);
    }

    #[tokio::test]
    async fn test_downstream_chain_with_scripted_model() {
        let dir = tempfile::tempdir().unwrap();
        let script = "Coffee ready? Chips got faster. Startups raised money. Follow for more.";
        let ask = ScriptedAsk::replying(&[
            "Summary one.",
            "Summary two.",
            "Summary three.",
            script,
            script,
            r#"["Chips get faster", "Startups raise", "Cloud costs drop"]"#,
            "5 stories, 60 seconds #TechNews",
        ]);
        let mut pipeline = NewsPipeline {
            registry: Registry::standard(&ExtractOptions::default()),
            seen: SeenStore::load(dir.path().join("seen.json")),
            generator: ask,
            mailer: None,
            tts: None,
            settings: PipelineSettings {
                policy: AcquirePolicy::default(),
                output_dir: dir.path().join("output"),
                script_output_dir: dir.path().join("scripts"),
            },
        };

        let mut state = PipelineState::new("tech", vec![]);
        for i in 0..3 {
            state.articles.push(
                Article::new(format!("Story {i}"), format!("https://techcrunch.com/{i}"), "Body")
                    .unwrap(),
            );
        }

        let state = run_stages(&mut pipeline, &Stage::ALL[1..], state).await.unwrap();

        assert_eq!(state.summaries.len(), 3);
        assert!(!state.email_sent);
        assert!(state.script_text.is_some());
        assert!(state.voiceover_path.is_none());
        assert_eq!(state.video_headlines.len(), 3);
        assert_eq!(state.descriptions["tiktok"], "5 stories, 60 seconds #TechNews");
        assert_eq!(pipeline.generator.calls(), 7);
    }

    #[tokio::test]
    async fn test_summarize_without_articles_stops_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = NewsPipeline {
            registry: Registry::standard(&ExtractOptions::default()),
            seen: SeenStore::load(dir.path().join("seen.json")),
            generator: ScriptedAsk::default(),
            mailer: None,
            tts: None,
            settings: PipelineSettings {
                policy: AcquirePolicy::default(),
                output_dir: dir.path().join("output"),
                script_output_dir: dir.path().join("scripts"),
            },
        };
        let failure = run_stages(&mut pipeline, &Stage::ALL[1..], PipelineState::new("tech", vec![]))
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::SummarizeArticles);
        assert_eq!(pipeline.generator.calls(), 0);
    }
}
