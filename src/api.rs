//! LLM text generation with multiplicative backoff retry logic.
//!
//! Every downstream stage sees the model as one operation: send a prompt,
//! get text back. This module provides that operation over an
//! OpenAI-compatible endpoint configured through `awful_aj`, plus a retry
//! decorator that absorbs transient failures.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`AskFnWrapper`]: Wraps the `awful_aj` library's `ask` function
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//! - [`generate`]: Stage-facing entry point that maps failures to [`StageError`]
//!
//! # Retry Strategy
//!
//! - Configurable retry count (3 for stage generation)
//! - Delay starts at `base_delay` and is multiplied by `multiplier` after each failure
//! - Maximum delay capped at 30 seconds
//! - Optional random jitter to spread out retries

use crate::error::StageError;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds multiplicative backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * multiplier^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
/// After `max_retries` retries the last error is returned.
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    multiplier: f64,
    max_delay: StdDuration,
    max_jitter: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner` with `max_retries` retries starting at `base_delay`.
    ///
    /// Defaults: delay doubles per attempt, capped at 30s, up to 250ms jitter.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            multiplier: 2.0,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    fn delay_for(&self, attempt: usize) -> StdDuration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            StdDuration::from_secs_f64(scaled)
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("multiplier", &self.multiplier)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms = self.max_jitter.as_millis() as u64;
                    let jitter = if jitter_ms == 0 {
                        StdDuration::ZERO
                    } else {
                        StdDuration::from_millis(rng().random_range(0..=jitter_ms))
                    };
                    let delay = self.delay_for(attempt) + jitter;

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Wrapper around `awful_aj::api::ask` that implements [`AskAsync`].
///
/// Blank completions are reported as errors so the retry decorator treats
/// them like any other failed call.
#[derive(Debug)]
pub struct AskFnWrapper<'a> {
    /// Reference to the LLM configuration (API keys, endpoints, model settings).
    pub config: &'a AwfulJadeConfig,
    /// Reference to the chat template defining the system prompt.
    pub template: &'a ChatTemplate,
}

impl<'a> AskAsync for AskFnWrapper<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        let dt = t0.elapsed();

        match res {
            Ok(content) if content.trim().is_empty() => {
                warn!(elapsed_ms = dt.as_millis() as u64, "API returned empty content");
                Err("empty completion".into())
            }
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "API call failed");
                Err(e)
            }
        }
    }
}

/// Send `prompt` through `generator`, mapping failures into [`StageError`].
///
/// This is the only way stages talk to the model.
#[instrument(level = "info", skip_all, fields(prompt_chars = prompt.len()))]
pub async fn generate<G>(generator: &G, prompt: &str) -> Result<String, StageError>
where
    G: AskAsync<Response = String>,
{
    let t0 = Instant::now();
    let res = generator.ask(prompt).await;
    let dt = t0.elapsed();

    match res {
        Ok(text) if text.trim().is_empty() => {
            Err(StageError::Generation("model returned empty text".into()))
        }
        Ok(text) => {
            info!(elapsed_ms_total = dt.as_millis() as u64, chars = text.len(), "generate succeeded");
            Ok(text.trim().to_string())
        }
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u64, error = %e, "generate failed");
            Err(StageError::Generation(e.to_string()))
        }
    }
}
