//! On-screen headlines for the reel, one per story.

use crate::api::{AskAsync, generate};
use crate::error::StageError;
use crate::models::PipelineState;
use crate::outputs::{append_jsonl, write_text};
use crate::stages::script::{MAX_STORIES, MIN_SUMMARIES};
use crate::utils::{excerpt, looks_truncated, strip_code_fences, truncate_for_log};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Minimum number of headlines a usable response carries.
pub const MIN_HEADLINES: usize = 3;
const EXCERPT_CHARS: usize = 300;

static STRING_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)\[\s*".*?"\s*(?:,\s*".*?"\s*)*\]"#).unwrap());

#[derive(Debug, Serialize)]
struct HeadlineRecord<'a> {
    run_ts: &'a str,
    headlines: &'a [String],
    script_excerpt: String,
}

/// Numbered list of the first [`MAX_STORIES`] summaries.
fn numbered_summaries(summaries: &[String]) -> String {
    summaries
        .iter()
        .take(MAX_STORIES)
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn headline_prompt(script: &str, summaries: &[String]) -> String {
    format!(
        r#"You are writing on-screen headlines for a 60s short-form news reel.
Use the following voiceover script and the original summaries to create short, punchy, scannable headlines, one per story, in the SAME ORDER as the summaries.

Rules:
- 45-60 characters each (HARD limit 65), no hashtags.
- Front-load the key subject. Avoid clickbait and fluff.
- Use sentence case (not ALL CAPS).
- No ending periods.
- No emojis.
- Keep platform-safe wording.

Voiceover script:
---
{script}
---

Original summaries:
---
{summaries}
---

Return a JSON array of strings, order-aligned with the summaries, nothing else."#,
        script = script.trim(),
        summaries = numbered_summaries(summaries)
    )
}

/// Parse a model reply into headlines.
///
/// Code fences are stripped first. If the remainder is not a JSON string
/// array, the first string array embedded in it is tried instead.
pub fn parse_headlines(raw: &str) -> Result<Vec<String>, serde_json::Error> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<Vec<String>>(&cleaned) {
        Ok(headlines) => Ok(headlines),
        Err(e) => match STRING_ARRAY.find(&cleaned) {
            Some(m) => serde_json::from_str(m.as_str()),
            None => Err(e),
        },
    }
}

#[instrument(level = "info", skip_all, fields(summaries = state.summaries.len()))]
pub async fn generate_video_headlines<G>(
    mut state: PipelineState,
    generator: &G,
    output_dir: &Path,
) -> Result<PipelineState, StageError>
where
    G: AskAsync<Response = String>,
{
    let Some(script) = state.script_text.as_deref() else {
        return Err(StageError::Precondition(
            "script text is not generated yet".into(),
        ));
    };
    if state.summaries.len() < MIN_SUMMARIES {
        return Err(StageError::Precondition(format!(
            "need at least {MIN_SUMMARIES} summaries for headlines, have {}",
            state.summaries.len()
        )));
    }

    let prompt = headline_prompt(script, &state.summaries);
    let raw = generate(generator, &prompt).await?;
    let headlines = match parse_headlines(&raw) {
        Ok(h) => h,
        Err(e) if looks_truncated(&e) => {
            warn!(error = %e, response = %truncate_for_log(&raw, 200), "Headlines look truncated; asking again");
            let retry = generate(generator, &prompt).await?;
            parse_headlines(&retry)
                .map_err(|e| StageError::InvalidResponse(format!("headline JSON: {e}")))?
        }
        Err(e) => {
            return Err(StageError::InvalidResponse(format!(
                "headline JSON: {e}; response: {}",
                truncate_for_log(&raw, 200)
            )));
        }
    };

    if headlines.len() < MIN_HEADLINES {
        return Err(StageError::InvalidResponse(format!(
            "expected at least {MIN_HEADLINES} headlines, got {}",
            headlines.len()
        )));
    }

    let run_ts = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let dir = output_dir.join("headlines");

    let mut txt = format!("Tech Brief AI - Headlines ({run_ts} UTC)\n{}\n", "-".repeat(40));
    for (i, h) in headlines.iter().enumerate() {
        let _ = writeln!(txt, "{}. {}", i + 1, h);
    }
    let txt_path = dir.join(format!("headlines_{run_ts}.txt"));
    write_text(&txt_path, &txt).await?;

    append_jsonl(
        &dir.join("headlines_log.jsonl"),
        &HeadlineRecord {
            run_ts: &run_ts,
            headlines: &headlines,
            script_excerpt: excerpt(script, EXCERPT_CHARS),
        },
    )
    .await?;

    info!(count = headlines.len(), path = %txt_path.display(), "Headlines saved");
    state.video_headlines = headlines;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedAsk;

    fn ready_state() -> PipelineState {
        let mut state = PipelineState::new("tech", vec![]);
        state.script_text = Some("Big day in tech. ".repeat(30));
        state.summaries = vec!["one".into(), "two".into(), "three".into()];
        state
    }

    #[test]
    fn test_parse_plain_and_fenced_arrays() {
        assert_eq!(
            parse_headlines(r#"["A", "B", "C"]"#).unwrap(),
            vec!["A", "B", "C"]
        );
        assert_eq!(
            parse_headlines("```json\n[\"A\", \"B\"]\n```").unwrap(),
            vec!["A", "B"]
        );
    }

    #[test]
    fn test_parse_finds_embedded_array() {
        let raw = "Sure! Here you go:\n[\"Chips get faster\", \"Startup raises\"]\nEnjoy.";
        assert_eq!(
            parse_headlines(raw).unwrap(),
            vec!["Chips get faster", "Startup raises"]
        );
        assert!(parse_headlines("no json here").is_err());
    }

    #[test]
    fn test_prompt_numbers_at_most_five_summaries() {
        let summaries: Vec<String> = (1..=7).map(|i| format!("story {i}")).collect();
        let prompt = headline_prompt("script", &summaries);
        assert!(prompt.contains("1. story 1\n"));
        assert!(prompt.contains("5. story 5"));
        assert!(!prompt.contains("story 6"));
    }

    #[tokio::test]
    async fn test_headlines_written_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let ask = ScriptedAsk::replying(&[r#"["First", "Second", "Third"]"#]);

        let state = generate_video_headlines(ready_state(), &ask, dir.path())
            .await
            .unwrap();
        assert_eq!(state.video_headlines, vec!["First", "Second", "Third"]);

        let log = std::fs::read_to_string(dir.path().join("headlines/headlines_log.jsonl")).unwrap();
        let record: serde_json::Value = serde_json::from_str(log.trim()).unwrap();
        assert_eq!(record["headlines"][2], "Third");
        assert_eq!(record["script_excerpt"].as_str().unwrap().chars().count(), 300);

        let txt = std::fs::read_dir(dir.path().join("headlines"))
            .unwrap()
            .filter_map(|e| e.ok())
            .find(|e| e.file_name().to_string_lossy().ends_with(".txt"))
            .unwrap();
        let body = std::fs::read_to_string(txt.path()).unwrap();
        assert!(body.contains("\n1. First\n2. Second\n3. Third\n"));
    }

    #[tokio::test]
    async fn test_truncated_reply_is_asked_again() {
        let dir = tempfile::tempdir().unwrap();
        let ask = ScriptedAsk::replying(&[r#"["First", "Sec"#, r#"["A", "B", "C", "D"]"#]);
        let state = generate_video_headlines(ready_state(), &ask, dir.path())
            .await
            .unwrap();
        assert_eq!(state.video_headlines.len(), 4);
        assert_eq!(ask.calls(), 2);
    }

    #[tokio::test]
    async fn test_too_few_headlines_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ask = ScriptedAsk::replying(&[r#"["Only", "Two"]"#]);
        let err = generate_video_headlines(ready_state(), &ask, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_missing_script_fails_before_asking() {
        let dir = tempfile::tempdir().unwrap();
        let ask = ScriptedAsk::default();
        let mut state = ready_state();
        state.script_text = None;
        let err = generate_video_headlines(state, &ask, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Precondition(_)));
        assert_eq!(ask.calls(), 0);
    }
}
