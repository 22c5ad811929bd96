//! Narration script for the 60-second reel.
//!
//! Two takes are generated from the top summaries and the one whose length
//! sits closest to [`TARGET_WORDS`] is kept, then reflowed so a TTS engine and
//! a human editor both get natural breath points.

use crate::api::{AskAsync, generate};
use crate::error::StageError;
use crate::models::PipelineState;
use crate::outputs::write_text;
use crate::utils::{count_words, normalize_whitespace};
use chrono::Utc;
use itertools::Itertools;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Word count a take should aim for (about 60 seconds of speech).
pub const TARGET_WORDS: usize = 165;
/// Fewer summaries than this cannot carry a reel.
pub const MIN_SUMMARIES: usize = 3;
/// Summaries used for the script.
pub const MAX_STORIES: usize = 5;
const TAKES: usize = 2;
const SENTENCES_PER_LINE: usize = 3;

/// Bullet list of the first [`MAX_STORIES`] summaries, whitespace-normalized
/// and without case-insensitive duplicates.
pub fn summaries_block(summaries: &[String]) -> String {
    summaries
        .iter()
        .take(MAX_STORIES)
        .map(|s| normalize_whitespace(s))
        .filter(|s| !s.is_empty())
        .unique_by(|s| s.to_lowercase())
        .map(|s| format!("- {s}"))
        .join("\n")
}

pub fn script_prompt(summaries_block: &str) -> String {
    format!(
        r#"You are the narrator for "Tech Brief AI" — daily 5 tech headlines in under 60 seconds.

Write ONE continuous voiceover script for ElevenLabs using the items below.

Hard rules (optimize for hooks & retention):
- Start with a *punchy HOOK* as a single short line: a bold claim or provocative question that teases stakes.
- Immediately jump into headline 1. No setup, no greeting.
- Within the first two lines, *tease a surprise at the end* to keep viewers watching.
- Tone: conversational, confident, modern.
- Sentences: short and punchy. Prefer commas, em dashes, ellipses for rhythm.
- Transitions: vary them ("Next up—", "Meanwhile—", "Also—", "Finally—").
- Keep total length 150–175 words (never exceed 180). No lists or numbering; make it flow.
- Do NOT include bracketed stage directions or speaker labels.
- End with a sharp CTA that reinforces the brand ritual: "Follow @techbrief.ai — 5 stories, 60 seconds. Coffee ready?"

Headlines:
{summaries_block}

Return only the script text. No preamble, no numbering, no quotes."#
    )
}

/// Normalize whitespace and put [`SENTENCES_PER_LINE`] sentences on each line.
pub fn postprocess_for_tts(text: &str) -> String {
    let normalized = normalize_whitespace(text);
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for word in normalized.split(' ').filter(|w| !w.is_empty()) {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        sentences.push(current.join(" "));
    }
    sentences
        .chunks(SENTENCES_PER_LINE)
        .map(|chunk| chunk.join(" "))
        .join("\n")
}

/// The take whose word count is closest to `target`; earlier takes win ties.
pub fn pick_closest(takes: &[String], target: usize) -> Option<&String> {
    takes
        .iter()
        .min_by_key(|t| count_words(t).abs_diff(target))
}

/// `{dir}/{YYYY-MM-DD}_tech_brief_ai_script.txt`, dated in UTC.
pub fn script_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "{}_tech_brief_ai_script.txt",
        Utc::now().format("%Y-%m-%d")
    ))
}

#[instrument(level = "info", skip_all, fields(summaries = state.summaries.len()))]
pub async fn generate_voiceover_script<G>(
    mut state: PipelineState,
    generator: &G,
    script_dir: &Path,
) -> Result<PipelineState, StageError>
where
    G: AskAsync<Response = String>,
{
    if state.summaries.len() < MIN_SUMMARIES {
        return Err(StageError::Precondition(format!(
            "need at least {MIN_SUMMARIES} summaries to build the script, have {}",
            state.summaries.len()
        )));
    }

    let prompt = script_prompt(&summaries_block(&state.summaries));
    let mut takes = Vec::with_capacity(TAKES);
    for _ in 0..TAKES {
        let raw = generate(generator, &prompt).await?;
        takes.push(postprocess_for_tts(&raw));
    }

    let best = pick_closest(&takes, TARGET_WORDS)
        .cloned()
        .ok_or_else(|| StageError::InvalidResponse("no script takes produced".into()))?;

    let path = script_path(script_dir);
    write_text(&path, &best).await?;
    info!(words = count_words(&best), path = %path.display(), "Voiceover script ready");

    state.script_text = Some(best);
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedAsk;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ") + "."
    }

    #[test]
    fn test_summaries_block_dedups_and_caps() {
        let summaries: Vec<String> = vec![
            "Apple  ships\nnew chips.".into(),
            "apple ships new chips.".into(),
            "Startup raises $10M.".into(),
            "A".into(),
            "B".into(),
            "C".into(),
            "D".into(),
        ];
        assert_eq!(
            summaries_block(&summaries),
            "- Apple ships new chips.\n- Startup raises $10M.\n- A\n- B"
        );
    }

    #[test]
    fn test_postprocess_groups_three_sentences_per_line() {
        let text = "One.  Two!\nThree? Four. Five";
        assert_eq!(postprocess_for_tts(text), "One. Two! Three?\nFour. Five");
    }

    #[test]
    fn test_pick_closest_prefers_target_length() {
        let takes = vec![words(120), words(170), words(200)];
        assert_eq!(count_words(pick_closest(&takes, 165).unwrap()), 170);
        assert!(pick_closest(&[], 165).is_none());
    }

    #[tokio::test]
    async fn test_script_written_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let long = words(300);
        let close = words(160);
        let ask = ScriptedAsk::replying(&[&long, &close]);
        let mut state = PipelineState::new("tech", vec![]);
        state.summaries = vec!["a".into(), "b".into(), "c".into()];

        let state = generate_voiceover_script(state, &ask, dir.path()).await.unwrap();

        let script = state.script_text.unwrap();
        assert_eq!(count_words(&script), 160);
        assert_eq!(ask.calls(), 2);
        let on_disk = std::fs::read_to_string(script_path(dir.path())).unwrap();
        assert_eq!(on_disk, script);
    }

    #[tokio::test]
    async fn test_too_few_summaries_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ask = ScriptedAsk::default();
        let mut state = PipelineState::new("tech", vec![]);
        state.summaries = vec!["a".into(), "b".into()];
        let err = generate_voiceover_script(state, &ask, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Precondition(_)));
    }
}
