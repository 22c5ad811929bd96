//! Social captions generated from the narration script.

use crate::api::{AskAsync, generate};
use crate::error::StageError;
use crate::models::PipelineState;
use crate::outputs::write_text;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const TIKTOK: &str = "tiktok";

pub fn tiktok_prompt(script: &str) -> String {
    format!(
        r#"You are writing a TikTok video caption for a daily tech news reel.

Guidelines:
- Tone: punchy, modern, trend-friendly.
- Keep it under 100 characters.
- Use emojis naturally.
- Add 3-4 relevant trending hashtags (e.g., #TechNews, #AI, #Startups, #Innovation).
- No hashtags in the middle of the sentence; put them at the end.
- Make it feel like a hook, not a summary.

Script:
{script}

Return only the caption text."#
    )
}

/// `{output_dir}/descriptions/social/{platform}/daily_caption.txt`
pub fn caption_path(output_dir: &Path, platform: &str) -> PathBuf {
    output_dir
        .join("descriptions")
        .join("social")
        .join(platform)
        .join("daily_caption.txt")
}

#[instrument(level = "info", skip_all)]
pub async fn generate_descriptions<G>(
    mut state: PipelineState,
    generator: &G,
    output_dir: &Path,
) -> Result<PipelineState, StageError>
where
    G: AskAsync<Response = String>,
{
    let Some(script) = state.script_text.as_deref() else {
        return Err(StageError::Precondition("script text is missing".into()));
    };

    let caption = generate(generator, &tiktok_prompt(script)).await?;
    let path = caption_path(output_dir, TIKTOK);
    write_text(&path, &caption).await?;
    info!(platform = TIKTOK, chars = caption.chars().count(), "Caption saved");

    state.descriptions.insert(TIKTOK.to_string(), caption);
    Ok(state)
}
