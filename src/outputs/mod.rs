//! Output writers for generated artifacts.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── headlines/
//! │   ├── headlines_2025-08-13T15-30-45Z.txt
//! │   └── headlines_log.jsonl
//! ├── voiceovers_audio/
//! │   └── voiceover_20250813_153045.mp3
//! ├── descriptions/social/tiktok/daily_caption.txt
//! └── runs/2025-08-13/cyprus_153045.json
//!
//! script_output_dir/
//! └── 2025-08-13_tech_brief_ai_script.txt
//! ```

pub mod json;

use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Write `content` to `path`, creating parent directories.
#[instrument(level = "debug", skip(content), fields(path = %path.display()))]
pub async fn write_text(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    debug!(bytes = content.len(), "Wrote text file");
    Ok(())
}

/// Write raw bytes to `path`, creating parent directories.
pub async fn write_bytes(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await
}

/// Append `record` as one JSON line to `path`.
#[instrument(level = "debug", skip(record), fields(path = %path.display()))]
pub async fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<(), crate::error::StageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_text_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("descriptions/social/tiktok/daily_caption.txt");
        write_text(&path, "caption").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "caption");
    }

    #[tokio::test]
    async fn test_append_jsonl_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("headlines/headlines_log.jsonl");
        append_jsonl(&path, &json!({"n": 1})).await.unwrap();
        append_jsonl(&path, &json!({"n": 2})).await.unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }
}
