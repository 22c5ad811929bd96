//! JSON run record.
//!
//! After a successful run the final [`PipelineState`] is written to
//! `{output_dir}/runs/{date}/{topic}_{HHMMSS}.json`, one file per run, so
//! every edition can be audited later.

use crate::models::PipelineState;
use chrono::Local;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `state` as a JSON run record under `output_dir`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.display(), topic = %state.topic))]
pub async fn write_run_record(
    state: &PipelineState,
    output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(state)?;

    let now = Local::now();
    let run_dir = output_dir
        .join("runs")
        .join(now.date_naive().format("%Y-%m-%d").to_string());

    info!(run_dir = %run_dir.display(), "Ensuring run record directory exists");
    if let Err(e) = fs::create_dir_all(&run_dir).await {
        error!(run_dir = %run_dir.display(), error = %e, "Failed to create run record dir");
        return Err(e.into());
    }

    let path = run_dir.join(format!("{}_{}.json", state.topic, now.format("%H%M%S")));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote run record");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;

    #[tokio::test]
    async fn test_run_record_round_trips_key_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PipelineState::new("cyprus", vec!["https://cyprus-mail.com".into()]);
        state.articles.push(
            Article::new("Title", "https://cyprus-mail.com/a", "Body").unwrap(),
        );
        state.summaries.push("Summary".into());

        let path = write_run_record(&state, dir.path()).await.unwrap();

        assert!(path.starts_with(dir.path().join("runs")));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("cyprus_"));
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["articles"][0]["url"], "https://cyprus-mail.com/a");
        assert_eq!(value["summaries"][0], "Summary");
    }
}
