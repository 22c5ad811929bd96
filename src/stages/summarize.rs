//! One spoken-style summary per acquired article.

use crate::api::{AskAsync, generate};
use crate::error::StageError;
use crate::models::{Article, PipelineState};
use tracing::{debug, info, instrument};

/// Prompt asking for a short digest-style summary of `article`.
pub fn summary_prompt(article: &Article) -> String {
    format!(
        "You're an assistant helping someone stay informed via a daily digest.\n\
         Summarize the following news article in 5-6 sentences.\n\
         Highlight the key takeaway, and if possible, include why it might matter or be useful \
         for someone staying aware of important developments.\n\n\
         Title: {}\n\
         Content: {}\n\n\
         Summary:",
        article.title(),
        article.content()
    )
}

/// Fill `state.summaries`, same order as `state.articles`.
#[instrument(level = "info", skip_all, fields(articles = state.articles.len()))]
pub async fn summarize_articles<G>(
    mut state: PipelineState,
    generator: &G,
) -> Result<PipelineState, StageError>
where
    G: AskAsync<Response = String>,
{
    if state.articles.is_empty() {
        return Err(StageError::Precondition(
            "no articles were acquired; nothing to summarize".into(),
        ));
    }

    let mut summaries = Vec::with_capacity(state.articles.len());
    for (index, article) in state.articles.iter().enumerate() {
        let summary = generate(generator, &summary_prompt(article)).await?;
        debug!(index, url = %article.url(), chars = summary.len(), "Summarized article");
        summaries.push(summary);
    }

    info!(count = summaries.len(), "Summarized articles");
    state.summaries = summaries;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedAsk;

    fn state_with(n: usize) -> PipelineState {
        let mut state = PipelineState::new("cyprus", vec![]);
        for i in 0..n {
            state.articles.push(
                Article::new(format!("Title {i}"), format!("https://a.example/{i}"), format!("Body {i}"))
                    .unwrap(),
            );
        }
        state
    }

    #[tokio::test]
    async fn test_one_summary_per_article_in_order() {
        let ask = ScriptedAsk::replying(&["first", "second"]);
        let state = summarize_articles(state_with(2), &ask).await.unwrap();

        assert_eq!(state.summaries, vec!["first", "second"]);
        let prompts = ask.prompts.borrow();
        assert!(prompts[0].contains("Title: Title 0"));
        assert!(prompts[1].contains("Content: Body 1"));
    }

    #[tokio::test]
    async fn test_no_articles_is_a_precondition_failure() {
        let ask = ScriptedAsk::default();
        let err = summarize_articles(state_with(0), &ask).await.unwrap_err();
        assert!(matches!(err, StageError::Precondition(_)));
        assert_eq!(ask.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_fails_the_stage() {
        let ask = ScriptedAsk::replying(&["first"]).then_fail("quota");
        let err = summarize_articles(state_with(2), &ask).await.unwrap_err();
        assert!(matches!(err, StageError::Generation(_)));
    }
}
