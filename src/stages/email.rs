//! Digest email delivered through the Postmark HTTP API.
//!
//! The digest lists every article with its summary and a link. Delivery is
//! optional: without a server token and addresses the stage logs and moves
//! on. A configured mailer that fails to deliver fails the stage.

use crate::error::StageError;
use crate::models::PipelineState;
use crate::utils::topic_title;
use serde::Serialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{info, instrument, warn};

const POSTMARK_API: &str = "https://api.postmarkapp.com";
const SUBJECT: &str = "Daily News Insights";

/// Postmark client for a single sender/recipient pair.
#[derive(Debug, Clone)]
pub struct PostmarkMailer {
    client: reqwest::Client,
    server_token: String,
    from: String,
    to: String,
    base_url: String,
}

#[allow(non_snake_case)]
#[derive(Debug, Serialize)]
struct PostmarkEmail<'a> {
    From: &'a str,
    To: &'a str,
    Subject: &'a str,
    HtmlBody: &'a str,
    TextBody: &'a str,
    MessageStream: &'a str,
}

impl PostmarkMailer {
    pub fn new(
        server_token: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, StageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            server_token: server_token.into(),
            from: from.into(),
            to: to.into(),
            base_url: POSTMARK_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[instrument(level = "info", skip(self, html, text), fields(to = %self.to))]
    pub async fn send(&self, subject: &str, html: &str, text: &str) -> Result<(), StageError> {
        let body = PostmarkEmail {
            From: &self.from,
            To: &self.to,
            Subject: subject,
            HtmlBody: html,
            TextBody: text,
            MessageStream: "outbound",
        };
        let resp = self
            .client
            .post(format!("{}/email", self.base_url))
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StageError::Rejected {
                service: "postmark",
                status: status.as_u16(),
                body,
            });
        }
        info!("Digest email accepted by Postmark");
        Ok(())
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// HTML digest: one section per article with its summary and link.
pub fn digest_html(state: &PipelineState) -> String {
    let mut html = format!(
        "<h2>🧠 Daily Digest: {}</h2>",
        escape_html(&topic_title(&state.topic))
    );
    for (article, summary) in state.articles.iter().zip(&state.summaries) {
        let _ = write!(
            html,
            "\n<h3>{}</h3>\n<p>{}</p>\n<p><a href=\"{}\">Read full article</a></p>\n<hr>",
            escape_html(article.title()),
            escape_html(summary),
            escape_html(article.url())
        );
    }
    html
}

/// Plain-text rendering of the same digest.
pub fn digest_text(state: &PipelineState) -> String {
    let mut body = format!("🗞️ Daily Digest for topic: {}\n\n", topic_title(&state.topic));
    for (article, summary) in state.articles.iter().zip(&state.summaries) {
        let _ = write!(body, "🔹 {}\n{}\n🔗 {}\n\n", article.title(), summary, article.url());
    }
    body
}

/// Send the digest if a mailer is configured.
#[instrument(level = "info", skip_all, fields(summaries = state.summaries.len()))]
pub async fn send_email(
    mut state: PipelineState,
    mailer: Option<&PostmarkMailer>,
) -> Result<PipelineState, StageError> {
    if state.summaries.is_empty() {
        return Err(StageError::Precondition("no summaries to send".into()));
    }

    let Some(mailer) = mailer else {
        warn!("Postmark is not configured; skipping digest email");
        return Ok(state);
    };

    mailer
        .send(SUBJECT, &digest_html(&state), &digest_text(&state))
        .await?;
    state.email_sent = true;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn digest_state() -> PipelineState {
        let mut state = PipelineState::new("cyprus-tech", vec![]);
        state.articles.push(
            Article::new("Chips & <Cyprus>", "https://cyprus-mail.com/a", "Body").unwrap(),
        );
        state.articles.push(Article::new("Second", "https://cyprus-mail.com/b", "Body").unwrap());
        state.summaries = vec!["Summary A".into(), "Summary B".into()];
        state
    }

    #[test]
    fn test_digest_html_lists_articles_and_escapes() {
        let html = digest_html(&digest_state());
        assert!(html.starts_with("<h2>🧠 Daily Digest: Cyprus Tech</h2>"));
        assert!(html.contains("<h3>Chips &amp; &lt;Cyprus&gt;</h3>"));
        assert!(html.contains("<a href=\"https://cyprus-mail.com/b\">"));
        assert_eq!(html.matches("<hr>").count(), 2);
    }

    #[test]
    fn test_digest_text_pairs_titles_with_summaries() {
        let text = digest_text(&digest_state());
        assert!(text.contains("🔹 Second\nSummary B\n🔗 https://cyprus-mail.com/b"));
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_skips() {
        let state = send_email(digest_state(), None).await.unwrap();
        assert!(!state.email_sent);
    }

    #[tokio::test]
    async fn test_send_posts_to_postmark() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/email"))
            .and(header("X-Postmark-Server-Token", "token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ErrorCode\":0}"))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = PostmarkMailer::new("token-123", "desk@example.com", "reader@example.com")
            .unwrap()
            .with_base_url(server.uri());
        let state = send_email(digest_state(), Some(&mailer)).await.unwrap();
        assert!(state.email_sent);

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["Subject"], "Daily News Insights");
        assert_eq!(body["To"], "reader@example.com");
    }

    #[tokio::test]
    async fn test_rejected_delivery_fails_the_stage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad sender"))
            .mount(&server)
            .await;

        let mailer = PostmarkMailer::new("t", "f@example.com", "t@example.com")
            .unwrap()
            .with_base_url(server.uri());
        let err = send_email(digest_state(), Some(&mailer)).await.unwrap_err();
        assert!(matches!(err, StageError::Rejected { status: 422, .. }));
    }
}
