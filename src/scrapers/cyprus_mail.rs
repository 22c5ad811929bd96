//! Cyprus Mail scraper.
//!
//! Listing pages (home page and category pages) render each story as an
//! `<article>` card with the headline and link inside. Article pages keep the
//! story text in `div#articleBody`.

use super::session::Session;
use super::{
    Adapter, Candidate, ExtractOptions, ParsedArticle, document_title, element_text, harvest,
    paragraphs, resolve_link,
};
use crate::error::ScrapeError;
use crate::models::Article;
use crate::seen::SeenStore;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, instrument};

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static CARD_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"h2[class*="articleTitle"], h2, h3"#).unwrap());
static CARD_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[class*="lnkTitle"][href]"#).unwrap());
static ANY_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
const BODY_SELECTOR: &str = "div#articleBody p";
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse(BODY_SELECTOR).unwrap());

#[derive(Debug, Clone)]
pub struct CyprusMail {
    opts: ExtractOptions,
}

impl CyprusMail {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { opts }
    }
}

impl Adapter for CyprusMail {
    fn name(&self) -> &'static str {
        "CyprusMail"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains("cyprus-mail.com")
    }

    #[instrument(level = "info", skip(self, session, seen))]
    async fn extract<S: Session>(
        &self,
        url: &str,
        session: &mut S,
        seen: &SeenStore,
    ) -> Result<Vec<Article>, ScrapeError> {
        let listing = session.goto(url, self.opts.nav_timeout).await?;
        let candidates = parse_listing(&listing.html, &listing.url, self.opts.limit);
        if candidates.is_empty() {
            return Err(ScrapeError::NoCandidates {
                url: url.to_string(),
            });
        }
        info!(count = candidates.len(), "Indexed Cyprus Mail candidates");

        let articles: Vec<Article> = harvest(
            self.name(),
            session,
            seen,
            candidates,
            &self.opts,
            parse_article,
        )
        .await
        .into_iter()
        .map(|h| h.article)
        .collect();

        info!(count = articles.len(), "Extracted Cyprus Mail articles");
        Ok(articles)
    }
}

/// Headline and link from the first `limit` story cards.
pub(crate) fn parse_listing(html: &str, base: &str, limit: usize) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    document
        .select(&CARD)
        .take(limit)
        .filter_map(|card| {
            let href = card
                .select(&CARD_LINK)
                .next()
                .or_else(|| card.select(&ANY_LINK).next())?
                .value()
                .attr("href")?;
            let url = resolve_link(base, href)?;
            let title = card
                .select(&CARD_TITLE)
                .next()
                .map(|t| element_text(&t))
                .filter(|t| !t.is_empty());
            Some(Candidate { url, title })
        })
        .collect()
}

pub(crate) fn parse_article(html: &str, url: &str) -> Result<ParsedArticle, ScrapeError> {
    let document = Html::parse_document(html);
    let content = paragraphs(&document, &BODY);
    if content.is_empty() {
        return Err(ScrapeError::MissingContent {
            url: url.to_string(),
            selector: BODY_SELECTOR.to_string(),
        });
    }
    Ok(ParsedArticle {
        title: document_title(&document).unwrap_or_default(),
        content,
        banner: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::{FakeSession, text_of_len};
    use tempfile::tempdir;

    fn card(slug: &str, title: &str) -> String {
        format!(
            r#"<article>
                 <a class="_lnkTitle_cekga_5" href="/2025/08/13/{slug}/">
                   <h2 class="_articleTitle_cekga_5"> {title} </h2>
                 </a>
               </article>"#
        )
    }

    fn article_page(body: &str) -> String {
        format!(
            r#"<html><head><title>Cyprus Mail page</title></head>
               <body><div id="articleBody"><p>{body}</p><p> </p></div></body></html>"#
        )
    }

    #[test]
    fn test_parse_listing_resolves_links_and_titles() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            card("one", "First story"),
            card("two", "Second story")
        );
        let candidates = parse_listing(&html, "https://cyprus-mail.com", 5);
        assert_eq!(
            candidates,
            vec![
                Candidate {
                    url: "https://cyprus-mail.com/2025/08/13/one/".into(),
                    title: Some("First story".into()),
                },
                Candidate {
                    url: "https://cyprus-mail.com/2025/08/13/two/".into(),
                    title: Some("Second story".into()),
                },
            ]
        );
    }

    #[test]
    fn test_parse_listing_respects_limit() {
        let cards: String = (0..8).map(|i| card(&format!("s{i}"), "T")).collect();
        let html = format!("<html><body>{cards}</body></html>");
        assert_eq!(parse_listing(&html, "https://cyprus-mail.com", 5).len(), 5);
    }

    #[test]
    fn test_parse_article_requires_body() {
        let err = parse_article("<html><body><p>elsewhere</p></body></html>", "u").unwrap_err();
        assert!(matches!(err, ScrapeError::MissingContent { .. }));

        let parsed = parse_article(&article_page("Nicosia news."), "u").unwrap();
        assert_eq!(parsed.content, "Nicosia news.");
    }

    #[tokio::test]
    async fn test_extract_uses_listing_titles_and_quality_gate() {
        let dir = tempdir().unwrap();
        let seen = SeenStore::load(dir.path().join("seen.json"));
        let listing = format!(
            "<html><body>{}{}</body></html>",
            card("long", "Long story"),
            card("short", "Short story")
        );
        let mut session = FakeSession::default()
            .with_page("https://cyprus-mail.com", &listing)
            .with_page(
                "https://cyprus-mail.com/2025/08/13/long/",
                &article_page(&text_of_len(250)),
            )
            .with_page(
                "https://cyprus-mail.com/2025/08/13/short/",
                &article_page(&text_of_len(150)),
            );

        let adapter = CyprusMail::new(ExtractOptions::default());
        let articles = adapter
            .extract("https://cyprus-mail.com", &mut session, &seen)
            .await
            .unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title(), "Long story");
        assert_eq!(articles[0].url(), "https://cyprus-mail.com/2025/08/13/long/");
    }

    #[tokio::test]
    async fn test_extract_fails_when_listing_unreachable() {
        let dir = tempdir().unwrap();
        let seen = SeenStore::load(dir.path().join("seen.json"));
        let mut session = FakeSession::default();
        let adapter = CyprusMail::new(ExtractOptions::default());
        let result = adapter
            .extract("https://cyprus-mail.com", &mut session, &seen)
            .await;
        assert!(matches!(result, Err(ScrapeError::Timeout { .. })));
    }
}
