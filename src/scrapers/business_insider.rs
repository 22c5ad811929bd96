//! Business Insider scraper.
//!
//! Section pages such as `/startups` list stories as `a.tout-title-link`
//! anchors, often with site-relative hrefs. Story text lives in
//! `div.article-content` inside the page's `<article>`.

use super::session::Session;
use super::{
    Adapter, Candidate, ExtractOptions, ParsedArticle, document_title, harvest, paragraphs,
    resolve_link,
};
use crate::error::ScrapeError;
use crate::models::Article;
use crate::seen::SeenStore;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, instrument};

const SITE_ROOT: &str = "https://www.businessinsider.com";

static TOUT_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.tout-title-link[href]").unwrap());
const BODY_SELECTOR: &str = "article div.article-content p";
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse(BODY_SELECTOR).unwrap());

#[derive(Debug, Clone)]
pub struct BusinessInsider {
    opts: ExtractOptions,
}

impl BusinessInsider {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { opts }
    }
}

impl Adapter for BusinessInsider {
    fn name(&self) -> &'static str {
        "BusinessInsider"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains("businessinsider.com")
    }

    #[instrument(level = "info", skip(self, session, seen))]
    async fn extract<S: Session>(
        &self,
        url: &str,
        session: &mut S,
        seen: &SeenStore,
    ) -> Result<Vec<Article>, ScrapeError> {
        let listing = session.goto(url, self.opts.nav_timeout).await?;
        let urls = parse_listing(&listing.html, self.opts.limit);
        if urls.is_empty() {
            return Err(ScrapeError::NoCandidates {
                url: url.to_string(),
            });
        }
        info!(count = urls.len(), "Indexed Business Insider candidates");

        let candidates = urls
            .into_iter()
            .map(|url| Candidate { url, title: None })
            .collect();
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

        info!(count = articles.len(), "Extracted Business Insider articles");
        Ok(articles)
    }
}

/// First `limit` story links, resolved against the site root.
pub(crate) fn parse_listing(html: &str, limit: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&TOUT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains('/'))
        .filter_map(|href| resolve_link(SITE_ROOT, href))
        .take(limit)
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
