//! TechCrunch scraper.
//!
//! The site root redirects readers to a hero layout, so a bare
//! `https://techcrunch.com` seed is read from `/latest/` instead. Category
//! pages are read as given. Both render stories as `.loop-card` blocks.

use super::session::Session;
use super::{
    Adapter, Candidate, ExtractOptions, ParsedArticle, document_title, download_banner, harvest,
    paragraphs, resolve_link,
};
use crate::error::ScrapeError;
use crate::models::Article;
use crate::seen::SeenStore;
use once_cell::sync::Lazy;
use rand::rng;
use rand::seq::SliceRandom;
use scraper::{Html, Selector};
use tracing::{info, instrument, warn};
use url::Url;

/// Cards considered before shuffling.
const LISTING_DEPTH: usize = 8;

static CARD_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".loop-card .loop-card__title-link[href]").unwrap());
const BODY_SELECTOR: &str = ".wp-block-post-content p, .entry-content p";
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse(BODY_SELECTOR).unwrap());
static BANNER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("figure.wp-block-post-featured-image img[src]").unwrap());

#[derive(Debug, Clone)]
pub struct TechCrunch {
    opts: ExtractOptions,
}

impl TechCrunch {
    pub fn new(opts: ExtractOptions) -> Self {
        Self { opts }
    }
}

impl Adapter for TechCrunch {
    fn name(&self) -> &'static str {
        "TechCrunch"
    }

    fn matches(&self, url: &str) -> bool {
        url.contains("techcrunch.com")
    }

    #[instrument(level = "info", skip(self, session, seen))]
    async fn extract<S: Session>(
        &self,
        url: &str,
        session: &mut S,
        seen: &SeenStore,
    ) -> Result<Vec<Article>, ScrapeError> {
        let listing_url = listing_url(url);
        let listing = session.goto(&listing_url, self.opts.nav_timeout).await?;
        let mut urls = parse_listing(&listing.html, &listing.url);
        if urls.is_empty() {
            return Err(ScrapeError::NoCandidates { url: listing_url });
        }
        urls.shuffle(&mut rng());
        info!(count = urls.len(), "Indexed TechCrunch candidates");

        let candidates = urls
            .into_iter()
            .map(|url| Candidate { url, title: None })
            .collect();
        let harvested = harvest(
            self.name(),
            session,
            seen,
            candidates,
            &self.opts,
            parse_article,
        )
        .await;

        let mut articles = Vec::with_capacity(harvested.len());
        for h in harvested {
            if let Some(banner) = &h.banner {
                if let Err(e) = download_banner(session, banner, &self.opts).await {
                    warn!(url = %h.article.url(), %banner, error = %e, "Banner download failed");
                }
            }
            articles.push(h.article);
        }

        info!(count = articles.len(), "Extracted TechCrunch articles");
        Ok(articles)
    }
}

/// Where to read the story list for a seed URL.
pub(crate) fn listing_url(seed: &str) -> String {
    match Url::parse(seed) {
        Ok(u) if u.path() == "/" || u.path().is_empty() => match u.join("/latest/") {
            Ok(latest) => latest.to_string(),
            Err(_) => seed.to_string(),
        },
        _ => seed.to_string(),
    }
}

/// Article links from the first [`LISTING_DEPTH`] cards.
pub(crate) fn parse_listing(html: &str, base: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&CARD_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(base, href))
        .take(LISTING_DEPTH)
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
    let banner = document
        .select(&BANNER)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| resolve_link(url, src));
    Ok(ParsedArticle {
        title: document_title(&document).unwrap_or_default(),
        content,
        banner,
    })
}
