//! Source adapters for the supported publications.
//!
//! Each adapter knows how to walk one site: open a listing page, pick the
//! first few article links, and pull title and body text from each article.
//! Adapters share one [`Session`] and report per-candidate problems in the
//! log instead of failing; only a broken listing page fails the source.
//!
//! # Supported Sources
//!
//! | Source | Module | Matches | Notes |
//! |--------|--------|---------|-------|
//! | Cyprus Mail | [`cyprus_mail`] | `cyprus-mail.com` | Titles come from the listing cards |
//! | TechCrunch | [`techcrunch`] | `techcrunch.com` | Shuffles the top 8, downloads banner images |
//! | Business Insider | [`business_insider`] | `businessinsider.com` | Section listing pages |
//!
//! # Common Patterns
//!
//! Every adapter:
//! - caps candidates at [`ExtractOptions::limit`]
//! - skips candidates already in the [`SeenStore`] before navigating
//! - drops bodies shorter than [`ExtractOptions::min_content_chars`]

pub mod business_insider;
pub mod cyprus_mail;
pub mod session;
pub mod techcrunch;

use crate::error::ScrapeError;
use crate::models::Article;
use crate::seen::SeenStore;
use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use session::Session;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument, warn};
use url::Url;

pub use business_insider::BusinessInsider;
pub use cyprus_mail::CyprusMail;
pub use techcrunch::TechCrunch;

/// Knobs shared by all adapters.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum candidate articles attempted per source.
    pub limit: usize,
    /// Bodies with fewer characters are discarded.
    pub min_content_chars: usize,
    /// Bound on every navigation.
    pub nav_timeout: Duration,
    /// Root folder for downloaded media.
    pub assets_dir: PathBuf,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            min_content_chars: 200,
            nav_timeout: Duration::from_secs(30),
            assets_dir: PathBuf::from("assets"),
        }
    }
}

/// Site-specific extraction logic.
pub trait Adapter {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this adapter handles `url`.
    fn matches(&self, url: &str) -> bool;

    /// Collect articles reachable from the seed `url`.
    ///
    /// Per-candidate failures are logged and skipped. An error means the
    /// source as a whole could not be read.
    async fn extract<S: Session>(
        &self,
        url: &str,
        session: &mut S,
        seen: &SeenStore,
    ) -> Result<Vec<Article>, ScrapeError>;
}

/// The closed set of adapters shipped with the binary.
#[derive(Debug, Clone)]
pub enum SiteAdapter {
    CyprusMail(CyprusMail),
    TechCrunch(TechCrunch),
    BusinessInsider(BusinessInsider),
}

impl Adapter for SiteAdapter {
    fn name(&self) -> &'static str {
        match self {
            SiteAdapter::CyprusMail(a) => a.name(),
            SiteAdapter::TechCrunch(a) => a.name(),
            SiteAdapter::BusinessInsider(a) => a.name(),
        }
    }

    fn matches(&self, url: &str) -> bool {
        match self {
            SiteAdapter::CyprusMail(a) => a.matches(url),
            SiteAdapter::TechCrunch(a) => a.matches(url),
            SiteAdapter::BusinessInsider(a) => a.matches(url),
        }
    }

    async fn extract<S: Session>(
        &self,
        url: &str,
        session: &mut S,
        seen: &SeenStore,
    ) -> Result<Vec<Article>, ScrapeError> {
        match self {
            SiteAdapter::CyprusMail(a) => a.extract(url, session, seen).await,
            SiteAdapter::TechCrunch(a) => a.extract(url, session, seen).await,
            SiteAdapter::BusinessInsider(a) => a.extract(url, session, seen).await,
        }
    }
}

/// Ordered adapter list with first-match dispatch.
#[derive(Debug)]
pub struct Registry<A> {
    adapters: Vec<A>,
}

impl<A: Adapter> Registry<A> {
    pub fn new(adapters: Vec<A>) -> Self {
        Self { adapters }
    }

    /// First adapter whose predicate accepts `url`.
    pub fn resolve(&self, url: &str) -> Result<&A, ScrapeError> {
        self.adapters
            .iter()
            .find(|a| a.matches(url))
            .ok_or_else(|| ScrapeError::NoAdapterFound(url.to_string()))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

impl Registry<SiteAdapter> {
    /// Every shipped adapter, configured with `opts`.
    pub fn standard(opts: &ExtractOptions) -> Self {
        Self::new(vec![
            SiteAdapter::CyprusMail(CyprusMail::new(opts.clone())),
            SiteAdapter::TechCrunch(TechCrunch::new(opts.clone())),
            SiteAdapter::BusinessInsider(BusinessInsider::new(opts.clone())),
        ])
    }
}

/// An article link found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub url: String,
    /// Title shown on the listing, when the site puts one there.
    pub title: Option<String>,
}

/// What an adapter pulls out of one article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedArticle {
    pub title: String,
    pub content: String,
    /// Lead image URL, if the page has one.
    pub banner: Option<String>,
}

/// An accepted article plus its side-channel media.
#[derive(Debug)]
pub(crate) struct Harvested {
    pub article: Article,
    pub banner: Option<String>,
}

/// Visit each candidate and keep the ones that parse and pass the quality gate.
///
/// Candidates already in `seen` are skipped before navigation. Any error on a
/// single candidate is logged and the loop moves on.
pub(crate) async fn harvest<S, F>(
    source: &'static str,
    session: &mut S,
    seen: &SeenStore,
    candidates: Vec<Candidate>,
    opts: &ExtractOptions,
    parse: F,
) -> Vec<Harvested>
where
    S: Session,
    F: Fn(&str, &str) -> Result<ParsedArticle, ScrapeError>,
{
    let mut out = Vec::new();
    for candidate in candidates.into_iter().take(opts.limit) {
        let url = candidate.url;
        if seen.contains(&url) {
            debug!(source, %url, "Already seen; not navigating");
            continue;
        }

        let page = match session.goto(&url, opts.nav_timeout).await {
            Ok(page) => page,
            Err(e) => {
                warn!(source, %url, error = %e, "Skipping candidate: navigation failed");
                continue;
            }
        };

        let parsed = match parse(&page.html, &url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(source, %url, error = %e, "Skipping candidate: extraction failed");
                continue;
            }
        };

        if !passes_quality_gate(&parsed.content, opts.min_content_chars) {
            warn!(
                source,
                %url,
                chars = parsed.content.chars().count(),
                min = opts.min_content_chars,
                "Skipping candidate: content too short"
            );
            continue;
        }

        let title = candidate.title.unwrap_or(parsed.title);
        match Article::new(title, url.clone(), parsed.content) {
            Some(article) => out.push(Harvested {
                article,
                banner: parsed.banner,
            }),
            None => warn!(source, %url, "Skipping candidate: missing title"),
        }
    }
    out
}

/// Save an article's lead image under `{assets_dir}/{YYYY-MM-DD}/`.
///
/// Callers treat failure as non-fatal: the article is kept either way.
#[instrument(level = "debug", skip(session, opts))]
pub(crate) async fn download_banner<S: Session>(
    session: &mut S,
    image_url: &str,
    opts: &ExtractOptions,
) -> Result<PathBuf, ScrapeError> {
    let bytes = session.download(image_url, opts.nav_timeout).await?;
    let dir = opts
        .assets_dir
        .join(Local::now().date_naive().format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir).await?;
    let path = dir.join(banner_file_name(image_url));
    fs::write(&path, bytes).await?;
    debug!(path = %path.display(), "Saved banner image");
    Ok(path)
}

/// Last path segment of an image URL, reduced to filesystem-safe characters.
pub(crate) fn banner_file_name(image_url: &str) -> String {
    let segment = Url::parse(image_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .unwrap_or_default();
    let cleaned: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "banner.jpg".to_string()
    } else {
        cleaned
    }
}

/// Body text must reach `min_chars` characters to count as an article.
pub fn passes_quality_gate(content: &str, min_chars: usize) -> bool {
    content.trim().chars().count() >= min_chars
}

/// Resolve `href` against `base`, keeping only http(s) links.
pub(crate) fn resolve_link(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let resolved = base.join(href.trim()).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}

/// Collapsed text of one element.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty paragraph texts matching `selector`, one per line.
pub(crate) fn paragraphs(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .map(|p| element_text(&p))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of the document `<title>`.
pub(crate) fn document_title(document: &Html) -> Option<String> {
    static TITLE: once_cell::sync::Lazy<Selector> =
        once_cell::sync::Lazy::new(|| Selector::parse("title").unwrap());
    document
        .select(&TITLE)
        .next()
        .map(|t| element_text(&t))
        .filter(|t| !t.is_empty())
}
