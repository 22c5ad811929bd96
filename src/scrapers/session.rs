//! Browsing session shared by every adapter during one acquisition run.
//!
//! A session behaves like a single browser tab: one navigation at a time,
//! reused across sources, closed once at the end of the run. Every call is
//! bounded by an explicit timeout so a stuck page surfaces as
//! [`ScrapeError::Timeout`] instead of hanging the run.

use crate::error::ScrapeError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, instrument};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// A loaded document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub html: String,
}

/// Navigation capability handed to adapters.
pub trait Session {
    /// Load `url` as the current page.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<Page, ScrapeError>;

    /// Fetch a binary resource (images) without changing the current page.
    async fn download(&mut self, url: &str, timeout: Duration) -> Result<Vec<u8>, ScrapeError>;

    /// Release the session. Further calls fail with [`ScrapeError::SessionClosed`].
    async fn close(&mut self);
}

/// [`Session`] backed by one pooled `reqwest` client.
#[derive(Debug)]
pub struct HttpSession {
    client: reqwest::Client,
    current: Option<String>,
    closed: bool,
}

impl HttpSession {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ScrapeError::Client)?;
        Ok(Self {
            client,
            current: None,
            closed: false,
        })
    }

    /// URL of the page most recently loaded.
    pub fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    async fn bounded<T>(
        url: &str,
        timeout: Duration,
        fut: impl Future<Output = Result<T, ScrapeError>>,
    ) -> Result<T, ScrapeError> {
        match tokio::time::timeout(timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(ScrapeError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, ScrapeError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ScrapeError::Navigation {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

impl Session for HttpSession {
    #[instrument(level = "debug", skip(self))]
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<Page, ScrapeError> {
        if self.closed {
            return Err(ScrapeError::SessionClosed);
        }
        let page = Self::bounded(url, timeout, async {
            let resp = self.get(url).await?;
            let final_url = resp.url().to_string();
            let html = resp
                .text()
                .await
                .map_err(|source| ScrapeError::Navigation {
                    url: url.to_string(),
                    source,
                })?;
            Ok(Page {
                url: final_url,
                html,
            })
        })
        .await?;
        debug!(final_url = %page.url, bytes = page.html.len(), "Page loaded");
        self.current = Some(page.url.clone());
        Ok(page)
    }

    #[instrument(level = "debug", skip(self))]
    async fn download(&mut self, url: &str, timeout: Duration) -> Result<Vec<u8>, ScrapeError> {
        if self.closed {
            return Err(ScrapeError::SessionClosed);
        }
        Self::bounded(url, timeout, async {
            let resp = self.get(url).await?;
            let bytes = resp.bytes().await.map_err(|e| ScrapeError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            info!("Browsing session closed");
        }
    }
}
