//! Where the search page HTML comes from.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, DNT, HeaderMap, HeaderName, HeaderValue,
    PRAGMA, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use crate::search::origin_of;

const FETCH_ATTEMPTS: usize = 3;

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Returns the rendered HTML of the search results page at `url`.
    async fn fetch_page(&self, url: &Url) -> Result<String>;
}

// -------------------------
// HTTP
// -------------------------

pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(8))
            .timeout(Duration::from_secs(25))
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self, url: &Url) -> Result<String> {
        let origin = origin_of(url)?;
        warmup_hit(&self.client, &origin).await;
        retry_fetch_html(&self.client, url, origin.as_str()).await
    }
}

#[derive(Clone, Copy, Debug)]
enum Profile {
    Desktop,
    Mobile,
}

impl Profile {
    fn flip(self) -> Self {
        match self {
            Profile::Desktop => Profile::Mobile,
            Profile::Mobile => Profile::Desktop,
        }
    }
}

fn base_headers(profile: Profile, referer: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    let ua = match profile {
        Profile::Desktop => random_desktop_ua(),
        Profile::Mobile => random_mobile_ua(),
    };
    h.insert(USER_AGENT, HeaderValue::from_static(ua));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    h.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("nb-NO,nb;q=0.9,no;q=0.8,en-US;q=0.7,en;q=0.6"),
    );
    if let Ok(v) = HeaderValue::from_str(referer) {
        h.insert(REFERER, v);
    }
    h.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    h.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    h.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    h.insert(DNT, HeaderValue::from_static("1"));

    h.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    h.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    h.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    h
}

/// Visits the origin first so the cookie store picks up session and consent
/// cookies. Failure is not fatal.
async fn warmup_hit(client: &reqwest::Client, origin: &Url) {
    let headers = base_headers(Profile::Desktop, origin.as_str());
    match client.get(origin.as_str()).headers(headers).send().await {
        Ok(r) => {
            let _ = r.text().await;
        }
        Err(e) => tracing::warn!(error = %e, "warmup request failed, continuing"),
    }
}

async fn retry_fetch_html(client: &reqwest::Client, page_url: &Url, referer: &str) -> Result<String> {
    let mut last_err: Option<anyhow::Error> = None;
    let mut profile = Profile::Desktop;

    for attempt in 1..=FETCH_ATTEMPTS {
        let headers = base_headers(profile, referer);
        match client.get(page_url.as_str()).headers(headers).send().await {
            Ok(rsp) => {
                let status = rsp.status();
                let final_url = rsp.url().clone();
                let text = rsp.text().await.unwrap_or_default();

                tracing::debug!(
                    attempt,
                    ?profile,
                    %status,
                    %final_url,
                    len = text.len(),
                    "fetched search page"
                );

                if status.is_success() {
                    return Ok(text);
                }
                last_err = Some(anyhow!("search page returned {status}"));
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "search page request failed");
                last_err = Some(e.into());
            }
        }

        profile = profile.flip();
        if attempt < FETCH_ATTEMPTS {
            let backoff = Duration::from_millis(rng().random_range(600..1500));
            sleep(backoff).await;
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("failed to fetch search page after retries")))
}

fn random_desktop_ua() -> &'static str {
    const UAS: &[&str] = &[
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    ];
    UAS[rng().random_range(0..UAS.len())]
}

fn random_mobile_ua() -> &'static str {
    const UAS: &[&str] = &[
        "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    ];
    UAS[rng().random_range(0..UAS.len())]
}

// -------------------------
// Saved page
// -------------------------

/// Serves a previously saved results page, ignoring the requested URL.
pub struct FilePageSource {
    path: PathBuf,
}

impl FilePageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PageSource for FilePageSource {
    async fn fetch_page(&self, _url: &Url) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read saved page {}", self.path.display()))
    }
}
