// src/sources/browser.rs
// Shared chromiumoxide machinery for the scraped platforms: one exclusive
// browser per platform pass, cookie restore/save, login-state probing, and the
// scroll cycle that triggers lazy loading.

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::post::Platform;
use crate::session::{CookieRecord, SessionArtifact};

/// Upper bound for a full page navigation.
pub const NAV_TIMEOUT: Duration = Duration::from_secs(30);
/// Interactive login: poll every 5 s for up to 5 minutes.
const MANUAL_LOGIN_POLLS: u32 = 60;
const MANUAL_LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// One live browser with a single page, torn down on `close`.
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    page: Page,
}

impl BrowserSession {
    /// Launch an isolated browser context and open `start_url`.
    pub async fn launch(headless: bool, start_url: &str) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching browser")?;
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page(start_url)
            .await
            .with_context(|| format!("opening {start_url}"))?;
        tokio::time::sleep(Duration::from_secs(2)).await;

        Ok(Self {
            browser,
            handler_task,
            page,
        })
    }

    /// Navigate with a hard upper bound; expiry is a timeout, not a hang.
    pub async fn goto(&self, url: &str) -> Result<()> {
        tokio::time::timeout(NAV_TIMEOUT, self.page.goto(url))
            .await
            .map_err(|_| anyhow::anyhow!("navigation to {url} timed out"))?
            .with_context(|| format!("navigating to {url}"))?;
        Ok(())
    }

    /// True when `selector` appears within `timeout`, polling twice a second.
    /// Absence is a normal outcome, not an error.
    pub async fn probe(&self, selector: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Fill an input located by `selector`. Used by scripted logins.
    pub async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let el = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("finding {selector}"))?;
        el.click().await.context("focusing input")?;
        el.type_str(value).await.context("typing input")?;
        Ok(())
    }

    pub async fn click(&self, selector: &str) -> Result<()> {
        let el = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("finding {selector}"))?;
        el.click().await.context("clicking element")?;
        Ok(())
    }

    /// 3 scroll-and-wait cycles to trigger lazy loading of search results.
    pub async fn scroll_feed(&self) {
        for _ in 0..3 {
            if let Err(e) = self.page.evaluate("window.scrollBy(0, 800)").await {
                tracing::debug!(error = %e, "scroll failed");
                break;
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    /// Rendered HTML of the current page.
    pub async fn content(&self) -> Result<String> {
        self.page.content().await.context("reading page content")
    }

    /// Install cookies from a persisted session artifact.
    pub async fn restore_cookies(&self, artifact: &SessionArtifact) -> Result<()> {
        for record in &artifact.cookies {
            let cookie = CookieParam::builder()
                .name(&record.name)
                .value(&record.value)
                .domain(&record.domain)
                .path(&record.path)
                .secure(record.secure)
                .http_only(record.http_only)
                .build()
                .map_err(|e| anyhow::anyhow!("building cookie {}: {e}", record.name))?;
            self.page.set_cookie(cookie).await?;
        }
        tracing::info!(
            platform = %artifact.platform,
            cookies = artifact.cookies.len(),
            "restored saved session"
        );
        Ok(())
    }

    /// Capture the current cookies as a session artifact.
    pub async fn snapshot_cookies(&self, platform: Platform) -> Result<SessionArtifact> {
        let cookies = self.page.get_cookies().await.context("reading cookies")?;
        let records = cookies
            .into_iter()
            .map(|c| CookieRecord {
                name: c.name,
                value: c.value,
                domain: c.domain,
                path: c.path,
                secure: c.secure,
                http_only: c.http_only,
            })
            .collect();
        Ok(SessionArtifact::new(platform, records))
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!(error = %e, "browser close failed");
        }
        let _ = self.handler_task.await;
    }
}

/// Restore a saved session onto a fresh browser, if one exists on disk.
/// Corrupt or missing artifacts degrade to an anonymous session.
pub async fn try_restore_session(session: &BrowserSession, path: &Path) {
    match SessionArtifact::load(path) {
        Ok(Some(artifact)) => {
            if let Err(e) = session.restore_cookies(&artifact).await {
                tracing::warn!(error = %e, "could not restore session cookies");
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "could not read session file"),
    }
}

/// Block while the operator logs in by hand: poll the login probe every 5 s
/// for up to 5 minutes. Returns whether the probe eventually appeared.
pub async fn wait_for_manual_login(session: &BrowserSession, probe_selector: &str) -> bool {
    tracing::warn!(
        "not logged in; complete the login in the browser window (waiting up to 5 minutes)"
    );
    for _ in 0..MANUAL_LOGIN_POLLS {
        tokio::time::sleep(MANUAL_LOGIN_POLL_INTERVAL).await;
        if session.probe(probe_selector, Duration::from_secs(3)).await {
            tracing::info!("manual login detected");
            return true;
        }
    }
    tracing::error!("login wait timed out");
    false
}

/// Persist the session after a successful login. Best effort: a failed write
/// only costs the next run a fresh login.
pub async fn persist_session(session: &BrowserSession, platform: Platform, path: &Path) {
    match session.snapshot_cookies(platform).await {
        Ok(artifact) => {
            if let Err(e) = artifact.save(path) {
                tracing::warn!(error = %e, "could not save session file");
            } else {
                tracing::info!(path = %path.display(), "session saved for future runs");
            }
        }
        Err(e) => tracing::warn!(error = %e, "could not snapshot cookies"),
    }
}
