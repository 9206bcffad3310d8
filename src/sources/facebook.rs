// src/sources/facebook.rs
// Browser-automated source A: Facebook post search. Requires a logged-in
// session; the login path depends on the configured mode (manual in a headed
// window, or one scripted attempt in cloud mode).

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{LoginMode, ScoutConfig};
use crate::error::SourceError;
use crate::post::{Platform, Post};
use crate::session::SessionArtifact;
use crate::sources::browser::{
    persist_session, try_restore_session, wait_for_manual_login, BrowserSession,
};
use crate::sources::extract::{extract_posts, ExtractionRules};
use crate::sources::{inter_query_delay, SourceAdapter};

const ORIGIN: &str = "https://www.facebook.com";
/// Present only when a session is authenticated.
const LOGIN_PROBE: &str = "[aria-label=\"Account\"]";

/// Facebook rotates markup; selector lists are ordered by how often each
/// variant currently appears.
const RULES: ExtractionRules = ExtractionRules {
    platform: Platform::Facebook,
    origin: ORIGIN,
    containers: &[
        "[role=\"article\"]",
        "div[data-pagelet*=\"FeedUnit\"]",
        "div[class*=\"userContentWrapper\"]",
    ],
    author: &["a[role=\"link\"] strong", "h4 a", "a[class*=\"actor\"]"],
    body: &[
        "div[data-ad-preview=\"message\"]",
        "div[data-ad-comet-preview=\"message\"]",
        "div[dir=\"auto\"]",
    ],
    link: &["a[href*=\"/posts/\"]", "a[href*=\"/permalink/\"]"],
};

/// Post-search URL with the keyword form-encoded; `&`, `#` and `%` in a
/// keyword must survive as query data.
fn search_url(keyword: &str) -> String {
    let mut url = reqwest::Url::parse(ORIGIN).expect("static origin url");
    url.set_path("/search/posts/");
    url.query_pairs_mut().append_pair("q", keyword);
    url.into()
}

pub struct FacebookAdapter {
    login_mode: LoginMode,
    email: Option<String>,
    password: Option<String>,
    session_path: PathBuf,
}

impl FacebookAdapter {
    pub fn new(cfg: &ScoutConfig) -> Self {
        Self {
            login_mode: cfg.login_mode,
            email: cfg.facebook_email.clone(),
            password: cfg.facebook_password.clone(),
            session_path: SessionArtifact::path_for(&cfg.session_dir, Platform::Facebook),
        }
    }

    /// One scripted credential login. Headless logins are expected to fail
    /// intermittently (2FA, device checks, captchas); that outcome is
    /// `AuthUnavailable`, not a crash.
    async fn scripted_login(&self, session: &BrowserSession) -> Result<(), SourceError> {
        let (Some(email), Some(password)) = (&self.email, &self.password) else {
            return Err(SourceError::AuthUnavailable(
                "FACEBOOK_EMAIL/FACEBOOK_PASSWORD not set".into(),
            ));
        };

        tracing::info!("attempting scripted Facebook login");
        for (selector, value) in [
            ("input[name=\"email\"]", email.as_str()),
            ("input[name=\"pass\"]", password.as_str()),
        ] {
            if let Err(e) = session.fill(selector, value).await {
                return Err(SourceError::AuthUnavailable(format!(
                    "login form not usable: {e}"
                )));
            }
        }
        if let Err(e) = session.click("button[name=\"login\"]").await {
            return Err(SourceError::AuthUnavailable(format!(
                "login button not usable: {e}"
            )));
        }
        tokio::time::sleep(Duration::from_secs(5)).await;

        if session.probe(LOGIN_PROBE, Duration::from_secs(10)).await {
            tracing::info!("scripted login succeeded");
            Ok(())
        } else {
            Err(SourceError::AuthUnavailable(
                "scripted login did not reach a logged-in state (2FA or device check likely)"
                    .into(),
            ))
        }
    }

    async fn ensure_logged_in(&self, session: &BrowserSession) -> Result<(), SourceError> {
        if session.probe(LOGIN_PROBE, Duration::from_secs(5)).await {
            tracing::info!("Facebook session is valid");
            return Ok(());
        }

        match self.login_mode {
            LoginMode::Interactive => {
                if wait_for_manual_login(session, LOGIN_PROBE).await {
                    Ok(())
                } else {
                    Err(SourceError::AuthUnavailable(
                        "manual login wait timed out".into(),
                    ))
                }
            }
            LoginMode::Cloud => self.scripted_login(session).await,
        }?;

        persist_session(session, Platform::Facebook, &self.session_path).await;
        Ok(())
    }
}

#[async_trait]
impl SourceAdapter for FacebookAdapter {
    async fn search(&self, keywords: &[String]) -> Result<Vec<Post>, SourceError> {
        // Interactive login needs a window the operator can see.
        let headless = self.login_mode == LoginMode::Cloud;
        let session = BrowserSession::launch(headless, "about:blank")
            .await
            .map_err(SourceError::Transient)?;

        try_restore_session(&session, &self.session_path).await;

        if let Err(e) = session.goto(ORIGIN).await {
            session.close().await;
            return Err(SourceError::NavigationTimeout(e.to_string()));
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        if let Err(e) = self.ensure_logged_in(&session).await {
            session.close().await;
            return Err(e);
        }

        let mut posts = Vec::new();
        for (i, keyword) in keywords.iter().enumerate() {
            tracing::info!(query = %keyword, n = i + 1, total = keywords.len(), "searching Facebook");
            let url = search_url(keyword);

            // One failing query never aborts the platform pass.
            if let Err(e) = session.goto(&url).await {
                tracing::warn!(query = %keyword, error = %e, "search navigation failed");
                continue;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
            session.scroll_feed().await;

            match session.content().await {
                Ok(html) => {
                    let batch = extract_posts(&html, &RULES, keywords);
                    tracing::info!(query = %keyword, found = batch.len(), "Facebook results");
                    posts.extend(batch);
                }
                Err(e) => tracing::warn!(query = %keyword, error = %e, "could not read results page"),
            }

            if i + 1 < keywords.len() {
                tokio::time::sleep(inter_query_delay(i)).await;
            }
        }

        session.close().await;
        Ok(posts)
    }

    fn platform(&self) -> Platform {
        Platform::Facebook
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_reserved_characters() {
        assert_eq!(
            search_url("web & app #dev 100%"),
            "https://www.facebook.com/search/posts/?q=web+%26+app+%23dev+100%25"
        );
    }

    #[test]
    fn search_url_plain_keyword() {
        assert_eq!(
            search_url("need a website"),
            "https://www.facebook.com/search/posts/?q=need+a+website"
        );
    }
}
