// src/sources/tiktok.rs
// Browser-automated source B: TikTok video search. Works anonymously, so
// there is no login flow; cookies are still persisted between passes to look
// less like a fresh client each time.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::ScoutConfig;
use crate::error::SourceError;
use crate::post::{Platform, Post};
use crate::session::SessionArtifact;
use crate::sources::browser::{persist_session, try_restore_session, BrowserSession};
use crate::sources::extract::{extract_posts, ExtractionRules};
use crate::sources::SourceAdapter;

const ORIGIN: &str = "https://www.tiktok.com";

const RULES: ExtractionRules = ExtractionRules {
    platform: Platform::TikTok,
    origin: ORIGIN,
    containers: &[
        "[data-e2e=\"search-video-item\"]",
        "div[class*=\"video-feed-item\"]",
        "[data-e2e=\"search-card-item\"]",
    ],
    author: &[
        "[data-e2e=\"search-card-user-unique-id\"]",
        "a[class*=\"author\"]",
        "[class*=\"username\"]",
    ],
    body: &[
        "[data-e2e=\"search-card-desc\"]",
        "div[class*=\"video-desc\"]",
        "[class*=\"description\"]",
    ],
    link: &["a"],
};

/// Search URL with the keyword form-encoded; reserved characters in a keyword
/// must survive as query data.
fn search_url(keyword: &str) -> String {
    let mut url = reqwest::Url::parse(ORIGIN).expect("static origin url");
    url.set_path("/search");
    url.query_pairs_mut().append_pair("q", keyword);
    url.into()
}

pub struct TikTokAdapter {
    headless: bool,
    session_path: PathBuf,
}

impl TikTokAdapter {
    pub fn new(cfg: &ScoutConfig) -> Self {
        Self {
            headless: cfg.headless,
            session_path: SessionArtifact::path_for(&cfg.session_dir, Platform::TikTok),
        }
    }
}

#[async_trait]
impl SourceAdapter for TikTokAdapter {
    async fn search(&self, keywords: &[String]) -> Result<Vec<Post>, SourceError> {
        let session = BrowserSession::launch(self.headless, "about:blank")
            .await
            .map_err(SourceError::Transient)?;

        try_restore_session(&session, &self.session_path).await;

        if let Err(e) = session.goto(ORIGIN).await {
            session.close().await;
            return Err(SourceError::NavigationTimeout(e.to_string()));
        }
        tokio::time::sleep(Duration::from_secs(3)).await;

        let mut posts = Vec::new();
        for (i, keyword) in keywords.iter().enumerate() {
            tracing::info!(query = %keyword, n = i + 1, total = keywords.len(), "searching TikTok");
            let url = search_url(keyword);

            if let Err(e) = session.goto(&url).await {
                tracing::warn!(query = %keyword, error = %e, "search navigation failed");
                continue;
            }
            tokio::time::sleep(Duration::from_secs(3)).await;
            session.scroll_feed().await;

            match session.content().await {
                Ok(html) => {
                    let batch = extract_posts(&html, &RULES, keywords);
                    tracing::info!(query = %keyword, found = batch.len(), "TikTok results");
                    posts.extend(batch);
                }
                Err(e) => tracing::warn!(query = %keyword, error = %e, "could not read results page"),
            }

            if i + 1 < keywords.len() {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }

        persist_session(&session, Platform::TikTok, &self.session_path).await;
        session.close().await;
        Ok(posts)
    }

    fn platform(&self) -> Platform {
        Platform::TikTok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_reserved_characters() {
        assert_eq!(
            search_url("react & next #jobs"),
            "https://www.tiktok.com/search?q=react+%26+next+%23jobs"
        );
    }
}
