// src/sources/x_api.rs
// API-based source: the X recent-search endpoint. One disjunctive query per
// pass, result cap 10, original English posts only.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::{RunMode, ScoutConfig};
use crate::error::SourceError;
use crate::post::{Platform, Post};
use crate::sources::SourceAdapter;

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const MAX_RESULTS: u32 = 10;
/// Attempts per search call; 429s sleep until the advertised reset in between.
const RATE_LIMIT_ATTEMPTS: u32 = 3;
/// Never sleep longer than this on a rate-limit wait.
const MAX_RATE_WAIT: Duration = Duration::from_secs(900);

/// Self-promotional phrasing excluded from single-run queries; competitors
/// advertising services are not leads.
const NEGATIVE_TERMS: &[&str] = &[
    "I help",
    "I build",
    "I offer",
    "hire me",
    "portfolio",
    "check out my",
];

pub struct XApiAdapter {
    bearer_token: String,
    mode: RunMode,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    author_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Disjunctive phrase query restricted to original English posts; single-run
/// mode also excludes the self-promotion phrases.
pub fn build_query(keywords: &[String], mode: RunMode) -> String {
    let mut query = keywords
        .iter()
        .map(|k| format!("\"{}\"", k.trim()))
        .collect::<Vec<_>>()
        .join(" OR ");
    query.push_str(" -is:retweet lang:en");
    if mode == RunMode::Once {
        for term in NEGATIVE_TERMS {
            query.push_str(&format!(" -\"{term}\""));
        }
    }
    query
}

/// Search window per mode: single runs are externally scheduled every few
/// minutes and use a narrow window instead of a SeenSet.
pub fn search_window(mode: RunMode) -> ChronoDuration {
    match mode {
        RunMode::Once => ChronoDuration::minutes(15),
        RunMode::Loop => ChronoDuration::hours(1),
    }
}

impl XApiAdapter {
    pub fn new(cfg: &ScoutConfig) -> Option<Self> {
        let bearer_token = match &cfg.x.bearer_token {
            Some(t) => t.clone(),
            None => {
                tracing::warn!("no bearer token; X source disabled");
                return None;
            }
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Some(Self {
            bearer_token,
            mode: cfg.mode,
            client,
        })
    }

    async fn search_once(&self, query: &str, start_time: &str) -> Result<SearchResponse, SourceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let resp = self
                .client
                .get(SEARCH_URL)
                .bearer_auth(&self.bearer_token)
                .query(&[
                    ("query", query),
                    ("max_results", &MAX_RESULTS.to_string()),
                    ("start_time", start_time),
                    ("tweet.fields", "created_at,author_id,public_metrics"),
                    ("expansions", "author_id"),
                    ("user.fields", "username,name"),
                ])
                .send()
                .await
                .map_err(|e| SourceError::Transient(e.into()))?;

            match resp.status() {
                s if s.is_success() => {
                    return resp
                        .json::<SearchResponse>()
                        .await
                        .map_err(|e| SourceError::Transient(e.into()));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    if attempt >= RATE_LIMIT_ATTEMPTS {
                        return Err(SourceError::RateLimited);
                    }
                    let wait = rate_limit_wait(&resp);
                    tracing::warn!(wait_secs = wait.as_secs(), "X rate limit hit; waiting");
                    tokio::time::sleep(wait).await;
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(SourceError::Auth(format!(
                        "X search returned {}; check the bearer token",
                        resp.status()
                    )));
                }
                s => {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(SourceError::Transient(anyhow::anyhow!(
                        "X search returned {s}: {body}"
                    )));
                }
            }
        }
    }
}

/// Honor `x-rate-limit-reset` when present, else a flat minute.
fn rate_limit_wait(resp: &reqwest::Response) -> Duration {
    let reset = resp
        .headers()
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok());
    match reset {
        Some(ts) => {
            let now = Utc::now().timestamp();
            let secs = (ts - now).max(1) as u64;
            Duration::from_secs(secs).min(MAX_RATE_WAIT)
        }
        None => Duration::from_secs(60),
    }
}

#[async_trait]
impl SourceAdapter for XApiAdapter {
    async fn search(&self, keywords: &[String]) -> Result<Vec<Post>, SourceError> {
        let query = build_query(keywords, self.mode);
        let start = Utc::now() - search_window(self.mode);
        let start_time = start.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        tracing::info!(keywords = keywords.len(), "searching X");
        tracing::debug!(query = %query, start_time = %start_time, "X search query");

        let body = self.search_once(&query, &start_time).await?;

        let users: HashMap<&str, &str> = body
            .includes
            .users
            .iter()
            .map(|u| (u.id.as_str(), u.username.as_str()))
            .collect();

        let observed_at = Utc::now();
        let posts = body
            .data
            .into_iter()
            .map(|t| {
                let username = t
                    .author_id
                    .as_deref()
                    .and_then(|id| users.get(id).copied())
                    .unwrap_or("unknown");
                Post {
                    url: format!("https://twitter.com/{username}/status/{}", t.id),
                    author: username.to_string(),
                    id: t.id,
                    text: t.text,
                    platform: Platform::XApi,
                    observed_at,
                }
            })
            .collect::<Vec<_>>();

        if posts.is_empty() {
            tracing::info!("no new tweets in the search window");
        }
        Ok(posts)
    }

    fn platform(&self) -> Platform {
        Platform::XApi
    }
}

/// Startup probe for the posting credential: `GET /2/users/me`. Logs the
/// outcome with remediation hints on 401; never fails the boot.
pub async fn verify_posting_credentials(access_token: &str) {
    let client = Client::new();
    let resp = client
        .get("https://api.twitter.com/2/users/me")
        .bearer_auth(access_token)
        .send()
        .await;
    match resp {
        Ok(r) if r.status().is_success() => {
            #[derive(Deserialize)]
            struct Me {
                data: MeData,
            }
            #[derive(Deserialize)]
            struct MeData {
                username: String,
            }
            match r.json::<Me>().await {
                Ok(me) => tracing::info!(username = %me.data.username, "authenticated for posting"),
                Err(_) => tracing::info!("posting credentials accepted"),
            }
        }
        Ok(r) if r.status() == StatusCode::UNAUTHORIZED => {
            tracing::error!(
                "posting credential check failed: 401 Unauthorized. Enable Read and Write \
                 permissions in the app settings and regenerate the access token"
            );
        }
        Ok(r) => tracing::warn!(status = %r.status(), "could not verify posting credentials"),
        Err(e) => tracing::warn!(error = %e, "could not verify posting credentials"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws() -> Vec<String> {
        vec!["need a website".to_string(), "hire developer".to_string()]
    }

    #[test]
    fn loop_query_has_phrases_and_filters() {
        let q = build_query(&kws(), RunMode::Loop);
        assert_eq!(
            q,
            "\"need a website\" OR \"hire developer\" -is:retweet lang:en"
        );
    }

    #[test]
    fn single_run_query_excludes_self_promotion() {
        let q = build_query(&kws(), RunMode::Once);
        assert!(q.contains("-\"I help\""));
        assert!(q.contains("-\"check out my\""));
        assert!(q.starts_with("\"need a website\" OR \"hire developer\" -is:retweet lang:en"));
    }

    #[test]
    fn window_matches_mode() {
        assert_eq!(search_window(RunMode::Once), ChronoDuration::minutes(15));
        assert_eq!(search_window(RunMode::Loop), ChronoDuration::hours(1));
    }

    #[test]
    fn response_parses_and_maps_users() {
        let raw = r#"{
            "data": [
                {"id": "111", "text": "need a website for my shop", "author_id": "u1"},
                {"id": "222", "text": "hire developer please", "author_id": "u9"}
            ],
            "includes": {"users": [{"id": "u1", "username": "shopkeeper", "name": "Shop"}]},
            "meta": {"result_count": 2}
        }"#;
        let body: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(body.data.len(), 2);
        assert_eq!(body.includes.users[0].username, "shopkeeper");
    }

    #[test]
    fn empty_response_parses() {
        let body: SearchResponse = serde_json::from_str(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(body.data.is_empty());
    }
}
