// src/responder.rs
// Auto-reply back to the API platform. Failures are logged with enough detail
// for operator diagnosis and never propagate; a failed reply does not roll back
// the notification that was already sent.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::config::ScoutConfig;
use crate::error::ReplyError;
use crate::oracle::DynOracle;
use crate::post::Post;

/// X enforces 280 characters per tweet.
const MAX_REPLY_CHARS: usize = 280;

/// Outreach channel back to the source platform.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, post: &Post);
}

/// Enforce the platform character limit: anything longer than 280 chars is cut
/// to 277 plus an ellipsis, yielding exactly 280.
pub fn truncate_reply(text: &str) -> String {
    if text.chars().count() > MAX_REPLY_CHARS {
        let head: String = text.chars().take(MAX_REPLY_CHARS - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// The static fallback when the oracle is off or returned nothing.
pub fn template_reply(portfolio_url: &str) -> String {
    format!(
        "Hi! I'm a web developer specializing in frontend and fullstack development. \
         Check out my portfolio: {portfolio_url}\n\nI'd love to discuss your project!"
    )
}

pub struct XResponder {
    enabled: bool,
    portfolio_url: String,
    access_token: Option<String>,
    oracle: DynOracle,
    client: Client,
}

#[derive(Serialize)]
struct TweetRequest<'a> {
    text: &'a str,
    reply: TweetReplyRef<'a>,
}

#[derive(Serialize)]
struct TweetReplyRef<'a> {
    in_reply_to_tweet_id: &'a str,
}

impl XResponder {
    pub fn new(cfg: &ScoutConfig, oracle: DynOracle) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            enabled: cfg.auto_reply,
            portfolio_url: cfg.portfolio_url.clone(),
            access_token: cfg.x.access_token.clone(),
            oracle,
            client,
        }
    }

    /// Oracle draft when available, otherwise the fixed template; always within
    /// the platform character limit.
    async fn compose(&self, post: &Post) -> String {
        let generated = if self.oracle.enabled() {
            self.oracle
                .generate_reply(&post.text, &post.author, &self.portfolio_url)
                .await
        } else {
            None
        };
        let text = match generated {
            Some(t) => {
                tracing::info!(author = %post.author, "using oracle-generated reply");
                t
            }
            None => template_reply(&self.portfolio_url),
        };
        truncate_reply(&text)
    }

    async fn post_reply(&self, post: &Post, text: &str) -> Result<(), ReplyError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ReplyError::Unauthorized)?;

        let req = TweetRequest {
            text,
            reply: TweetReplyRef {
                in_reply_to_tweet_id: &post.id,
            },
        };

        let resp = self
            .client
            .post("https://api.twitter.com/2/tweets")
            .bearer_auth(token)
            .json(&req)
            .send()
            .await
            .map_err(|e| ReplyError::Api(e.to_string()))?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ReplyError::Unauthorized),
            StatusCode::FORBIDDEN => Err(ReplyError::Forbidden),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(ReplyError::Api(format!("{s}: {body}")))
            }
        }
    }
}

#[async_trait]
impl Responder for XResponder {
    async fn reply(&self, post: &Post) {
        if !self.enabled {
            tracing::debug!(author = %post.author, "auto-reply disabled; skipping");
            return;
        }
        if self.portfolio_url.is_empty() {
            tracing::warn!(author = %post.author, "portfolio URL not configured; skipping reply");
            return;
        }

        let text = self.compose(post).await;
        match self.post_reply(post, &text).await {
            Ok(()) => {
                tracing::info!(author = %post.author, "auto-replied");
            }
            Err(ReplyError::Unauthorized) => {
                tracing::error!(
                    "reply failed: 401 Unauthorized. Check that the access token is current and \
                     the app has Read and Write permissions, then regenerate the token"
                );
            }
            Err(ReplyError::Forbidden) => {
                tracing::error!("reply failed: 403 Forbidden; the app may not be allowed to post");
            }
            Err(ReplyError::Api(msg)) => {
                tracing::warn!(error = %msg, "reply failed");
            }
        }
    }
}
