// src/config.rs
// Process-wide configuration, read once from the environment at startup and
// passed explicitly to every component. No ambient global state.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::post::Platform;

/// How the orchestrator is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One pass per process; scheduling is external (cron, CI). Cross-run dedup
    /// relies on the narrow search window, not the SeenSet.
    Once,
    /// Long-lived polling loop with the configured interval.
    Loop,
}

/// Browser login strategy for the scraped platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Blocks with a visible browser window and waits for a manual login.
    Interactive,
    /// One scripted credential login attempt; failure skips the platform.
    Cloud,
}

#[derive(Debug, Clone)]
pub struct XCredentials {
    /// App bearer token for the recent-search endpoint.
    pub bearer_token: Option<String>,
    /// OAuth2 user access token for posting replies.
    pub access_token: Option<String>,
}

impl XCredentials {
    pub fn can_search(&self) -> bool {
        self.bearer_token.is_some()
    }

    pub fn can_post(&self) -> bool {
        self.access_token.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Ordered, non-empty keyword list.
    pub keywords: Vec<String>,
    pub platforms: Vec<Platform>,
    pub mode: RunMode,
    pub interval: Duration,

    pub x: XCredentials,
    pub facebook_email: Option<String>,
    pub facebook_password: Option<String>,

    pub callmebot_phone: Option<String>,
    pub callmebot_apikey: Option<String>,

    pub auto_reply: bool,
    pub portfolio_url: String,

    pub ai_enabled: bool,
    pub gemini_api_key: Option<String>,
    /// Minimum oracle score for a post to proceed to notify/reply.
    pub min_lead_score: u8,
    /// Ask the oracle for extra keyword variations at startup.
    pub expand_keywords: bool,

    pub login_mode: LoginMode,
    pub headless: bool,
    /// Directory holding the per-platform session cookie files.
    pub session_dir: String,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_platforms(raw: &str) -> Result<Vec<Platform>> {
    let mut out = Vec::new();
    for tok in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let p = match tok.to_ascii_lowercase().as_str() {
            "x" | "twitter" => Platform::XApi,
            "facebook" | "fb" => Platform::Facebook,
            "tiktok" => Platform::TikTok,
            other => bail!("unknown platform in SCOUT_PLATFORMS: {other}"),
        };
        if !out.contains(&p) {
            out.push(p);
        }
    }
    Ok(out)
}

impl ScoutConfig {
    /// Build from the environment. Fails only on unrecoverable misconfiguration
    /// (empty keyword list, unparseable values); missing credentials merely
    /// degrade the affected component later.
    pub fn from_env() -> Result<Self> {
        let keywords = parse_keywords(&std::env::var("KEYWORDS").unwrap_or_default());
        if keywords.is_empty() {
            bail!("KEYWORDS is empty; keyword search needs at least one term");
        }

        let platforms =
            parse_platforms(&std::env::var("SCOUT_PLATFORMS").unwrap_or_else(|_| "x".into()))?;
        if platforms.is_empty() {
            bail!("SCOUT_PLATFORMS resolved to an empty list");
        }

        let mode = match std::env::var("SCOUT_MODE")
            .unwrap_or_else(|_| "loop".into())
            .trim()
        {
            "once" => RunMode::Once,
            "loop" | "" => RunMode::Loop,
            other => bail!("SCOUT_MODE must be `once` or `loop`, got `{other}`"),
        };

        let interval_secs: u64 = match env_opt("SCOUT_INTERVAL_SECS") {
            Some(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("SCOUT_INTERVAL_SECS is not a number: {v}"))?,
            None => 300,
        };

        let min_lead_score: u8 = match env_opt("AI_MIN_LEAD_SCORE") {
            Some(v) => v
                .parse()
                .map_err(|_| anyhow::anyhow!("AI_MIN_LEAD_SCORE is not a number: {v}"))?,
            None => 7,
        };

        let login_mode = if env_flag("SCOUT_CLOUD_LOGIN", false) {
            LoginMode::Cloud
        } else {
            LoginMode::Interactive
        };

        Ok(Self {
            keywords,
            platforms,
            mode,
            interval: Duration::from_secs(interval_secs),
            x: XCredentials {
                bearer_token: env_opt("TWITTER_BEARER_TOKEN"),
                access_token: env_opt("TWITTER_ACCESS_TOKEN"),
            },
            facebook_email: env_opt("FACEBOOK_EMAIL"),
            facebook_password: env_opt("FACEBOOK_PASSWORD"),
            callmebot_phone: env_opt("CALLMEBOT_PHONE"),
            callmebot_apikey: env_opt("CALLMEBOT_APIKEY"),
            auto_reply: env_flag("AUTO_REPLY", true),
            portfolio_url: env_opt("PORTFOLIO_URL").unwrap_or_default(),
            ai_enabled: env_flag("ENABLE_AI_FEATURES", false),
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            min_lead_score,
            expand_keywords: env_flag("EXPAND_KEYWORDS", false),
            login_mode,
            headless: env_flag("SCOUT_HEADLESS", true),
            session_dir: env_opt("SESSION_DIR").unwrap_or_else(|| ".".into()),
        })
    }

    /// Log the credential posture the way an operator reads a boot banner:
    /// what is present, what is missing, what got degraded. Never fails.
    pub fn log_posture(&self) {
        tracing::info!(
            keywords = self.keywords.len(),
            platforms = ?self.platforms,
            mode = ?self.mode,
            interval_secs = self.interval.as_secs(),
            "scout configuration loaded"
        );

        if self.platforms.contains(&Platform::XApi) && !self.x.can_search() {
            tracing::warn!("TWITTER_BEARER_TOKEN missing; the X source will be skipped");
        }
        if self.platforms.contains(&Platform::Facebook)
            && self.login_mode == LoginMode::Cloud
            && (self.facebook_email.is_none() || self.facebook_password.is_none())
        {
            tracing::warn!(
                "FACEBOOK_EMAIL/FACEBOOK_PASSWORD missing; cloud login will be unavailable"
            );
        }

        match (&self.callmebot_phone, &self.callmebot_apikey) {
            (Some(phone), Some(_)) => {
                tracing::info!(phone = %phone, "WhatsApp notifications enabled");
            }
            _ => tracing::info!("WhatsApp notifications not configured"),
        }

        if self.auto_reply {
            tracing::info!("auto-reply is ENABLED");
            if self.portfolio_url.is_empty() {
                tracing::warn!("AUTO_REPLY is enabled but PORTFOLIO_URL is not set");
            }
            if !self.x.can_post() {
                tracing::warn!("TWITTER_ACCESS_TOKEN missing; replies will fail as Unauthorized");
            }
        } else {
            tracing::info!("auto-reply is DISABLED");
        }

        if self.ai_enabled && self.gemini_api_key.is_none() {
            tracing::warn!(
                "ENABLE_AI_FEATURES is true but GEMINI_API_KEY is missing; scoring disabled"
            );
        }

        if self.mode == RunMode::Once {
            tracing::warn!(
                "single-run mode deduplicates only within this pass; duplicate alerts are \
                 possible if the external scheduler interval exceeds the 15-minute search window"
            );
        }
    }
}
