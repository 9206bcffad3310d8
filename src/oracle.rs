//! Lead oracle: provider abstraction over the remote LLM used for lead scoring
//! and outreach drafting. The model is a black box; this module only owns the
//! fixed prompts, the response plumbing, and the neutral fallbacks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ScoutConfig;

/// Urgency tier the oracle may attach to an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Urgency::Low),
            "medium" => Some(Urgency::Medium),
            "high" => Some(Urgency::High),
            _ => None,
        }
    }
}

/// Per-post scoring result. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadAssessment {
    /// 0..=10.
    pub score: u8,
    pub reason: String,
    pub urgency: Option<Urgency>,
    /// Whether the post clears the configured threshold. Fixed `true` when the
    /// oracle is disabled or failed, so scoring never silences the pipeline.
    pub is_quality: bool,
}

impl LeadAssessment {
    pub fn from_score(score: u8, reason: String, urgency: Option<Urgency>, threshold: u8) -> Self {
        let score = score.min(10);
        Self {
            score,
            reason,
            urgency,
            is_quality: score >= threshold,
        }
    }

    /// Deterministic neutral default used when scoring is off or unavailable.
    pub fn neutral(reason: &str) -> Self {
        Self {
            score: 5,
            reason: reason.to_string(),
            urgency: Some(Urgency::Medium),
            is_quality: true,
        }
    }
}

/// External scoring/generation service, substitutable with a fake in tests.
#[async_trait]
pub trait LeadOracle: Send + Sync {
    /// Score a post as a potential lead against `threshold`.
    async fn score_lead(&self, text: &str, author: &str, threshold: u8) -> LeadAssessment;

    /// Draft a short personalized reply containing `portfolio_url`; `None` when
    /// generation is off or produced nothing usable.
    async fn generate_reply(&self, text: &str, author: &str, portfolio_url: &str)
        -> Option<String>;

    /// Suggest up to `count` extra search keywords based on the configured ones.
    async fn expand_keywords(&self, _base: &[String], _count: usize) -> Vec<String> {
        Vec::new()
    }

    fn enabled(&self) -> bool;
    fn name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn LeadOracle>;

/// Factory: Gemini when AI features are on and a key is present, otherwise the
/// disabled oracle that returns neutral defaults.
pub fn build_oracle(cfg: &ScoutConfig) -> DynOracle {
    if !cfg.ai_enabled {
        return Arc::new(DisabledOracle);
    }
    match &cfg.gemini_api_key {
        Some(key) => {
            tracing::info!("AI features enabled with Gemini");
            Arc::new(GeminiOracle::new(key.clone()))
        }
        None => {
            tracing::info!("AI features requested but no API key; scoring disabled");
            Arc::new(DisabledOracle)
        }
    }
}

// ------------------------------------------------------------
// Disabled oracle
// ------------------------------------------------------------

/// Used when AI features are off: neutral score, no generation. Scoring must
/// not block the pipeline when the oracle is off.
pub struct DisabledOracle;

#[async_trait]
impl LeadOracle for DisabledOracle {
    async fn score_lead(&self, _text: &str, _author: &str, _threshold: u8) -> LeadAssessment {
        LeadAssessment::neutral("scoring disabled")
    }

    async fn generate_reply(
        &self,
        _text: &str,
        _author: &str,
        _portfolio_url: &str,
    ) -> Option<String> {
        None
    }

    fn enabled(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

// ------------------------------------------------------------
// Gemini oracle
// ------------------------------------------------------------

const GEMINI_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiTextPart>,
}

#[derive(Deserialize)]
struct GeminiTextPart {
    #[serde(default)]
    text: String,
}

/// Shape the scoring prompt asks the model to emit.
#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: i64,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    urgency: Option<String>,
}

impl GeminiOracle {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("leadscout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: GEMINI_MODEL.to_string(),
        }
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };
        let resp = self.http.post(&url).json(&req).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("gemini returned {}", resp.status());
        }
        let body: GeminiResponse = resp.json().await?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            anyhow::bail!("gemini returned an empty candidate");
        }
        Ok(text)
    }

    fn scoring_prompt(text: &str, author: &str) -> String {
        format!(
            r#"Analyze this post to determine if it's a quality lead for a web developer/designer.

Post: "{text}"
Author: @{author}

CRITICAL: If the author is a developer/designer offering services, score 0! We want CLIENTS, not competitors.

Red flags (score 0-2):
- "I help", "I build", "I offer", "hire me", "I'm a developer"
- Portfolio links, service advertisements
- Other developers promoting themselves

Rate from 0-10 where:
- 10: CLIENT with clear intent, budget indicators, or urgency
- 7-9: CLIENT with project details or specific requirements
- 4-6: Possible CLIENT but vague or uncertain
- 1-3: Poor lead, might be spam or irrelevant
- 0: NOT A CLIENT (developer/competitor, spam, or irrelevant)

ALSO detect URGENCY level:
- high: "ASAP", "urgent", "immediately", "right now", "need now", "emergency"
- medium: "soon", "this week", "need help", "looking for"
- low: "eventually", "considering", "thinking about", "might need"

Respond ONLY in this JSON format:
{{"score": <number>, "reason": "<brief explanation>", "urgency": "<high/medium/low>"}}"#
        )
    }

    fn reply_prompt(text: &str, author: &str, portfolio_url: &str) -> String {
        format!(
            r#"You are a professional web developer reaching out to a potential client.

Their post: "{text}"
Their username: @{author}

Write a SHORT, friendly reply (max 200 characters) that:
1. References their specific need from the post
2. Mentions 1-2 key benefits a website would bring to their business type
3. Include: {portfolio_url}
4. End with "DM me if interested"

Keep it brief, friendly, and focused on THEIR benefit, not your skills.

Reply:"#
        )
    }
}

#[async_trait]
impl LeadOracle for GeminiOracle {
    async fn score_lead(&self, text: &str, author: &str, threshold: u8) -> LeadAssessment {
        let prompt = Self::scoring_prompt(text, author);
        match self.generate(&prompt).await {
            Ok(raw) => match parse_score_payload(&raw) {
                Some(payload) => {
                    let score = payload.score.clamp(0, 10) as u8;
                    let reason = payload
                        .reason
                        .unwrap_or_else(|| "no reason provided".into());
                    let urgency = payload.urgency.as_deref().and_then(Urgency::parse);
                    LeadAssessment::from_score(score, reason, urgency, threshold)
                }
                None => {
                    tracing::warn!(raw = %raw, "oracle reply was not the expected JSON");
                    LeadAssessment::neutral("unparseable oracle reply")
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "lead scoring failed; passing post through");
                LeadAssessment::neutral(&format!("scoring error: {e}"))
            }
        }
    }

    async fn generate_reply(
        &self,
        text: &str,
        author: &str,
        portfolio_url: &str,
    ) -> Option<String> {
        let prompt = Self::reply_prompt(text, author, portfolio_url);
        match self.generate(&prompt).await {
            Ok(raw) => {
                let reply = raw.trim().trim_matches('"').trim_matches('\'').to_string();
                if reply.is_empty() {
                    None
                } else {
                    Some(reply)
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "reply generation failed; falling back to template");
                None
            }
        }
    }

    async fn expand_keywords(&self, base: &[String], count: usize) -> Vec<String> {
        let sample = base
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Given these search keywords for finding web development clients:\n{sample}\n\n\
             Generate {count} more creative, relevant variations that potential clients might \
             use when looking for web developers. Respond with ONLY a comma-separated list of \
             keywords, no numbering or extra text."
        );
        match self.generate(&prompt).await {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty() && k.len() < 100)
                .take(count)
                .map(str::to_string)
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "keyword expansion failed");
                Vec::new()
            }
        }
    }

    fn enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Pull the JSON object out of a model reply, tolerating markdown fences and
/// surrounding prose.
fn parse_score_payload(raw: &str) -> Option<ScorePayload> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();
    if let Ok(p) = serde_json::from_str::<ScorePayload>(cleaned) {
        return Some(p);
    }
    // Last resort: slice the first {...} span.
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    serde_json::from_str(&cleaned[start..=end]).ok()
}

// ------------------------------------------------------------
// Mock oracle for tests
// ------------------------------------------------------------

/// Scripted oracle: fixed score and reply for deterministic tests.
pub struct MockOracle {
    pub score: u8,
    pub reason: String,
    pub urgency: Option<Urgency>,
    pub reply: Option<String>,
}

impl MockOracle {
    pub fn scoring(score: u8) -> Self {
        Self {
            score,
            reason: format!("mock score {score}"),
            urgency: None,
            reply: None,
        }
    }
}

#[async_trait]
impl LeadOracle for MockOracle {
    async fn score_lead(&self, _text: &str, _author: &str, threshold: u8) -> LeadAssessment {
        LeadAssessment::from_score(self.score, self.reason.clone(), self.urgency, threshold)
    }

    async fn generate_reply(
        &self,
        _text: &str,
        _author: &str,
        _portfolio_url: &str,
    ) -> Option<String> {
        self.reply.clone()
    }

    fn enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
