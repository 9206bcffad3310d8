// src/sources/mod.rs
pub mod browser;
pub mod extract;
pub mod facebook;
pub mod tiktok;
pub mod x_api;

use async_trait::async_trait;
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use std::time::Duration;

use crate::error::SourceError;
use crate::post::{Platform, Post};

pub use facebook::FacebookAdapter;
pub use tiktok::TikTokAdapter;
pub use x_api::XApiAdapter;

/// One-time metrics registration (so series show up on the exporter).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scout_posts_total", "Posts returned by source adapters.");
        describe_counter!(
            "scout_dedup_total",
            "Posts dropped because they were already seen."
        );
        describe_counter!(
            "scout_leads_notified_total",
            "Quality leads that reached the notifier."
        );
        describe_counter!(
            "scout_dropped_low_score_total",
            "Posts dropped below the lead score threshold."
        );
        describe_counter!("scout_source_errors_total", "Source pass failures by kind.");
        describe_gauge!("scout_pass_last_run_ts", "Unix ts of the last finished pass.");
    });
}

/// Component that turns a keyword query into a batch of posts from one
/// platform. Adapters are stateless across runs except for a locally persisted
/// session artifact; iteration over the keyword list (with rate-limit delays)
/// happens inside the adapter.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn search(&self, keywords: &[String]) -> Result<Vec<Post>, SourceError>;
    fn platform(&self) -> Platform;
}

/// Case-insensitive substring match against any configured keyword.
pub fn matches_any_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| lower.contains(&k))
}

/// Informal rate-limit spacing between consecutive browser queries, scaled by
/// position in the keyword list (the platforms tolerate a fast start but
/// notice sustained bursts).
pub fn inter_query_delay(position: usize) -> Duration {
    if position < 5 {
        Duration::from_secs(4)
    } else {
        Duration::from_secs(6)
    }
}

/// Normalize extracted text: decode HTML entities, strip tags, collapse
/// whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let kws = vec!["need a website".to_string(), "hire developer".to_string()];
        assert!(matches_any_keyword("I NEED A WEBSITE asap", &kws));
        assert!(matches_any_keyword("looking to hire developer soon", &kws));
        assert!(!matches_any_keyword("selling websites cheap", &kws));
    }

    #[test]
    fn blank_keywords_never_match() {
        let kws = vec!["  ".to_string(), "".to_string()];
        assert!(!matches_any_keyword("anything", &kws));
    }

    #[test]
    fn delay_scales_with_position() {
        assert_eq!(inter_query_delay(0), Duration::from_secs(4));
        assert_eq!(inter_query_delay(4), Duration::from_secs(4));
        assert_eq!(inter_query_delay(5), Duration::from_secs(6));
    }

    #[test]
    fn normalize_strips_tags_and_entities() {
        let s = "  Hello,&nbsp;<b>world</b>\n\nneed&amp;help  ";
        assert_eq!(normalize_text(s), "Hello, world need&help");
    }
}
