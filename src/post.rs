// src/post.rs
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which platform a post was observed on. Fixed iteration order for a pass is
/// XApi -> Facebook -> TikTok.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    XApi,
    Facebook,
    TikTok,
}

impl Platform {
    /// Human-readable label used in notification messages.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::XApi => "X",
            Platform::Facebook => "Facebook",
            Platform::TikTok => "TikTok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One post observed on a source platform. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Platform-local id (tweet id, permalink slug, ...).
    pub id: String,
    /// Author handle without the leading '@'; "Unknown" when extraction failed.
    pub author: String,
    pub text: String,
    pub url: String,
    pub platform: Platform,
    pub observed_at: DateTime<Utc>,
}

impl Post {
    /// Dedup key, unique across platforms.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.platform.label(), self.id)
    }
}

/// In-memory record of already-processed posts. Created empty at process start,
/// grows monotonically, never persisted; reset on restart.
#[derive(Debug, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the post's key; returns false if it was already present.
    pub fn insert(&mut self, post: &Post) -> bool {
        self.keys.insert(post.dedup_key())
    }

    pub fn contains(&self, post: &Post) -> bool {
        self.keys.contains(&post.dedup_key())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(platform: Platform, id: &str) -> Post {
        Post {
            id: id.to_string(),
            author: "someone".into(),
            text: "need a website for my bakery".into(),
            url: "https://example.com".into(),
            platform,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn seen_set_rejects_second_insert() {
        let mut seen = SeenSet::new();
        let p = post(Platform::XApi, "123");
        assert!(seen.insert(&p));
        assert!(!seen.insert(&p));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn same_id_on_different_platforms_is_distinct() {
        let mut seen = SeenSet::new();
        assert!(seen.insert(&post(Platform::XApi, "42")));
        assert!(seen.insert(&post(Platform::Facebook, "42")));
        assert_eq!(seen.len(), 2);
    }
}
