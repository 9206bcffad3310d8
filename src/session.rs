// src/session.rs
// Persisted browser authentication state: one JSON file of cookie records per
// scraped platform, read at pass start and rewritten after a successful login.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::post::Platform;

/// One serialized cookie. Only the fields needed to restore a login are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

/// Session cookies for one platform plus bookkeeping. The platform invalidates
/// sessions externally (expiry, 2FA, IP checks); the only local signal is the
/// login-state probe at the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionArtifact {
    pub platform: Platform,
    pub cookies: Vec<CookieRecord>,
    pub saved_at: DateTime<Utc>,
}

impl SessionArtifact {
    pub fn new(platform: Platform, cookies: Vec<CookieRecord>) -> Self {
        Self {
            platform,
            cookies,
            saved_at: Utc::now(),
        }
    }

    /// `{session_dir}/{platform}_session.json`
    pub fn path_for(session_dir: &str, platform: Platform) -> PathBuf {
        let name = match platform {
            Platform::XApi => "x_session.json",
            Platform::Facebook => "facebook_session.json",
            Platform::TikTok => "tiktok_session.json",
        };
        Path::new(session_dir).join(name)
    }

    /// Load from disk; `Ok(None)` when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading session file {}", path.display()))?;
        let artifact: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing session file {}", path.display()))?;
        Ok(Some(artifact))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("writing session file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionArtifact {
        SessionArtifact::new(
            Platform::Facebook,
            vec![CookieRecord {
                name: "c_user".into(),
                value: "12345".into(),
                domain: ".facebook.com".into(),
                path: "/".into(),
                secure: true,
                http_only: true,
            }],
        )
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = SessionArtifact::path_for(dir.path().to_str().unwrap(), Platform::Facebook);
        sample().save(&path).unwrap();
        let loaded = SessionArtifact::load(&path).unwrap().unwrap();
        assert_eq!(loaded.cookies, sample().cookies);
        assert_eq!(loaded.platform, Platform::Facebook);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(SessionArtifact::load(&path).unwrap().is_none());
    }

    #[test]
    fn cookie_defaults_fill_in() {
        let raw = r#"{"platform":"TikTok","cookies":[{"name":"tt","value":"v","domain":".tiktok.com"}],"saved_at":"2026-01-01T00:00:00Z"}"#;
        let artifact: SessionArtifact = serde_json::from_str(raw).unwrap();
        assert_eq!(artifact.cookies[0].path, "/");
        assert!(!artifact.cookies[0].secure);
    }
}
