// src/error.rs
// Error taxonomies for the seams the orchestrator matches on. Adapters use
// anyhow internally and convert at the boundary.

use thiserror::Error;

/// What can go wrong during one source pass. The orchestrator matches on the
/// kind: auth problems abort the source, everything else degrades to an empty
/// result for this pass.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Bad or expired credentials; non-retryable, remediation is on the operator.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Headless login blocked by platform defenses (2FA, device checks).
    /// Expected in cloud mode; the platform pass is skipped, not failed.
    #[error("login unavailable: {0}")]
    AuthUnavailable(String),

    /// Rate limit still in effect after transport-level wait-and-retry.
    #[error("rate limited by the platform")]
    RateLimited,

    /// Total navigation/timeout failure of a browser pass.
    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    /// Anything else transient; logged and treated as an empty result.
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

/// Failure modes of posting an auto-reply, kept separate so the operator can
/// tell a permission problem from API noise.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("401 Unauthorized: credentials invalid or app lacks write permissions")]
    Unauthorized,

    #[error("403 Forbidden: app may not have permission to post")]
    Forbidden,

    #[error("X API error: {0}")]
    Api(String),
}
