// src/orchestrator.rs
// The per-pass pipeline: sources -> dedup -> scoring gate -> notify ->
// auto-reply. Each stage degrades independently; a bad source or a failed
// notification never stops the rest of the pass.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};

use crate::error::SourceError;
use crate::notify::Notifier;
use crate::oracle::DynOracle;
use crate::post::{Platform, Post, SeenSet};
use crate::responder::Responder;
use crate::sources::SourceAdapter;

/// What one pass did, for the end-of-pass log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub fetched: usize,
    pub fresh: usize,
    pub notified: usize,
    pub dropped_low_score: usize,
    pub source_errors: usize,
}

pub struct Orchestrator {
    sources: Vec<Box<dyn SourceAdapter>>,
    oracle: DynOracle,
    notifier: Arc<dyn Notifier>,
    responder: Arc<dyn Responder>,
    seen: SeenSet,
    keywords: Vec<String>,
    min_lead_score: u8,
    interval: Duration,
}

impl Orchestrator {
    pub fn new(
        sources: Vec<Box<dyn SourceAdapter>>,
        oracle: DynOracle,
        notifier: Arc<dyn Notifier>,
        responder: Arc<dyn Responder>,
        keywords: Vec<String>,
        min_lead_score: u8,
        interval: Duration,
    ) -> Self {
        crate::sources::ensure_metrics_described();
        Self {
            sources,
            oracle,
            notifier,
            responder,
            seen: SeenSet::default(),
            keywords,
            min_lead_score,
            interval,
        }
    }

    /// One full pass over every configured source, in the order they were
    /// registered.
    pub async fn run_pass(&mut self) -> PassSummary {
        let mut summary = PassSummary::default();

        for source in &self.sources {
            let platform = source.platform();
            tracing::info!(platform = platform.label(), "running source pass");

            let posts = match source.search(&self.keywords).await {
                Ok(posts) => posts,
                Err(e) => {
                    summary.source_errors += 1;
                    log_source_error(platform, &e);
                    counter!(
                        "scout_source_errors_total",
                        "platform" => platform.label(),
                        "kind" => error_kind(&e)
                    )
                    .increment(1);
                    continue;
                }
            };

            summary.fetched += posts.len();
            counter!("scout_posts_total", "platform" => platform.label())
                .increment(posts.len() as u64);

            for post in posts {
                if !self.seen.insert(&post) {
                    counter!("scout_dedup_total", "platform" => platform.label()).increment(1);
                    continue;
                }
                summary.fresh += 1;
                self.handle_fresh(&post, &mut summary).await;
            }
        }

        gauge!("scout_pass_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            fetched = summary.fetched,
            fresh = summary.fresh,
            notified = summary.notified,
            dropped = summary.dropped_low_score,
            source_errors = summary.source_errors,
            seen_total = self.seen.len(),
            "pass finished"
        );
        summary
    }

    async fn handle_fresh(&self, post: &Post, summary: &mut PassSummary) {
        if self.oracle.enabled() {
            let assessment = self
                .oracle
                .score_lead(&post.text, &post.author, self.min_lead_score)
                .await;
            if !assessment.is_quality {
                summary.dropped_low_score += 1;
                tracing::info!(
                    author = %post.author,
                    score = assessment.score,
                    threshold = self.min_lead_score,
                    reason = %assessment.reason,
                    "lead below threshold, dropping"
                );
                counter!(
                    "scout_dropped_low_score_total",
                    "platform" => post.platform.label()
                )
                .increment(1);
                return;
            }
            tracing::info!(
                author = %post.author,
                score = assessment.score,
                urgency = ?assessment.urgency,
                reason = %assessment.reason,
                "lead passed the quality gate"
            );
        }

        if self.notifier.notify(post).await {
            summary.notified += 1;
            counter!(
                "scout_leads_notified_total",
                "platform" => post.platform.label()
            )
            .increment(1);
        } else {
            tracing::warn!(
                notifier = self.notifier.name(),
                url = %post.url,
                "notification failed, continuing with the pass"
            );
        }

        // Replies are only possible where we hold API credentials.
        if post.platform == Platform::XApi {
            self.responder.reply(post).await;
        }
    }

    /// Continuous mode: run a pass, sleep, repeat until Ctrl-C. The handler is
    /// installed once up front and the signal latched, so a Ctrl-C arriving
    /// mid-pass still exits once that pass finishes.
    pub async fn run_loop(&mut self) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = tx.send(());
        });
        self.run_until(async {
            let _ = rx.await;
        })
        .await;
    }

    /// Drive passes until `shutdown` resolves. The future is only polled
    /// between passes; an in-flight pass always finishes cleanly.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut pass = 0u64;
        loop {
            pass += 1;
            tracing::info!(pass, "starting pass");
            self.run_pass().await;

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, exiting");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

fn error_kind(e: &SourceError) -> &'static str {
    match e {
        SourceError::Auth(_) => "auth",
        SourceError::AuthUnavailable(_) => "auth_unavailable",
        SourceError::RateLimited => "rate_limited",
        SourceError::NavigationTimeout(_) => "navigation_timeout",
        SourceError::Transient(_) => "transient",
    }
}

fn log_source_error(platform: Platform, e: &SourceError) {
    match e {
        SourceError::Auth(msg) => tracing::error!(
            platform = platform.label(),
            error = %msg,
            "authentication failed, check the configured credentials"
        ),
        SourceError::AuthUnavailable(msg) => tracing::warn!(
            platform = platform.label(),
            error = %msg,
            "login unavailable this pass, skipping the platform"
        ),
        SourceError::RateLimited => tracing::warn!(
            platform = platform.label(),
            "still rate limited after waiting, skipping the platform this pass"
        ),
        SourceError::NavigationTimeout(msg) => tracing::warn!(
            platform = platform.label(),
            error = %msg,
            "browser pass timed out, will retry next pass"
        ),
        SourceError::Transient(err) => tracing::warn!(
            platform = platform.label(),
            error = %err,
            "source pass failed, treating as an empty result"
        ),
    }
}
