// tests/orchestrator_pipeline.rs
// Pipeline-level behavior with scripted sources and recording sinks: dedup
// across passes, the score gate, failure isolation, and reply routing.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use leadscout::error::SourceError;
use leadscout::notify::Notifier;
use leadscout::oracle::MockOracle;
use leadscout::orchestrator::Orchestrator;
use leadscout::post::{Platform, Post};
use leadscout::responder::Responder;
use leadscout::sources::SourceAdapter;

fn post(platform: Platform, id: &str) -> Post {
    Post {
        id: id.to_string(),
        author: "maria".into(),
        text: "need a website for my store".into(),
        url: format!("https://example.com/{id}"),
        platform,
        observed_at: Utc::now(),
    }
}

/// Source whose successive `search` calls return pre-scripted batches.
struct ScriptedSource {
    platform: Platform,
    batches: Mutex<VecDeque<Result<Vec<Post>, SourceError>>>,
}

impl ScriptedSource {
    fn new(platform: Platform, batches: Vec<Result<Vec<Post>, SourceError>>) -> Self {
        Self {
            platform,
            batches: Mutex::new(batches.into()),
        }
    }
}

#[async_trait]
impl SourceAdapter for ScriptedSource {
    async fn search(&self, _keywords: &[String]) -> Result<Vec<Post>, SourceError> {
        self.batches
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn platform(&self) -> Platform {
        self.platform
    }
}

struct RecordingNotifier {
    ok: bool,
    delivered: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new(ok: bool) -> Self {
        Self {
            ok,
            delivered: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, post: &Post) -> bool {
        self.delivered.lock().push(post.dedup_key());
        self.ok
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[derive(Default)]
struct RecordingResponder {
    replied: Mutex<Vec<String>>,
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, post: &Post) {
        self.replied.lock().push(post.dedup_key());
    }
}

fn orchestrator(
    sources: Vec<Box<dyn SourceAdapter>>,
    score: u8,
    notifier: Arc<RecordingNotifier>,
    responder: Arc<RecordingResponder>,
) -> Orchestrator {
    Orchestrator::new(
        sources,
        Arc::new(MockOracle::scoring(score)),
        notifier,
        responder,
        vec!["need a website".into()],
        7,
        Duration::from_secs(1),
    )
}

#[tokio::test]
async fn second_pass_skips_already_seen_posts() {
    let source = ScriptedSource::new(
        Platform::XApi,
        vec![
            Ok(vec![post(Platform::XApi, "1")]),
            Ok(vec![post(Platform::XApi, "1"), post(Platform::XApi, "2")]),
        ],
    );
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(source)],
        10,
        notifier.clone(),
        responder.clone(),
    );

    let first = orch.run_pass().await;
    assert_eq!(first.fresh, 1);

    let second = orch.run_pass().await;
    assert_eq!(second.fetched, 2);
    assert_eq!(second.fresh, 1);
    assert_eq!(*notifier.delivered.lock(), ["X:1", "X:2"]);
}

#[tokio::test]
async fn score_below_threshold_is_dropped_silently() {
    let source = ScriptedSource::new(Platform::XApi, vec![Ok(vec![post(Platform::XApi, "1")])]);
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(source)],
        6,
        notifier.clone(),
        responder.clone(),
    );

    let summary = orch.run_pass().await;
    assert_eq!(summary.dropped_low_score, 1);
    assert_eq!(summary.notified, 0);
    assert!(notifier.delivered.lock().is_empty());
    assert!(responder.replied.lock().is_empty());
}

#[tokio::test]
async fn score_at_threshold_is_notified_and_replied() {
    let source = ScriptedSource::new(Platform::XApi, vec![Ok(vec![post(Platform::XApi, "1")])]);
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(source)],
        7,
        notifier.clone(),
        responder.clone(),
    );

    let summary = orch.run_pass().await;
    assert_eq!(summary.notified, 1);
    assert_eq!(*notifier.delivered.lock(), ["X:1"]);
    assert_eq!(*responder.replied.lock(), ["X:1"]);
}

#[tokio::test]
async fn failing_source_does_not_stop_the_pass() {
    let broken = ScriptedSource::new(Platform::XApi, vec![Err(SourceError::RateLimited)]);
    let healthy = ScriptedSource::new(
        Platform::Facebook,
        vec![Ok(vec![post(Platform::Facebook, "fb1")])],
    );
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(broken), Box::new(healthy)],
        10,
        notifier.clone(),
        responder.clone(),
    );

    let summary = orch.run_pass().await;
    assert_eq!(summary.source_errors, 1);
    assert_eq!(summary.notified, 1);
    assert_eq!(*notifier.delivered.lock(), ["Facebook:fb1"]);
}

#[tokio::test]
async fn empty_source_does_not_stop_later_sources() {
    let empty = ScriptedSource::new(Platform::XApi, vec![Ok(Vec::new())]);
    let healthy = ScriptedSource::new(
        Platform::TikTok,
        vec![Ok(vec![post(Platform::TikTok, "v1")])],
    );
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(empty), Box::new(healthy)],
        10,
        notifier.clone(),
        responder.clone(),
    );

    let summary = orch.run_pass().await;
    assert_eq!(summary.source_errors, 0);
    assert_eq!(*notifier.delivered.lock(), ["TikTok:v1"]);
}

#[tokio::test]
async fn failed_notification_still_attempts_the_reply() {
    let source = ScriptedSource::new(Platform::XApi, vec![Ok(vec![post(Platform::XApi, "1")])]);
    let notifier = Arc::new(RecordingNotifier::new(false));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(source)],
        10,
        notifier.clone(),
        responder.clone(),
    );

    let summary = orch.run_pass().await;
    assert_eq!(summary.notified, 0);
    assert_eq!(*responder.replied.lock(), ["X:1"]);
}

/// Fires a shutdown sender from inside the first `search` call, i.e. while a
/// pass is in flight.
struct SignalingSource {
    inner: ScriptedSource,
    tx: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

#[async_trait]
impl SourceAdapter for SignalingSource {
    async fn search(&self, keywords: &[String]) -> Result<Vec<Post>, SourceError> {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(());
        }
        self.inner.search(keywords).await
    }

    fn platform(&self) -> Platform {
        self.inner.platform()
    }
}

#[tokio::test]
async fn shutdown_during_a_pass_exits_after_that_pass() {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let source = SignalingSource {
        inner: ScriptedSource::new(
            Platform::XApi,
            vec![
                Ok(vec![post(Platform::XApi, "1")]),
                Ok(vec![post(Platform::XApi, "2")]),
            ],
        ),
        tx: Mutex::new(Some(tx)),
    };
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(source)],
        10,
        notifier.clone(),
        responder.clone(),
    );

    orch.run_until(async {
        let _ = rx.await;
    })
    .await;

    // The in-flight pass completed; a second one never started.
    assert_eq!(*notifier.delivered.lock(), ["X:1"]);
}

#[tokio::test]
async fn replies_are_limited_to_x_posts() {
    let source = ScriptedSource::new(
        Platform::TikTok,
        vec![Ok(vec![post(Platform::TikTok, "v1")])],
    );
    let notifier = Arc::new(RecordingNotifier::new(true));
    let responder = Arc::new(RecordingResponder::default());
    let mut orch = orchestrator(
        vec![Box::new(source)],
        10,
        notifier.clone(),
        responder.clone(),
    );

    let summary = orch.run_pass().await;
    assert_eq!(summary.notified, 1);
    assert!(responder.replied.lock().is_empty());
}
