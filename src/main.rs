// src/main.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use leadscout::config::{RunMode, ScoutConfig};
use leadscout::notify::whatsapp::WhatsAppNotifier;
use leadscout::oracle::build_oracle;
use leadscout::orchestrator::Orchestrator;
use leadscout::post::Platform;
use leadscout::responder::XResponder;
use leadscout::sources::x_api::verify_posting_credentials;
use leadscout::sources::{FacebookAdapter, SourceAdapter, TikTokAdapter, XApiAdapter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = ScoutConfig::from_env().context("invalid configuration")?;
    cfg.log_posture();

    if let Some(addr) = std::env::var("METRICS_ADDR").ok().filter(|v| !v.is_empty()) {
        let addr: std::net::SocketAddr = addr
            .parse()
            .context("METRICS_ADDR is not a socket address")?;
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start the Prometheus exporter")?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    // Fail fast in the logs (not the process) when reply credentials are bad.
    if cfg.auto_reply {
        if let Some(token) = &cfg.x.access_token {
            verify_posting_credentials(token).await;
        }
    }

    let oracle = build_oracle(&cfg);

    let mut keywords = cfg.keywords.clone();
    if cfg.expand_keywords && oracle.enabled() {
        let extra = oracle.expand_keywords(&keywords, 5).await;
        if !extra.is_empty() {
            tracing::info!(suggested = ?extra, "adding oracle-suggested keywords");
            keywords.extend(extra);
        }
    }

    let mut sources: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for platform in &cfg.platforms {
        match platform {
            Platform::XApi => match XApiAdapter::new(&cfg) {
                Some(adapter) => sources.push(Box::new(adapter)),
                None => tracing::warn!("skipping the X source: no bearer token"),
            },
            Platform::Facebook => sources.push(Box::new(FacebookAdapter::new(&cfg))),
            Platform::TikTok => sources.push(Box::new(TikTokAdapter::new(&cfg))),
        }
    }
    if sources.is_empty() {
        anyhow::bail!("no usable sources after credential checks");
    }

    let notifier = Arc::new(WhatsAppNotifier::new(
        cfg.callmebot_phone.clone(),
        cfg.callmebot_apikey.clone(),
    ));
    let responder = Arc::new(XResponder::new(&cfg, oracle.clone()));

    let mut orchestrator = Orchestrator::new(
        sources,
        oracle,
        notifier,
        responder,
        keywords,
        cfg.min_lead_score,
        cfg.interval,
    );

    match cfg.mode {
        RunMode::Once => {
            orchestrator.run_pass().await;
        }
        RunMode::Loop => orchestrator.run_loop().await,
    }

    Ok(())
}
