// src/lib.rs
//! Lead scouting pipeline: poll social platforms for keyword-matching posts,
//! gate them through an optional LLM quality score, and push fresh leads to a
//! WhatsApp webhook (with optional auto-replies on X).

pub mod config;
pub mod error;
pub mod notify;
pub mod oracle;
pub mod orchestrator;
pub mod post;
pub mod responder;
pub mod session;
pub mod sources;

pub use config::{RunMode, ScoutConfig};
pub use orchestrator::{Orchestrator, PassSummary};
pub use post::{Platform, Post, SeenSet};
