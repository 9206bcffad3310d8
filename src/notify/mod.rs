// src/notify/mod.rs
pub mod whatsapp;

use async_trait::async_trait;

use crate::post::Post;

pub use whatsapp::WhatsAppNotifier;

/// Operator notification channel. Failure is reported, never raised: a dead
/// webhook must not abort the pass.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns true when the message was accepted by the channel.
    async fn notify(&self, post: &Post) -> bool;
    fn name(&self) -> &'static str;
}

/// Fixed-layout lead alert: author, body truncated to 150 chars, url.
pub fn format_lead_message(post: &Post) -> String {
    let body: String = post.text.chars().take(150).collect();
    format!(
        "[!] New {} Lead Found!\n\nAuthor: @{}\nPost: {}...\n\nView: {}",
        post.platform, post.author, body, post.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::Platform;
    use chrono::Utc;

    #[test]
    fn message_layout_and_truncation() {
        let post = Post {
            id: "1".into(),
            author: "bakery_jo".into(),
            text: "x".repeat(400),
            url: "https://twitter.com/bakery_jo/status/1".into(),
            platform: Platform::XApi,
            observed_at: Utc::now(),
        };
        let msg = format_lead_message(&post);
        assert!(msg.starts_with("[!] New X Lead Found!"));
        assert!(msg.contains("Author: @bakery_jo"));
        assert!(msg.contains(&"x".repeat(150)));
        assert!(!msg.contains(&"x".repeat(151)));
        assert!(msg.ends_with("View: https://twitter.com/bakery_jo/status/1"));
    }
}
