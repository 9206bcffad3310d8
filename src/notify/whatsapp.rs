// src/notify/whatsapp.rs
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::{format_lead_message, Notifier};
use crate::post::Post;

const CALLMEBOT_URL: &str = "https://api.callmebot.com/whatsapp.php";

/// WhatsApp alerts via the CallMeBot webhook. Phone and API key travel as query
/// parameters; 200 means delivered, anything else is a failure. A failed send
/// is logged and dropped, not retried.
pub struct WhatsAppNotifier {
    phone: Option<String>,
    apikey: Option<String>,
    client: Client,
}

impl WhatsAppNotifier {
    pub fn new(phone: Option<String>, apikey: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            phone,
            apikey,
            client,
        }
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn notify(&self, post: &Post) -> bool {
        let (Some(phone), Some(apikey)) = (&self.phone, &self.apikey) else {
            tracing::debug!("WhatsApp not configured; skipping notification");
            return false;
        };

        let message = format_lead_message(post);
        let result = self
            .client
            .get(CALLMEBOT_URL)
            .query(&[
                ("phone", phone.as_str()),
                ("text", message.as_str()),
                ("apikey", apikey.as_str()),
            ])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().as_u16() == 200 => {
                tracing::info!(author = %post.author, platform = %post.platform, "WhatsApp notification sent");
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(%status, body = %body, "WhatsApp notification rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "WhatsApp notification failed");
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "whatsapp"
    }
}
