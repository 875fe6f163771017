use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::config::TelegramConfig;
use crate::notify::{Notifier, PriceAlert};
use crate::policy::AlertDecision;
use crate::utils::error::AppError;
use crate::Result;

/// Delivers alerts through the Telegram Bot API; the chat id is the owning
/// user's id.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    fn render_message(alert: &PriceAlert) -> String {
        let (emoji, headline, verb) = match alert.decision {
            AlertDecision::PriceDrop => ("📉", "Price Alert!", "dropped"),
            AlertDecision::PriceRise => ("📈", "Price Alert!", "increased"),
            AlertDecision::TargetReached => ("🎯", "Target price reached!", "dropped"),
            AlertDecision::None => ("📊", "Price update", "changed"),
        };

        let mut message = format!(
            "{emoji} *{headline}* {emoji}\n\n\
             *Product:* {}\n\
             *Old Price:* {:.2}\n\
             *New Price:* {:.2}\n",
            alert.title, alert.old_price, alert.new_price
        );

        if alert.decision == AlertDecision::TargetReached {
            if let Some(target) = alert.target_price {
                message.push_str(&format!("*Your Target:* {:.2}\n", target));
            }
        }

        message.push_str(&format!(
            "\nThe price has {verb}!\n\n[View Product]({})",
            alert.url
        ));
        message
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, alert: &PriceAlert) -> Result<()> {
        let payload = json!({
            "chat_id": alert.user_id,
            "text": Self::render_message(alert),
            "parse_mode": "Markdown",
            "disable_web_page_preview": self.config.disable_web_page_preview,
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Delivery(format!(
                "telegram api returned {}",
                response.status()
            )));
        }

        tracing::debug!(user_id = alert.user_id, item_id = %alert.item_id, "alert delivered");
        Ok(())
    }
}
