use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;
use time::{OffsetDateTime, macros::format_description};

use crate::listing::Listing;

pub const TELEGRAM_API: &str = "https://api.telegram.org";
pub const REAPPEARED_WARNING: &str = "⚠️ Possibly seen before";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message and returns the transport's receipt, e.g. the
    /// HTTP status and response body. Called once per message; never retried.
    async fn send(&self, text: &str) -> Result<String>;
}

// -------------------------
// Message bodies
// -------------------------

pub fn listing_message(listing: &Listing, reappeared: bool) -> String {
    let mut msg = format!(
        "🚗 {}\n📅 Year: {}\n💰 Price: {}\n📏 Mileage: {}\n🛡️ Warranty: {}\n🔗 {}",
        listing.title, listing.year, listing.price, listing.mileage, listing.warranty, listing.link
    );
    if reappeared {
        msg.push('\n');
        msg.push_str(REAPPEARED_WARNING);
    }
    msg
}

pub fn no_new_listings_message(at: OffsetDateTime) -> String {
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let stamp = at.format(&fmt).unwrap_or_default();
    format!("{stamp} - No new listings.")
}

// -------------------------
// Telegram
// -------------------------

/// Sends messages through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build telegram client")?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<String> {
        let form = [("chat_id", self.chat_id.as_str()), ("text", text)];
        let rsp = self
            .client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .context("telegram request failed")?;

        let status = rsp.status();
        let body = rsp.text().await.unwrap_or_default();
        tracing::debug!(%status, %body, "telegram response");

        if !status.is_success() {
            return Err(anyhow!("telegram returned {status}: {body}"));
        }
        Ok(receipt(status, &body))
    }
}

fn receipt(status: reqwest::StatusCode, body: &str) -> String {
    format!("HTTP status: {status}\nAPI response: {body}")
}

// -------------------------
// Console
// -------------------------

/// Prints messages to stdout instead of delivering them.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, text: &str) -> Result<String> {
        println!("{text}\n{}", "-".repeat(40));
        Ok("printed to stdout".to_string())
    }
}
