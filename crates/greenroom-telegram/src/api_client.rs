//! Outbound Bot API client used by the dispatch and ingestion flows.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::keyboard::InlineKeyboard;

#[derive(Debug, Clone, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
/// Result payload of `sendMessage`.
pub struct SentMessage {
    pub message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct FileInfo {
    #[serde(default)]
    file_path: Option<String>,
}

#[derive(Debug, Clone)]
/// Bytes downloaded from the file endpoint plus the declared content type.
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
/// Thin request/response client over the Bot API. No retries: every failure
/// surfaces once, synchronously, to the triggering event.
pub struct TelegramApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramApiClient {
    pub fn new(api_base: &str, bot_token: &str, request_timeout_ms: u64) -> Result<Self> {
        let api_base = api_base.trim().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            bail!("telegram api base cannot be empty");
        }
        let bot_token = bot_token.trim().to_string();
        if bot_token.is_empty() {
            bail!("telegram bot token cannot be empty");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create telegram api client")?;
        Ok(Self {
            http,
            api_base,
            bot_token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboard>,
    ) -> Result<SentMessage> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] =
                serde_json::to_value(markup).context("failed to encode reply markup")?;
        }
        let result: SentMessage = self.call_method("sendMessage", &payload).await?;
        Ok(result)
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboard>,
    ) -> Result<()> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] =
                serde_json::to_value(markup).context("failed to encode reply markup")?;
        }
        let _: Value = self.call_method("editMessageText", &payload).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let payload = json!({ "callback_query_id": callback_query_id });
        let _: Value = self.call_method("answerCallbackQuery", &payload).await?;
        Ok(())
    }

    /// Resolves a file reference to the provider-relative download path.
    pub async fn get_file_path(&self, file_id: &str) -> Result<String> {
        let payload = json!({ "file_id": file_id });
        let info: FileInfo = self.call_method("getFile", &payload).await?;
        info.file_path
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .ok_or_else(|| anyhow!("telegram getFile response missing file_path"))
    }

    /// Downloads the raw file bytes for a previously resolved file path.
    pub async fn download_file(&self, file_path: &str) -> Result<DownloadedFile> {
        let url = format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.bot_token,
            file_path.trim_start_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("telegram file download request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("telegram file download failed with status {}", status.as_u16());
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .context("failed to read telegram file body")?
            .to_vec();
        Ok(DownloadedFile { bytes, content_type })
    }

    async fn call_method<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> Result<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "telegram {method} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 320)
            );
        }
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .with_context(|| format!("failed to decode telegram {method} response"))?;
        if !envelope.ok {
            bail!(
                "telegram {method} failed: {}",
                envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        envelope
            .result
            .ok_or_else(|| anyhow!("telegram {method} response missing result"))
    }
}

fn truncate_for_error(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    let truncated: String = raw.chars().take(max_chars).collect();
    format!("{truncated}...")
}
