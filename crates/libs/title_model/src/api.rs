use base64::{Engine as _, engine::general_purpose};
use bon::bon;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TitleError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (status {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

pub type TitleResult<T> = Result<T, TitleError>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MessagePart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
pub struct ChatFullResponse {
    pub choices: Vec<FullChoice>,
}

#[derive(Deserialize)]
pub struct FullChoice {
    pub message: FullMessage,
}

#[derive(Deserialize)]
pub struct FullMessage {
    pub content: Option<String>,
}

#[derive(Clone)]
pub struct VisionConfig {
    pub temperature: f32,
    pub top_p: f32,
}

/// Client for an OpenAI-compatible vision chat endpoint. Images are passed
/// inline as base64 data URLs.
#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    config: VisionConfig,
}

#[bon]
impl VisionClient {
    #[builder(start_fn = with_base_url)]
    #[must_use]
    pub fn new(
        #[builder(start_fn)] base_url: &str,
        model: Option<String>,
        temperature: Option<f32>,
        top_p: Option<f32>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            // Each request carries its own timeout; a slow title for one
            // photo must not hold a shared deadline over the batch.
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(timeout_secs.unwrap_or(120)))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or_default(),
            config: VisionConfig {
                temperature: temperature.unwrap_or(0.7),
                top_p: top_p.unwrap_or(0.8),
            },
        }
    }

    /// Turns raw image bytes into an inline data-URL message part.
    #[must_use]
    pub fn image_part(bytes: &[u8]) -> MessagePart {
        let mime_type = infer::get(bytes).map_or("image/jpeg", |kind| kind.mime_type());
        let b64 = general_purpose::STANDARD.encode(bytes);
        MessagePart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{mime_type};base64,{b64}"),
            },
        }
    }

    #[must_use]
    pub fn text_part(text: impl Into<String>) -> MessagePart {
        MessagePart::Text { text: text.into() }
    }

    pub async fn call(&self, messages: Vec<Message>) -> TitleResult<String> {
        let req_body = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self.http.post(url).json(&req_body).send().await?;
        if !response.status().is_success() {
            return Err(TitleError::Api {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let full: ChatFullResponse = response.json().await?;
        Ok(full
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_part_builds_a_data_url() {
        // Minimal PNG magic so `infer` recognizes the type.
        let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let MessagePart::ImageUrl { image_url } = VisionClient::image_part(png) else {
            panic!("expected image part");
        };
        assert!(image_url.url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn unknown_bytes_default_to_jpeg_mime() {
        let MessagePart::ImageUrl { image_url } = VisionClient::image_part(b"plain") else {
            panic!("expected image part");
        };
        assert!(image_url.url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn message_parts_serialize_with_tagged_type() {
        let part = VisionClient::text_part("hello");
        let json = serde_json::to_value(&part).expect("serialize");
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");
    }
}
