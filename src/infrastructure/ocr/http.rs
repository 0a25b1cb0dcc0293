use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{OcrEngine, OcrError};

/// Connection settings for a remote OCR service
#[derive(Debug, Clone)]
pub struct HttpOcrEngineConfig {
    /// Full URL of the recognize endpoint
    pub endpoint: String,
    /// Language hint forwarded to the service
    pub language: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    image: String,
    mime_type: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    text: String,
}

/// OCR engine backed by a JSON-over-HTTP service
///
/// Posts `{image, mime_type, language}` with the image base64-encoded and
/// expects `{text}` back.
#[derive(Debug, Clone)]
pub struct HttpOcrEngine {
    client: reqwest::Client,
    config: HttpOcrEngineConfig,
}

impl HttpOcrEngine {
    pub fn new(config: HttpOcrEngineConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OcrError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl OcrEngine for HttpOcrEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<String, OcrError> {
        let request = RecognizeRequest {
            image: base64::engine::general_purpose::STANDARD.encode(image),
            mime_type,
            language: &self.config.language,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Service { status, body });
        }

        let result: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))?;

        Ok(result.text.trim().to_string())
    }
}
