use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{DetectionError, Result};
use crate::types::{AnalysisOutcome, AnalysisRequest, RawAnalysisResponse};

/// Common interface to the remote deepfake-detection service (§6). Out of
/// scope to implement the detector itself; this crate only speaks its
/// HTTP contract and fuses the signals it returns (§4.5).
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    async fn analyze(&self, image: Vec<u8>, req: AnalysisRequest) -> Result<AnalysisOutcome>;
}

/// HTTP-backed [`AnalysisClient`]. One request per call, form-encoded body,
/// hard 30 s timeout (§4.4 step 3) enforced both on the request itself and
/// by the caller's `tokio::time::timeout` wrapping the whole stage.
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpAnalysisClient {
    pub fn new(base_url: String, timeout_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/analyze", base_url.trim_end_matches('/')),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(&self, image: Vec<u8>, req: AnalysisRequest) -> Result<AnalysisOutcome> {
        let form = reqwest::multipart::Form::new()
            .part(
                "image",
                reqwest::multipart::Part::bytes(image).file_name("upload.bin"),
            )
            .text("detail_level", req.detail_level.as_str())
            .text("preserve_exif", req.preserve_exif.to_string());

        debug!(detail_level = req.detail_level.as_str(), "calling analysis API");

        let resp = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DetectionError::Timeout
                } else {
                    DetectionError::Http(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "analysis API error");
            return Err(DetectionError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let raw: RawAnalysisResponse = resp
            .json()
            .await
            .map_err(|e| DetectionError::Parse(e.to_string()))?;

        Ok(raw.into_outcome())
    }
}
