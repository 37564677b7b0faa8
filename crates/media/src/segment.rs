//! Image segmentation over HTTP.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

use crate::error::MediaError;

/// Tuning parameters forwarded to the segmentation service.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationParams {
    pub input_size: u32,
    pub iou_threshold: f32,
    pub conf_threshold: f32,
    pub better_quality: bool,
    pub with_contours: bool,
    pub use_retina: bool,
    pub mask_random_color: bool,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            input_size: 1024,
            iou_threshold: 0.7,
            conf_threshold: 0.25,
            better_quality: true,
            with_contours: true,
            use_retina: true,
            mask_random_color: true,
        }
    }
}

impl SegmentationParams {
    fn form_fields(&self) -> [(&'static str, String); 7] {
        [
            ("input_size", self.input_size.to_string()),
            ("iou_threshold", self.iou_threshold.to_string()),
            ("conf_threshold", self.conf_threshold.to_string()),
            ("better_quality", self.better_quality.to_string()),
            ("withContours", self.with_contours.to_string()),
            ("use_retina", self.use_retina.to_string()),
            ("mask_random_color", self.mask_random_color.to_string()),
        ]
    }
}

/// Result of a segmentation call.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Encoded segmented image.
    pub image: Vec<u8>,
    /// Service-provided metadata, passed through to the client untouched.
    pub info: Value,
}

#[async_trait]
pub trait ImageSegmenter: Send + Sync {
    async fn segment(
        &self,
        image: &[u8],
        file_name: &str,
        params: &SegmentationParams,
    ) -> Result<Segmentation, MediaError>;
}

pub struct HttpSegmenter {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    segmented_image: String,
    #[serde(default)]
    info: Value,
}

impl HttpSegmenter {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ImageSegmenter for HttpSegmenter {
    async fn segment(
        &self,
        image: &[u8],
        file_name: &str,
        params: &SegmentationParams,
    ) -> Result<Segmentation, MediaError> {
        let mut form = Form::new().part(
            "image",
            Part::bytes(image.to_vec()).file_name(file_name.to_string()),
        );
        for (name, value) in params.form_fields() {
            form = form.text(name, value);
        }

        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(MediaError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body: SegmentResponse = response
            .json()
            .await
            .map_err(|e| MediaError::UnexpectedResponse(e.to_string()))?;
        Ok(Segmentation {
            image: decode_image(&body.segmented_image)?,
            info: body.info,
        })
    }
}

/// Decode a base64 image, with or without a `data:` URL prefix.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, MediaError> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    Ok(STANDARD.decode(payload.trim())?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
