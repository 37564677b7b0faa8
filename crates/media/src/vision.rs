//! Image description through a vision chat-completion API.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;

use crate::error::MediaError;

pub const DEFAULT_MODEL: &str = "vivo-BlueLM-V-2.0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SESSION_PROMPT: &str = "医学影像分析";

/// Instruction sent alongside the segmented image.
pub const MEDICAL_ANALYSIS_PROMPT: &str = "请作为一名专业的医学影像专家，分析这张经过图像分割处理的医学影像。

请从以下几个方面进行专业分析：
1. 影像类型识别：判断这是什么类型的医学影像（如X光、CT、MRI、超声、病理切片等）
2. 分割结果分析：识别图像分割后突出显示的主要解剖结构和区域
3. 医学结构识别：识别图像中的重要医学结构和器官
4. 异常发现：如果存在异常区域，请指出可能的病变或异常表现
5. 临床意义：基于分割结果和影像表现，说明潜在的临床意义

请用专业但易懂的语言进行描述，为医学诊断提供有价值的参考信息。";

/// Produces a textual description of an image.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, image: &[u8]) -> Result<String, MediaError>;
}

pub struct HttpDescriber {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl HttpDescriber {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageDescriber for HttpDescriber {
    async fn describe(&self, image: &[u8]) -> Result<String, MediaError> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let body = completion_request(&self.model, &request_id, image);

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(&self.url)
            .query(&[("requestId", request_id.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

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

        let reply: Value = response.json().await?;
        tracing::debug!(
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Vision model replied",
        );
        extract_description(&reply)
    }
}

fn completion_request(model: &str, request_id: &str, image: &[u8]) -> Value {
    serde_json::json!({
        "prompt": SESSION_PROMPT,
        "sessionId": uuid::Uuid::new_v4().to_string(),
        "requestId": request_id,
        "model": model,
        "messages": [
            {
                "role": "user",
                "content": format!("data:image/JPEG;base64,{}", STANDARD.encode(image)),
                "contentType": "image",
            },
            {
                "role": "user",
                "content": MEDICAL_ANALYSIS_PROMPT,
                "contentType": "text",
            },
        ],
    })
}

/// Pull the generated text out of either supported reply shape.
fn extract_description(reply: &Value) -> Result<String, MediaError> {
    if let Some(content) = reply.pointer("/data/content").and_then(Value::as_str) {
        return Ok(content.to_string());
    }
    if let Some(first) = reply
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    {
        let content = first
            .pointer("/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Ok(content.to_string());
    }
    Err(MediaError::UnexpectedResponse(
        "no description content in reply".into(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
