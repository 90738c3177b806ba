//! 语音合成（可选）
//!
//! 没有配置服务时使用 [`UnavailableSpeech`]，旁白阶段会退化为只输出文字稿。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::ToolError;
use crate::models::NarrationSegment;

/// 语音合成服务
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// 服务是否可用
    fn is_available(&self) -> bool;

    /// 把带时间码的旁白合成为一条音轨
    async fn synthesize(
        &self,
        segments: &[NarrationSegment],
        voice: &str,
        output: &Path,
    ) -> Result<PathBuf, ToolError>;
}

/// 不可用的语音服务
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSpeech;

#[async_trait]
impl SpeechSynthesizer for UnavailableSpeech {
    fn is_available(&self) -> bool {
        false
    }

    async fn synthesize(
        &self,
        _segments: &[NarrationSegment],
        _voice: &str,
        _output: &Path,
    ) -> Result<PathBuf, ToolError> {
        Err(ToolError::Unavailable {
            tool: "speech".to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    voice: &'a str,
    format: &'static str,
    segments: Vec<SpeechCue<'a>>,
}

#[derive(Debug, Serialize)]
struct SpeechCue<'a> {
    text: &'a str,
    start: f64,
    duration: f64,
}

/// HTTP 语音服务：POST 时间码旁白，返回 wav 音频
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ToolError> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ToolError::RequestFailed {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    fn is_available(&self) -> bool {
        true
    }

    async fn synthesize(
        &self,
        segments: &[NarrationSegment],
        voice: &str,
        output: &Path,
    ) -> Result<PathBuf, ToolError> {
        let request_failed = |reason: String| ToolError::RequestFailed {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let body = SpeechRequest {
            voice,
            format: "wav",
            segments: segments
                .iter()
                .map(|s| SpeechCue {
                    text: &s.text,
                    start: s.start_time,
                    duration: s.duration,
                })
                .collect(),
        };
        debug!("请求语音合成: {} 段, 音色 {}", segments.len(), voice);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(request_failed(format!("HTTP {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| request_failed(e.to_string()))?;
        if bytes.is_empty() {
            return Err(request_failed("返回的音频为空".to_string()));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| request_failed(e.to_string()))?;
        }
        tokio::fs::write(output, &bytes)
            .await
            .map_err(|e| request_failed(e.to_string()))?;
        Ok(output.to_path_buf())
    }
}
