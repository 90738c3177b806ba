//! 媒体工具接口（探测 / 合成 / 混流 / 淡入淡出 / 帧编码）

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ToolError;
use crate::models::{CapturedFrame, CompositionSpec, MediaInfo};

/// 外部视频工具
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// 读取媒体的时长 / 分辨率 / 帧率
    async fn probe(&self, media: &Path) -> Result<MediaInfo, ToolError>;

    /// 按分层描述渲染视频
    async fn compose(&self, spec: &CompositionSpec, output: &Path) -> Result<PathBuf, ToolError>;

    /// 合并视频和音频，以较短的流为准
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<PathBuf, ToolError>;

    /// 首尾加固定时长的淡入淡出
    async fn fade(
        &self,
        input: &Path,
        fade_seconds: f64,
        duration: f64,
        output: &Path,
    ) -> Result<PathBuf, ToolError>;

    /// 把录制帧编码成视频
    async fn encode_frames(
        &self,
        frames: &[CapturedFrame],
        output: &Path,
    ) -> Result<PathBuf, ToolError>;
}
