//! 不依赖浏览器和外部工具的替身实现
//!
//! 用于单元测试和集成测试。

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{SessionError, StepError, ToolError};
use crate::infrastructure::automation::AutomationDriver;
use crate::infrastructure::media::MediaToolkit;
use crate::infrastructure::speech::SpeechSynthesizer;
use crate::models::{CapturedFrame, CompositionSpec, MediaInfo, NarrationSegment};

async fn touch(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 按脚本行为的自动化驱动
///
/// - `missing` 中的选择器一律找不到
/// - id 以 `failing_sessions` 中任一前缀开头的演示无法开始录制
/// - 所有调用按顺序记录在 `calls()` 里
#[derive(Default)]
pub struct ScriptedDriver {
    missing: HashSet<String>,
    failing_sessions: HashSet<String>,
    fail_everything: bool,
    calls: Mutex<Vec<String>>,
    highlighted: Mutex<BTreeSet<String>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让某个选择器永远匹配不到
    pub fn with_missing(mut self, selector: impl Into<String>) -> Self {
        self.missing.insert(selector.into());
        self
    }

    /// 让 id 以该前缀开头的演示会话启动失败（演示 id 以模板 key 开头）
    pub fn with_failing_session(mut self, demo_id_prefix: impl Into<String>) -> Self {
        self.failing_sessions.insert(demo_id_prefix.into());
        self
    }

    /// 所有会话都启动失败
    pub fn failing_all_sessions(mut self) -> Self {
        self.fail_everything = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// 当前仍处于高亮状态的选择器
    pub fn active_highlights(&self) -> BTreeSet<String> {
        lock(&self.highlighted).clone()
    }

    fn record(&self, call: String) {
        lock(&self.calls).push(call);
    }

    fn check(&self, selector: &str) -> Result<(), StepError> {
        if self.missing.contains(selector) {
            Err(StepError::ElementNotFound {
                selector: selector.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn begin_session(&self, demo_id: &str, frames_dir: &Path) -> Result<(), SessionError> {
        self.record(format!("begin:{}", demo_id));
        let scripted_failure = self.fail_everything
            || self.failing_sessions.iter().any(|p| demo_id.starts_with(p.as_str()));
        if scripted_failure {
            return Err(SessionError::RecordingFailed {
                demo_id: demo_id.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        tokio::fs::create_dir_all(frames_dir)
            .await
            .map_err(|e| SessionError::RecordingFailed {
                demo_id: demo_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn end_session(&self, output: &Path) -> Result<PathBuf, ToolError> {
        self.record("end".to_string());
        touch(output, b"fake-video")
            .await
            .map_err(|e| ToolError::spawn_failed("recorder", e))?;
        Ok(output.to_path_buf())
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), StepError> {
        self.record(format!("navigate:{}", url));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), StepError> {
        self.record(format!("click:{}", selector));
        self.check(selector)
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), StepError> {
        self.record(format!("type:{}={}", selector, text));
        self.check(selector)
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), StepError> {
        self.record(format!("select:{}={}", selector, value));
        self.check(selector)
    }

    async fn hover(&self, selector: &str) -> Result<(), StepError> {
        self.record(format!("hover:{}", selector));
        self.check(selector)
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<(), StepError> {
        self.record(format!("scroll:{}", delta_y));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        _poll: Duration,
    ) -> Result<(), StepError> {
        self.record(format!("wait_for:{}", selector));
        if self.missing.contains(selector) {
            return Err(StepError::Timeout {
                action: "wait_for_element".to_string(),
                target: selector.to_string(),
                timeout_secs: timeout.as_secs_f64(),
            });
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), StepError> {
        self.record(format!("screenshot:{}", path.display()));
        touch(path, b"fake-png")
            .await
            .map_err(|e| StepError::ScreenshotFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    async fn set_highlight(&self, selector: &str, enabled: bool) -> Result<(), StepError> {
        self.record(format!("highlight:{}={}", selector, enabled));
        self.check(selector)?;
        let mut active = lock(&self.highlighted);
        if enabled {
            active.insert(selector.to_string());
        } else {
            active.remove(selector);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// 假的媒体工具：写出占位文件，可按需让某个操作失败
pub struct FakeMediaToolkit {
    video_info: Option<MediaInfo>,
    audio_duration: Option<f64>,
    fail_compose: bool,
    fail_mux: bool,
    fail_fade: bool,
    last_spec: Mutex<Option<CompositionSpec>>,
    operations: Mutex<Vec<String>>,
}

impl Default for FakeMediaToolkit {
    fn default() -> Self {
        Self {
            video_info: Some(MediaInfo {
                duration: 30.0,
                width: 1280,
                height: 720,
                fps: 25.0,
            }),
            audio_duration: None,
            fail_compose: false,
            fail_mux: false,
            fail_fade: false,
            last_spec: Mutex::new(None),
            operations: Mutex::new(Vec::new()),
        }
    }
}

impl FakeMediaToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// 视频探测结果；None 表示探测失败
    pub fn with_video_info(mut self, info: Option<MediaInfo>) -> Self {
        self.video_info = info;
        self
    }

    /// 音频时长；None 时探测音频失败
    pub fn with_audio_duration(mut self, seconds: f64) -> Self {
        self.audio_duration = Some(seconds);
        self
    }

    pub fn failing_compose(mut self) -> Self {
        self.fail_compose = true;
        self
    }

    pub fn failing_mux(mut self) -> Self {
        self.fail_mux = true;
        self
    }

    pub fn failing_fade(mut self) -> Self {
        self.fail_fade = true;
        self
    }

    pub fn last_spec(&self) -> Option<CompositionSpec> {
        lock(&self.last_spec).clone()
    }

    pub fn operations(&self) -> Vec<String> {
        lock(&self.operations).clone()
    }

    fn record(&self, op: &str) {
        lock(&self.operations).push(op.to_string());
    }

    async fn produce(&self, tool: &str, output: &Path, fail: bool) -> Result<PathBuf, ToolError> {
        if fail {
            return Err(ToolError::NonZeroExit {
                tool: tool.to_string(),
                code: Some(1),
                stderr: "scripted failure".to_string(),
            });
        }
        touch(output, tool.as_bytes())
            .await
            .map_err(|e| ToolError::spawn_failed(tool, e))?;
        Ok(output.to_path_buf())
    }
}

#[async_trait]
impl MediaToolkit for FakeMediaToolkit {
    async fn probe(&self, media: &Path) -> Result<MediaInfo, ToolError> {
        self.record("probe");
        let is_audio = media
            .extension()
            .map(|ext| ext == "wav" || ext == "mp3")
            .unwrap_or(false);
        let info = if is_audio {
            self.audio_duration.map(|duration| MediaInfo {
                duration,
                width: 0,
                height: 0,
                fps: 0.0,
            })
        } else {
            self.video_info
        };
        info.ok_or_else(|| ToolError::BadOutput {
            tool: "ffprobe".to_string(),
            reason: "scripted failure".to_string(),
        })
    }

    async fn compose(&self, spec: &CompositionSpec, output: &Path) -> Result<PathBuf, ToolError> {
        self.record("compose");
        *lock(&self.last_spec) = Some(spec.clone());
        self.produce("compose", output, self.fail_compose).await
    }

    async fn mux(&self, _video: &Path, _audio: &Path, output: &Path) -> Result<PathBuf, ToolError> {
        self.record("mux");
        self.produce("mux", output, self.fail_mux).await
    }

    async fn fade(
        &self,
        _input: &Path,
        _fade_seconds: f64,
        _duration: f64,
        output: &Path,
    ) -> Result<PathBuf, ToolError> {
        self.record("fade");
        self.produce("fade", output, self.fail_fade).await
    }

    async fn encode_frames(
        &self,
        _frames: &[CapturedFrame],
        output: &Path,
    ) -> Result<PathBuf, ToolError> {
        self.record("encode");
        self.produce("encode", output, false).await
    }
}

/// 总是成功的语音服务，写出占位音频
#[derive(Debug, Default)]
pub struct FakeSpeech {
    requests: Mutex<Vec<(String, usize)>>,
}

impl FakeSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次请求的 (音色, 片段数)
    pub fn requests(&self) -> Vec<(String, usize)> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    fn is_available(&self) -> bool {
        true
    }

    async fn synthesize(
        &self,
        segments: &[NarrationSegment],
        voice: &str,
        output: &Path,
    ) -> Result<PathBuf, ToolError> {
        lock(&self.requests).push((voice.to_string(), segments.len()));
        touch(output, b"fake-wav")
            .await
            .map_err(|e| ToolError::spawn_failed("speech", e))?;
        Ok(output.to_path_buf())
    }
}
