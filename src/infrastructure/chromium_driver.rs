//! 基于 chromiumoxide 的自动化驱动
//!
//! 通过 [`JsExecutor`] 操作唯一的页面；录制由 [`FrameRecorder`] 在会话期间抓帧，
//! 结束时交给 [`MediaToolkit`] 编码。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::ScreenshotParams;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

use crate::error::{SessionError, StepError, ToolError};
use crate::infrastructure::automation::AutomationDriver;
use crate::infrastructure::js_executor::JsExecutor;
use crate::infrastructure::media::MediaToolkit;
use crate::infrastructure::recorder::FrameRecorder;

/// 网络空闲检测的轮询间隔
const SETTLE_POLL: Duration = Duration::from_millis(100);

/// Chromium 驱动
pub struct ChromiumDriver {
    executor: JsExecutor,
    toolkit: Arc<dyn MediaToolkit>,
    frame_interval: Duration,
    recorder: Mutex<Option<FrameRecorder>>,
}

impl ChromiumDriver {
    pub fn new(executor: JsExecutor, toolkit: Arc<dyn MediaToolkit>, frame_interval: Duration) -> Self {
        Self {
            executor,
            toolkit,
            frame_interval,
            recorder: Mutex::new(None),
        }
    }

    /// 查找元素，找不到时返回 ElementNotFound
    async fn element(&self, selector: &str) -> Result<chromiumoxide::Element, StepError> {
        self.executor
            .find(selector)
            .await
            .map_err(|_| StepError::ElementNotFound {
                selector: selector.to_string(),
            })
    }

    /// 执行返回 bool 的脚本，false 视为元素不存在
    async fn eval_on_selector(&self, action: &str, selector: &str, js_code: String) -> Result<(), StepError> {
        let found = self
            .executor
            .eval_as::<bool>(js_code)
            .await
            .map_err(|e| StepError::action_failed(action, e))?;
        if found {
            Ok(())
        } else {
            Err(StepError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }

    /// 等待 document.readyState 变为 complete
    async fn wait_for_settle(&self) -> Result<(), StepError> {
        loop {
            let state = self
                .executor
                .eval_as::<String>("document.readyState")
                .await
                .map_err(|e| StepError::action_failed("navigate", e))?;
            if state == "complete" {
                return Ok(());
            }
            sleep(SETTLE_POLL).await;
        }
    }
}

fn js_string(value: &str) -> Result<String, StepError> {
    serde_json::to_string(value).map_err(|e| StepError::action_failed("encode", e))
}

#[async_trait]
impl AutomationDriver for ChromiumDriver {
    async fn begin_session(&self, demo_id: &str, frames_dir: &Path) -> Result<(), SessionError> {
        let recording_failed = |reason: String| SessionError::RecordingFailed {
            demo_id: demo_id.to_string(),
            reason,
        };

        // 页面必须可用，否则整个演示无法进行
        self.executor
            .eval("document.readyState")
            .await
            .map_err(|e| recording_failed(e.to_string()))?;
        tokio::fs::create_dir_all(frames_dir)
            .await
            .map_err(|e| recording_failed(e.to_string()))?;

        let mut slot = self.recorder.lock().await;
        if let Some(stale) = slot.take() {
            debug!("丢弃上一次未结束的录制");
            stale.stop().await;
        }
        *slot = Some(FrameRecorder::start(
            self.executor.page().clone(),
            frames_dir.to_path_buf(),
            self.frame_interval,
        ));
        info!("🎬 [{}] 开始录制", demo_id);
        Ok(())
    }

    async fn end_session(&self, output: &Path) -> Result<PathBuf, ToolError> {
        let recorder = self.recorder.lock().await.take();
        let Some(recorder) = recorder else {
            return Err(ToolError::BadOutput {
                tool: "recorder".to_string(),
                reason: "没有正在进行的录制".to_string(),
            });
        };
        let frames = recorder.stop().await;
        info!("🎞️ 录制结束，共 {} 帧，开始编码", frames.len());
        self.toolkit.encode_frames(&frames, output).await
    }

    async fn navigate(&self, url: &str, limit: Duration) -> Result<(), StepError> {
        let work = async {
            self.executor
                .page()
                .goto(url)
                .await
                .map_err(|e| StepError::action_failed("navigate", e))?;
            self.wait_for_settle().await
        };
        match timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(StepError::Timeout {
                action: "navigate".to_string(),
                target: url.to_string(),
                timeout_secs: limit.as_secs_f64(),
            }),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), StepError> {
        let element = self.element(selector).await?;
        element
            .click()
            .await
            .map_err(|e| StepError::action_failed("click", e))?;
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), StepError> {
        let clear = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.focus();
                if ('value' in el) el.value = '';
                return true;
            }})()
            "#,
            js_string(selector)?
        );
        self.eval_on_selector("type", selector, clear).await?;
        let element = self.element(selector).await?;
        element
            .type_str(text)
            .await
            .map_err(|e| StepError::action_failed("type", e))?;
        Ok(())
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), StepError> {
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.value = {};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()
            "#,
            js_string(selector)?,
            js_string(value)?
        );
        self.eval_on_selector("select", selector, js_code).await
    }

    async fn hover(&self, selector: &str) -> Result<(), StepError> {
        let element = self.element(selector).await?;
        element
            .hover()
            .await
            .map_err(|e| StepError::action_failed("hover", e))?;
        Ok(())
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<(), StepError> {
        let js_code = format!(
            "(() => {{ window.scrollBy({{ top: {}, behavior: 'smooth' }}); return true; }})()",
            delta_y
        );
        self.executor
            .eval(js_code)
            .await
            .map_err(|e| StepError::action_failed("scroll", e))?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        limit: Duration,
        poll: Duration,
    ) -> Result<(), StepError> {
        let deadline = Instant::now() + limit;
        loop {
            if let Ok(true) = self.executor.exists(selector).await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(StepError::Timeout {
                    action: "wait_for_element".to_string(),
                    target: selector.to_string(),
                    timeout_secs: limit.as_secs_f64(),
                });
            }
            sleep(poll).await;
        }
    }

    async fn screenshot(&self, path: &Path) -> Result<(), StepError> {
        let shot_failed = |reason: String| StepError::ScreenshotFailed {
            path: path.display().to_string(),
            reason,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| shot_failed(e.to_string()))?;
        }
        self.executor
            .page()
            .save_screenshot(ScreenshotParams::builder().build(), path)
            .await
            .map_err(|e| shot_failed(e.to_string()))?;
        Ok(())
    }

    async fn set_highlight(&self, selector: &str, enabled: bool) -> Result<(), StepError> {
        let js_code = if enabled {
            format!(
                r#"
                (() => {{
                    const el = document.querySelector({});
                    if (!el) return false;
                    el.dataset.demoOutline = el.style.outline || '';
                    el.style.outline = '4px solid #ffcc00';
                    el.style.outlineOffset = '2px';
                    el.scrollIntoView({{ block: 'center', behavior: 'smooth' }});
                    return true;
                }})()
                "#,
                js_string(selector)?
            )
        } else {
            format!(
                r#"
                (() => {{
                    const el = document.querySelector({});
                    if (!el) return false;
                    el.style.outline = el.dataset.demoOutline || '';
                    el.style.outlineOffset = '';
                    delete el.dataset.demoOutline;
                    return true;
                }})()
                "#,
                js_string(selector)?
            )
        };
        self.eval_on_selector("highlight", selector, js_code).await
    }

    fn name(&self) -> &str {
        "chromium"
    }
}
