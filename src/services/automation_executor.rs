//! 自动化执行服务 - 业务能力层
//!
//! 只负责"把一个演示的步骤在页面上跑一遍并录下来"，不关心旁白和后期

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::AutomationConfig;
use crate::error::{SessionError, StepError};
use crate::infrastructure::{ArtifactLayout, AutomationDriver};
use crate::models::{DemoStep, Demonstration, StepAction};

/// 单步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Success,
    Failed,
}

/// 单步执行日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// 步骤序号（从1开始）
    pub index: usize,
    pub step_id: String,
    pub action: String,
    pub status: StepStatus,
    pub error: Option<String>,
    /// 相对录制开始的偏移（秒）
    pub offset_seconds: f64,
    pub elapsed_ms: u64,
    pub screenshots: Vec<PathBuf>,
}

/// 执行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

/// 一次完整执行的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub demo_id: String,
    pub started_at: DateTime<Utc>,
    /// 录制视频；编码失败时为空
    pub video_path: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
    pub log: Vec<StepLogEntry>,
    pub summary: ExecutionSummary,
    /// 不影响步骤结果的问题（截图、录制编码）
    pub warnings: Vec<String>,
}

/// 自动化执行服务
///
/// 职责：
/// - 按顺序执行步骤，每一步的失败单独记录
/// - 只有会话无法建立才算整个演示失败
/// - 不修改 Demonstration，结果通过 ExecutionReport 返回
pub struct AutomationExecutor {
    driver: Arc<dyn AutomationDriver>,
    layout: ArtifactLayout,
    config: AutomationConfig,
}

impl AutomationExecutor {
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        layout: ArtifactLayout,
        config: AutomationConfig,
    ) -> Self {
        Self {
            driver,
            layout,
            config,
        }
    }

    /// 执行演示的全部步骤
    ///
    /// # 返回
    /// 会话建立失败时返回 SessionError，否则总是返回报告（即使所有步骤都失败）
    pub async fn execute(&self, demo: &Demonstration) -> Result<ExecutionReport, SessionError> {
        let started_at = Utc::now();
        let frames_dir = self.layout.frames_dir(&demo.id);

        info!(
            "🎬 [{}] 开始执行 {} 个步骤 (驱动: {})",
            demo.id,
            demo.steps().len(),
            self.driver.name()
        );
        self.driver.begin_session(&demo.id, &frames_dir).await?;
        let clock = Instant::now();

        let mut log = Vec::with_capacity(demo.steps().len());
        let mut warnings = Vec::new();
        for (i, step) in demo.steps().iter().enumerate() {
            let entry = self
                .run_step(&demo.id, i + 1, step, clock, &mut warnings)
                .await;
            log.push(entry);
        }

        let video_path = match self.driver.end_session(&self.layout.raw_video(&demo.id)).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("⚠️ [{}] 录制视频生成失败: {}", demo.id, e);
                warnings.push(format!("录制视频生成失败: {}", e));
                None
            }
        };

        let summary = summarize(&log);
        info!(
            "✓ [{}] 执行完成: 成功 {}/{}，失败 {}",
            demo.id, summary.success, summary.total, summary.failed
        );

        Ok(ExecutionReport {
            demo_id: demo.id.clone(),
            started_at,
            video_path,
            screenshots: log.iter().flat_map(|e| e.screenshots.clone()).collect(),
            log,
            summary,
            warnings,
        })
    }

    async fn run_step(
        &self,
        demo_id: &str,
        index: usize,
        step: &DemoStep,
        clock: Instant,
        warnings: &mut Vec<String>,
    ) -> StepLogEntry {
        let offset_seconds = clock.elapsed().as_secs_f64();
        let step_started = Instant::now();
        let mut screenshots = Vec::new();
        debug!("[{}] 步骤 {} ({}): {}", demo_id, index, step.action.kind(), step.description);

        if step.screenshot_timing.before() {
            self.capture(demo_id, index, "before", &mut screenshots, warnings)
                .await;
        }

        let mut outcome = self.apply_highlight(step).await;
        if outcome.is_ok() {
            outcome = self.dispatch(demo_id, index, step, &mut screenshots).await;
        }

        if self.config.honor_step_durations && step.duration_seconds > 0.0 {
            sleep(Duration::from_secs_f64(step.duration_seconds)).await;
        }

        if step.screenshot_timing.after() {
            self.capture(demo_id, index, "after", &mut screenshots, warnings)
                .await;
        }

        let (status, error) = match outcome {
            Ok(()) => (StepStatus::Success, None),
            Err(e) => {
                warn!("⚠️ [{}] 步骤 {} 失败: {}", demo_id, index, e);
                (StepStatus::Failed, Some(e.to_string()))
            }
        };

        StepLogEntry {
            index,
            step_id: step.id.clone(),
            action: step.action.kind().to_string(),
            status,
            error,
            offset_seconds,
            elapsed_ms: step_started.elapsed().as_millis() as u64,
            screenshots,
        }
    }

    /// 高亮 → 停留 → 取消高亮
    ///
    /// 高亮失败时仍会尝试取消，失败结果作为该步骤的错误
    async fn apply_highlight(&self, step: &DemoStep) -> Result<(), StepError> {
        let Some(selector) = step.action.selector().filter(|_| step.highlight) else {
            return Ok(());
        };

        let applied = self.driver.set_highlight(selector, true).await;
        if applied.is_ok() && !self.config.highlight_hold.is_zero() {
            sleep(self.config.highlight_hold).await;
        }
        if let Err(e) = self.driver.set_highlight(selector, false).await {
            debug!("取消高亮失败 ({}): {}", selector, e);
        }
        applied
    }

    async fn dispatch(
        &self,
        demo_id: &str,
        index: usize,
        step: &DemoStep,
        screenshots: &mut Vec<PathBuf>,
    ) -> Result<(), StepError> {
        let driver = &self.driver;
        match &step.action {
            StepAction::Navigate { url } => {
                driver.navigate(url, self.config.navigate_timeout).await
            }
            StepAction::Click { selector } => {
                driver.click(selector).await?;
                pause(self.config.post_click_delay).await;
                Ok(())
            }
            StepAction::Type { selector, text } => driver.fill(selector, text).await,
            StepAction::Select { selector, value } => driver.select_option(selector, value).await,
            StepAction::Hover { selector } => {
                driver.hover(selector).await?;
                pause(self.config.hover_dwell).await;
                Ok(())
            }
            StepAction::Scroll { delta_y } => driver.scroll_by(*delta_y).await,
            StepAction::Wait { seconds } => {
                if self.config.honor_step_durations {
                    pause(Duration::from_secs_f64(seconds.max(0.0))).await;
                }
                Ok(())
            }
            StepAction::WaitForElement { selector } => {
                driver
                    .wait_for_selector(selector, self.config.element_timeout, self.config.poll_interval)
                    .await
            }
            StepAction::Screenshot => {
                let path = self.layout.screenshot(demo_id, index, "capture");
                driver.screenshot(&path).await?;
                screenshots.push(path);
                Ok(())
            }
        }
    }

    /// 前后截图失败不影响步骤结果，只记警告
    async fn capture(
        &self,
        demo_id: &str,
        index: usize,
        phase: &str,
        screenshots: &mut Vec<PathBuf>,
        warnings: &mut Vec<String>,
    ) {
        let path = self.layout.screenshot(demo_id, index, phase);
        match self.driver.screenshot(&path).await {
            Ok(()) => screenshots.push(path),
            Err(e) => {
                warn!("⚠️ [{}] 步骤 {} 截图失败: {}", demo_id, index, e);
                warnings.push(format!("步骤 {} {} 截图失败: {}", index, phase, e));
            }
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

fn summarize(log: &[StepLogEntry]) -> ExecutionSummary {
    let success = log
        .iter()
        .filter(|e| e.status == StepStatus::Success)
        .count();
    ExecutionSummary {
        total: log.len(),
        success,
        failed: log.len() - success,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fakes::ScriptedDriver;
    use crate::models::{Category, DemoTemplate, ScreenshotTiming, StepTemplate};

    fn demo_with(steps: Vec<StepTemplate>) -> Demonstration {
        let template = DemoTemplate::new(
            "unit-demo",
            Category::Programming,
            "testing",
            "https://example.com",
            steps,
        );
        Demonstration::from_template("demo-unit", "CS101", &template).unwrap()
    }

    fn executor(driver: Arc<ScriptedDriver>, root: &std::path::Path) -> AutomationExecutor {
        AutomationExecutor::new(driver, ArtifactLayout::new(root), AutomationConfig::instant())
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_execution() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(ScriptedDriver::new().with_missing("#missing"));
        let demo = demo_with(vec![
            StepTemplate::new("navigate", "https://example.com", "open"),
            StepTemplate::new("click", "#missing", "press").highlighted(),
            StepTemplate::new("wait", "", "pause").with_meta("seconds", "2"),
        ]);

        let report = executor(driver.clone(), dir.path()).execute(&demo).await.unwrap();

        let statuses: Vec<_> = report.log.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![StepStatus::Success, StepStatus::Failed, StepStatus::Success]
        );
        assert_eq!(report.summary, ExecutionSummary { total: 3, success: 2, failed: 1 });
        assert!(report.log[1].error.as_deref().unwrap().contains("#missing"));
        assert!(report.video_path.is_some());
        // 高亮失败后也尝试了取消
        assert!(driver.calls().contains(&"highlight:#missing=false".to_string()));
        assert!(driver.active_highlights().is_empty());
    }

    #[tokio::test]
    async fn test_session_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(ScriptedDriver::new().failing_all_sessions());
        let demo = demo_with(vec![StepTemplate::new("scroll", "", "down")]);

        let err = executor(driver.clone(), dir.path()).execute(&demo).await.unwrap_err();
        assert!(matches!(err, SessionError::RecordingFailed { .. }));
        assert_eq!(driver.calls(), vec!["begin:demo-unit"]);
    }

    #[tokio::test]
    async fn test_screenshots_follow_timing() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(ScriptedDriver::new());
        let demo = demo_with(vec![
            StepTemplate::new("hover", "#menu", "hover").with_screenshot(ScreenshotTiming::Both),
            StepTemplate::new("screenshot", "", "snap").with_screenshot(ScreenshotTiming::None),
        ]);

        let report = executor(driver, dir.path()).execute(&demo).await.unwrap();
        assert_eq!(report.log[0].screenshots.len(), 2);
        assert_eq!(report.log[1].screenshots.len(), 1);
        assert_eq!(report.screenshots.len(), 3);
        assert!(report.screenshots.iter().all(|p| p.exists()));
    }
}
