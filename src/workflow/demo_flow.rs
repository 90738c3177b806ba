//! 演示处理流程 - 流程层
//!
//! 核心职责：定义"一个演示"的完整处理流程
//!
//! 流程顺序：
//! 1. 自动化执行 + 录制（会话失败 → Failed）
//! 2. 旁白生成（语音失败 → 只有文字稿）
//! 3. 视频增强（每步失败都退回上一步产物）

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::models::{ArtifactKind, DemoStatus, Demonstration, PersonaRegistry};
use crate::services::{ArtifactWriter, AutomationExecutor, NarrationComposer, VideoComposer};
use crate::workflow::demo_ctx::DemoCtx;

/// 演示处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoOutcome {
    /// 生成了最终视频（可能带警告）
    Completed,
    /// 演示失败
    Failed,
}

/// 演示处理流程
///
/// - 编排 执行 → 旁白 → 增强 三个阶段
/// - 推进演示状态，挂载各阶段产物
/// - 阶段内的失败降级为演示上的警告
pub struct DemoFlow {
    executor: AutomationExecutor,
    narration: NarrationComposer,
    composer: VideoComposer,
    writer: ArtifactWriter,
    personas: Arc<PersonaRegistry>,
}

impl DemoFlow {
    pub fn new(
        executor: AutomationExecutor,
        narration: NarrationComposer,
        composer: VideoComposer,
        writer: ArtifactWriter,
        personas: Arc<PersonaRegistry>,
    ) -> Self {
        Self {
            executor,
            narration,
            composer,
            writer,
            personas,
        }
    }

    pub async fn run(&self, demo: &mut Demonstration, ctx: &DemoCtx) -> DemoOutcome {
        info!("{} ▶️ {} ({})", ctx, demo.title, demo.id);
        if let Err(e) = demo.transition(DemoStatus::Running) {
            warn!("{} ⚠️ 跳过: {}", ctx, e);
            return outcome_of(demo);
        }

        // ========== 阶段 1: 执行并录制 ==========
        let report = match self.executor.execute(demo).await {
            Ok(report) => report,
            Err(e) => {
                error!("{} ❌ 会话建立失败: {}", ctx, e);
                self.record_warning(demo, format!("会话建立失败: {}", e)).await;
                return self.fail(demo, ctx);
            }
        };

        match self.writer.write_execution_log(&report).await {
            Ok(path) => self.attach(demo, ArtifactKind::ExecutionLog, path),
            Err(e) => {
                self.record_warning(demo, format!("执行日志写入失败: {}", e))
                    .await
            }
        }
        demo.add_screenshots(report.screenshots.iter().cloned());
        for message in &report.warnings {
            self.record_warning(demo, message.clone()).await;
        }
        for entry in report.log.iter().filter(|e| e.error.is_some()) {
            let reason = entry.error.as_deref().unwrap_or_default();
            self.record_warning(demo, format!("步骤 {} 失败: {}", entry.index, reason))
                .await;
        }

        let raw_capture = match report.video_path.filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                error!("{} ❌ 没有可用的原始录制", ctx);
                self.record_warning(demo, "没有可用的原始录制".to_string()).await;
                return self.fail(demo, ctx);
            }
        };
        self.attach(demo, ArtifactKind::Video, raw_capture.clone());
        self.advance(demo, DemoStatus::Captured);
        info!(
            "{} ✓ 录制完成: 成功 {}/{} 步",
            ctx, report.summary.success, report.summary.total
        );

        // ========== 阶段 2: 旁白 ==========
        let persona = self.personas.resolve(&demo.narration_style);
        let narration = self.narration.narrate(demo, &persona, &self.writer).await;
        if let Some(path) = narration.transcript_path.clone() {
            self.attach(demo, ArtifactKind::Transcript, path);
        }
        if let Some(path) = narration.subtitle_path.clone() {
            self.attach(demo, ArtifactKind::Subtitle, path);
        }
        if let Some(path) = narration.audio_path.clone() {
            self.attach(demo, ArtifactKind::Audio, path);
        }
        for message in narration.warnings {
            self.record_warning(demo, message).await;
        }

        // ========== 阶段 3: 增强 ==========
        let enhanced = self
            .composer
            .enhance(
                &raw_capture,
                narration.audio_path.as_deref(),
                demo,
                &narration.segments,
            )
            .await;
        for message in enhanced.warnings {
            self.record_warning(demo, message).await;
        }
        self.attach(demo, ArtifactKind::EnhancedVideo, enhanced.final_video_path.clone());
        if enhanced.duration_seconds > 0.0 {
            demo.duration_minutes = enhanced.duration_seconds / 60.0;
        }
        self.advance(demo, DemoStatus::Completed);

        info!(
            "{} ✅ 完成: {} ({} 个标注, {:.1}s, {} 条警告)",
            ctx,
            enhanced.final_video_path.display(),
            enhanced.annotation_count,
            enhanced.duration_seconds,
            demo.warnings().len()
        );
        outcome_of(demo)
    }

    fn fail(&self, demo: &mut Demonstration, ctx: &DemoCtx) -> DemoOutcome {
        if let Err(e) = demo.transition(DemoStatus::Failed) {
            error!("{} 无法标记为失败: {}", ctx, e);
        }
        DemoOutcome::Failed
    }

    fn advance(&self, demo: &mut Demonstration, next: DemoStatus) {
        if let Err(e) = demo.transition(next) {
            warn!("[{}] ⚠️ {}", demo.id, e);
        }
    }

    fn attach(&self, demo: &mut Demonstration, kind: ArtifactKind, path: std::path::PathBuf) {
        if let Err(e) = demo.attach(kind, path) {
            warn!("[{}] ⚠️ {}", demo.id, e);
        }
    }

    /// 警告记在演示上，同时追加到 warnings.txt
    async fn record_warning(&self, demo: &mut Demonstration, message: String) {
        if let Err(e) = self.writer.append_warning(&demo.id, &message).await {
            debug!("写入 warnings.txt 失败: {:#}", e);
        }
        demo.warn(message);
    }
}

fn outcome_of(demo: &Demonstration) -> DemoOutcome {
    if demo.status() == DemoStatus::Completed {
        DemoOutcome::Completed
    } else {
        DemoOutcome::Failed
    }
}
