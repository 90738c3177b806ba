//! 视频增强服务 - 业务能力层
//!
//! 探测 → 标注 → 合成 → 混入旁白 → 淡入淡出。
//! 每一步失败都退回上一步的产物，最终路径总是最后一个成功生成的文件。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EnhancementConfig;
use crate::infrastructure::MediaToolkit;
use crate::models::narration::narration_end;
use crate::models::{Demonstration, MediaInfo, NarrationSegment};
use crate::services::annotation_planner::plan_annotations;
use crate::services::artifact_writer::ArtifactWriter;
use crate::services::composition::build_composition;

/// 增强结果
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementOutcome {
    pub final_video_path: PathBuf,
    /// 实际渲染进最终视频的标注数（合成失败时为 0）
    pub annotation_count: usize,
    pub duration_seconds: f64,
    pub warnings: Vec<String>,
}

/// 视频增强服务
pub struct VideoComposer {
    toolkit: Arc<dyn MediaToolkit>,
    writer: ArtifactWriter,
    config: EnhancementConfig,
}

impl VideoComposer {
    pub fn new(
        toolkit: Arc<dyn MediaToolkit>,
        writer: ArtifactWriter,
        config: EnhancementConfig,
    ) -> Self {
        Self {
            toolkit,
            writer,
            config,
        }
    }

    /// 增强原始录制
    ///
    /// # 参数
    /// - `raw_capture`: 原始录制（必须存在）
    /// - `audio`: 旁白音频，没有时跳过混流
    /// - `segments`: 旁白片段，音频探测失败时用它的结束时间
    pub async fn enhance(
        &self,
        raw_capture: &Path,
        audio: Option<&Path>,
        demo: &Demonstration,
        segments: &[NarrationSegment],
    ) -> EnhancementOutcome {
        let mut warnings = Vec::new();
        let layout = self.writer.layout();

        let info = self.probe_or_default(raw_capture, &mut warnings).await;
        let mut current = raw_capture.to_path_buf();
        let mut duration = info.duration;
        let mut annotation_count = 0;

        // ========== 合成标注 ==========
        if self.config.annotations {
            let annotations = plan_annotations(demo, &info);
            let spec = build_composition(raw_capture, &info, &annotations, &self.config);
            if let Err(e) = self.writer.write_composition(&demo.id, &spec).await {
                warn!("⚠️ [{}] 合成描述写入失败: {:#}", demo.id, e);
                warnings.push(format!("合成描述写入失败: {}", e));
            }

            let composed = layout.enhanced_stage(&demo.id, "composed");
            match self.toolkit.compose(&spec, &composed).await {
                Ok(path) => {
                    info!("🎨 [{}] 已叠加 {} 个标注", demo.id, annotations.len());
                    annotation_count = annotations.len();
                    current = path;
                }
                Err(e) => {
                    warn!("⚠️ [{}] 合成失败，使用原始录制: {}", demo.id, e);
                    warnings.push(format!("合成失败，使用原始录制: {}", e));
                }
            }
        } else {
            debug!("[{}] 已关闭标注，跳过合成", demo.id);
        }

        // ========== 混入旁白 ==========
        if let Some(audio) = audio {
            let audio_duration = match self.toolkit.probe(audio).await {
                Ok(audio_info) if audio_info.duration > 0.0 => audio_info.duration,
                Ok(_) | Err(_) => {
                    debug!("[{}] 音频探测失败，使用旁白结束时间", demo.id);
                    narration_end(segments)
                }
            };
            let narrated = layout.enhanced_stage(&demo.id, "narrated");
            match self.toolkit.mux(&current, audio, &narrated).await {
                Ok(path) => {
                    duration = duration.min(audio_duration);
                    info!("🔊 [{}] 已混入旁白 (时长 {:.1}s)", demo.id, duration);
                    current = path;
                }
                Err(e) => {
                    warn!("⚠️ [{}] 混流失败，保留无声视频: {}", demo.id, e);
                    warnings.push(format!("混流失败: {}", e));
                }
            }
        }

        // ========== 淡入淡出 ==========
        if self.config.fade_seconds > 0.0 {
            let faded = layout.final_video(&demo.id);
            match self
                .toolkit
                .fade(&current, self.config.fade_seconds, duration, &faded)
                .await
            {
                Ok(path) => current = path,
                Err(e) => {
                    warn!("⚠️ [{}] 淡入淡出失败，保留上一步产物: {}", demo.id, e);
                    warnings.push(format!("淡入淡出失败: {}", e));
                }
            }
        }

        EnhancementOutcome {
            final_video_path: current,
            annotation_count,
            duration_seconds: duration,
            warnings,
        }
    }

    async fn probe_or_default(&self, raw: &Path, warnings: &mut Vec<String>) -> MediaInfo {
        match self.toolkit.probe(raw).await {
            Ok(info) if info.duration > 0.0 && info.width > 0 && info.height > 0 => {
                let fps = if info.fps > 0.0 {
                    info.fps
                } else {
                    self.config.fallback_fps
                };
                MediaInfo { fps, ..info }
            }
            Ok(info) => {
                warn!("⚠️ 探测结果不完整 {:?}，使用默认参数", info);
                warnings.push("探测结果不完整，使用默认参数".to_string());
                self.fallback_info()
            }
            Err(e) => {
                warn!("⚠️ 探测失败，使用默认参数: {}", e);
                warnings.push(format!("探测失败，使用默认参数: {}", e));
                self.fallback_info()
            }
        }
    }

    fn fallback_info(&self) -> MediaInfo {
        MediaInfo {
            duration: self.config.fallback_duration,
            width: self.config.fallback_width,
            height: self.config.fallback_height,
            fps: self.config.fallback_fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::fakes::FakeMediaToolkit;
    use crate::infrastructure::ArtifactLayout;
    use crate::models::{Category, DemoTemplate, StepTemplate};

    fn demo() -> Demonstration {
        let template = DemoTemplate::new(
            "compose",
            Category::DataScience,
            "datasets",
            "https://example.com",
            vec![
                StepTemplate::new("navigate", "https://example.com", "Open"),
                StepTemplate::new("click", "#go", "Go").highlighted(),
            ],
        );
        Demonstration::from_template("demo-v", "DS201", &template).unwrap()
    }

    async fn setup(toolkit: FakeMediaToolkit) -> (tempfile::TempDir, Arc<FakeMediaToolkit>, VideoComposer, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let raw = layout.raw_video("demo-v");
        tokio::fs::create_dir_all(raw.parent().unwrap()).await.unwrap();
        tokio::fs::write(&raw, b"raw").await.unwrap();
        let toolkit = Arc::new(toolkit);
        let composer = VideoComposer::new(
            toolkit.clone(),
            ArtifactWriter::new(layout),
            EnhancementConfig::default(),
        );
        (dir, toolkit, composer, raw)
    }

    #[tokio::test]
    async fn test_full_chain_produces_final_video() {
        let (dir, toolkit, composer, raw) =
            setup(FakeMediaToolkit::new().with_audio_duration(20.0)).await;
        let audio = dir.path().join("audio/demo-v.wav");

        let outcome = composer.enhance(&raw, Some(&audio), &demo(), &[]).await;

        assert_eq!(outcome.final_video_path, dir.path().join("enhanced/demo-v.mp4"));
        assert!(outcome.final_video_path.exists());
        // 原始 30s，音频 20s
        assert_eq!(outcome.duration_seconds, 20.0);
        // 2 个编号 + 1 高亮 + 1 说明 + 进度条 + 头像
        assert_eq!(outcome.annotation_count, 6);
        assert!(outcome.warnings.is_empty());
        assert_eq!(toolkit.operations(), vec!["probe", "compose", "probe", "mux", "fade"]);
        assert!(dir.path().join("enhanced/demo-v.composition.json").exists());
    }

    #[tokio::test]
    async fn test_compose_failure_falls_back_to_raw() {
        let (_dir, _toolkit, composer, raw) =
            setup(FakeMediaToolkit::new().failing_compose().failing_fade()).await;

        let outcome = composer.enhance(&raw, None, &demo(), &[]).await;

        assert_eq!(outcome.final_video_path, raw);
        assert!(outcome.final_video_path.exists());
        assert_eq!(outcome.annotation_count, 0);
        assert_eq!(outcome.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_uses_defaults() {
        let (_dir, toolkit, composer, raw) =
            setup(FakeMediaToolkit::new().with_video_info(None)).await;

        let outcome = composer.enhance(&raw, None, &demo(), &[]).await;

        assert_eq!(outcome.duration_seconds, 60.0);
        let spec = toolkit.last_spec().unwrap();
        assert_eq!((spec.width, spec.height), (1920, 1080));
        assert!(spec.layers.iter().all(|layer| match layer {
            crate::models::Layer::Overlay { window, .. } => window.within(60.0),
            _ => true,
        }));
    }

    #[tokio::test]
    async fn test_audio_probe_failure_uses_narration_end() {
        // 默认的假工具探测不到音频时长
        let (dir, _toolkit, composer, raw) = setup(FakeMediaToolkit::new()).await;
        let audio = dir.path().join("audio/demo-v.wav");
        let segment = |id: &str, start_time: f64, context| NarrationSegment {
            id: id.to_string(),
            text: "Open the page".to_string(),
            start_time,
            duration: 4.0,
            emotion: crate::models::Emotion::Instructional,
            emphasis_spans: Vec::new(),
            persona_ref: "mentor".to_string(),
            context,
        };
        let segments = vec![
            segment("demo-v-intro", 0.0, crate::models::SegmentContext::Intro),
            segment("demo-v-outro", 4.5, crate::models::SegmentContext::Conclusion),
        ];

        let outcome = composer.enhance(&raw, Some(&audio), &demo(), &segments).await;

        // 旁白 8.5s，早于 30s 的视频结束
        assert_eq!(outcome.duration_seconds, narration_end(&segments));
        assert_eq!(outcome.duration_seconds, 8.5);
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_mux_failure_keeps_composed_video() {
        let (dir, _toolkit, composer, raw) = setup(
            FakeMediaToolkit::new()
                .with_audio_duration(10.0)
                .failing_mux()
                .failing_fade(),
        )
        .await;
        let audio = dir.path().join("audio/demo-v.wav");

        let outcome = composer.enhance(&raw, Some(&audio), &demo(), &[]).await;

        assert_eq!(
            outcome.final_video_path,
            dir.path().join("enhanced/demo-v.composed.mp4")
        );
        assert_eq!(outcome.duration_seconds, 30.0);
    }
}
