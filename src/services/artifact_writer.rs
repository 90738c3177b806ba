//! 产物写入服务 - 业务能力层
//!
//! 只负责把执行日志、文字稿、字幕、合成描述和警告写到产物目录

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::infrastructure::ArtifactLayout;
use crate::models::{CompositionSpec, NarrationSegment};
use crate::services::automation_executor::ExecutionReport;

/// 警告汇总文件名（位于产物根目录）
const WARNINGS_FILE: &str = "warnings.txt";

/// 产物写入服务
///
/// 职责：
/// - 决定每种产物的序列化格式
/// - 路径统一由 ArtifactLayout 给出
/// - 不关心流程顺序
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    layout: ArtifactLayout,
}

impl ArtifactWriter {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// 写入执行日志 `videos/{id}.log.json`
    pub async fn write_execution_log(&self, report: &ExecutionReport) -> Result<PathBuf> {
        let path = self.layout.execution_log(&report.demo_id);
        write_json(&path, report).await?;
        Ok(path)
    }

    /// 写入文字稿 `transcripts/{id}.json`
    pub async fn write_transcript(
        &self,
        demo_id: &str,
        segments: &[NarrationSegment],
    ) -> Result<PathBuf> {
        let path = self.layout.transcript(demo_id);
        write_json(&path, &segments).await?;
        Ok(path)
    }

    /// 写入字幕 `transcripts/{id}.srt`
    pub async fn write_subtitles(
        &self,
        demo_id: &str,
        segments: &[NarrationSegment],
    ) -> Result<PathBuf> {
        let path = self.layout.subtitles(demo_id);
        write_text(&path, &render_srt(segments)).await?;
        Ok(path)
    }

    /// 写入合成描述 `enhanced/{id}.composition.json`
    pub async fn write_composition(&self, demo_id: &str, spec: &CompositionSpec) -> Result<PathBuf> {
        let path = self.layout.composition_spec(demo_id);
        write_json(&path, spec).await?;
        Ok(path)
    }

    /// 追加一条警告到 warnings.txt
    pub async fn append_warning(&self, demo_id: &str, message: &str) -> Result<()> {
        let path = self.layout.root().join(WARNINGS_FILE);
        debug!("写入警告: 演示 {} | {}", demo_id, message);

        ensure_parent(&path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("无法打开警告文件: {}", path.display()))?;
        let line = format!("演示 {} | {}\n", demo_id, message);
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("无法创建目录: {}", parent.display()))?;
    }
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_text(path, &json).await
}

async fn write_text(path: &Path, contents: &str) -> Result<()> {
    ensure_parent(path).await?;
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("写入文件失败: {}", path.display()))
}

/// 渲染 SRT 字幕
pub fn render_srt(segments: &[NarrationSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(segment.start_time),
            srt_timestamp(segment.end_time()),
            segment.text
        );
    }
    out
}

/// `HH:MM:SS,mmm`
fn srt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let (hours, rest) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (minutes, rest) = (rest / 60_000, rest % 60_000);
    let (secs, millis) = (rest / 1000, rest % 1000);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Emotion, SegmentContext};

    fn segment(id: &str, text: &str, start: f64, duration: f64) -> NarrationSegment {
        NarrationSegment {
            id: id.to_string(),
            text: text.to_string(),
            start_time: start,
            duration,
            emotion: Emotion::Calm,
            emphasis_spans: Vec::new(),
            persona_ref: "mentor".to_string(),
            context: SegmentContext::Intro,
        }
    }

    #[test]
    fn test_srt_timestamp_format() {
        assert_eq!(srt_timestamp(0.0), "00:00:00,000");
        assert_eq!(srt_timestamp(3725.25), "01:02:05,250");
    }

    #[test]
    fn test_render_srt_numbers_cues() {
        let srt = render_srt(&[segment("a", "Hello", 0.0, 1.5), segment("b", "Bye", 2.0, 1.0)]);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,500\nHello\n\n2\n00:00:02,000 --> 00:00:03,000\nBye\n\n"
        );
    }

    #[tokio::test]
    async fn test_append_warning_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(ArtifactLayout::new(dir.path()));
        writer.append_warning("d1", "first").await.unwrap();
        writer.append_warning("d2", "second").await.unwrap();
        let text = std::fs::read_to_string(dir.path().join(WARNINGS_FILE)).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("演示 d2 | second"));
    }
}
