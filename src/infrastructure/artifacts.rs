//! 产物目录布局
//!
//! `{root}/{videos,audio,transcripts,screenshots,enhanced}/{demo_id}.*`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// 产物目录布局
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.root.join("videos")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        self.root.join("transcripts")
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.root.join("screenshots")
    }

    pub fn enhanced_dir(&self) -> PathBuf {
        self.root.join("enhanced")
    }

    /// 录制帧的临时目录
    pub fn frames_dir(&self, demo_id: &str) -> PathBuf {
        self.videos_dir().join(format!("{}.frames", demo_id))
    }

    /// 原始录屏
    pub fn raw_video(&self, demo_id: &str) -> PathBuf {
        self.videos_dir().join(format!("{}.mp4", demo_id))
    }

    /// 执行日志
    pub fn execution_log(&self, demo_id: &str) -> PathBuf {
        self.videos_dir().join(format!("{}.log.json", demo_id))
    }

    pub fn audio(&self, demo_id: &str) -> PathBuf {
        self.audio_dir().join(format!("{}.wav", demo_id))
    }

    pub fn transcript(&self, demo_id: &str) -> PathBuf {
        self.transcripts_dir().join(format!("{}.json", demo_id))
    }

    pub fn subtitles(&self, demo_id: &str) -> PathBuf {
        self.transcripts_dir().join(format!("{}.srt", demo_id))
    }

    /// 步骤截图，`phase` 为 before / after / capture
    pub fn screenshot(&self, demo_id: &str, step_index: usize, phase: &str) -> PathBuf {
        self.screenshots_dir()
            .join(format!("{}_step{:02}_{}.png", demo_id, step_index, phase))
    }

    pub fn composition_spec(&self, demo_id: &str) -> PathBuf {
        self.enhanced_dir()
            .join(format!("{}.composition.json", demo_id))
    }

    /// 增强阶段的中间产物，`stage` 为 composed / narrated
    pub fn enhanced_stage(&self, demo_id: &str, stage: &str) -> PathBuf {
        self.enhanced_dir().join(format!("{}.{}.mp4", demo_id, stage))
    }

    pub fn final_video(&self, demo_id: &str) -> PathBuf {
        self.enhanced_dir().join(format!("{}.mp4", demo_id))
    }

    /// 创建所有目录
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.videos_dir(),
            self.audio_dir(),
            self.transcripts_dir(),
            self.screenshots_dir(),
            self.enhanced_dir(),
        ] {
            tokio::fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("无法创建目录: {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_layout() {
        let layout = ArtifactLayout::new("/out");
        assert_eq!(layout.raw_video("d1"), PathBuf::from("/out/videos/d1.mp4"));
        assert_eq!(layout.transcript("d1"), PathBuf::from("/out/transcripts/d1.json"));
        assert_eq!(
            layout.screenshot("d1", 3, "before"),
            PathBuf::from("/out/screenshots/d1_step03_before.png")
        );
        assert_eq!(layout.final_video("d1"), PathBuf::from("/out/enhanced/d1.mp4"));
    }

    #[tokio::test]
    async fn test_ensure_dirs_creates_everything() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();
        assert!(layout.enhanced_dir().is_dir());
        assert!(layout.screenshots_dir().is_dir());
    }
}
