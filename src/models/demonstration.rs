//! 演示（一次录制 + 讲解的网页操作流程）

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::catalog::DemoTemplate;
use crate::models::step::{DemoStep, StepDefaults};

/// 演示状态，只能向前迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemoStatus {
    Created,
    Running,
    Captured,
    Completed,
    Failed,
}

impl DemoStatus {
    fn rank(self) -> u8 {
        match self {
            DemoStatus::Created => 0,
            DemoStatus::Running => 1,
            DemoStatus::Captured => 2,
            DemoStatus::Completed | DemoStatus::Failed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DemoStatus::Completed | DemoStatus::Failed)
    }

    pub fn name(self) -> &'static str {
        match self {
            DemoStatus::Created => "created",
            DemoStatus::Running => "running",
            DemoStatus::Captured => "captured",
            DemoStatus::Completed => "completed",
            DemoStatus::Failed => "failed",
        }
    }

    /// 是否允许从 self 迁移到 next
    pub fn can_transition_to(self, next: DemoStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            DemoStatus::Failed => true,
            DemoStatus::Completed => self == DemoStatus::Captured,
            _ => next.rank() == self.rank() + 1,
        }
    }
}

impl std::fmt::Display for DemoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 演示类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DemoType {
    #[default]
    Walkthrough,
    Tutorial,
    Showcase,
}

/// 各阶段产生的产物路径，只追加、不覆盖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoArtifacts {
    pub video_path: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
    pub execution_log_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub transcript_path: Option<PathBuf>,
    pub subtitle_path: Option<PathBuf>,
    pub enhanced_video_path: Option<PathBuf>,
}

/// 产物种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Video,
    ExecutionLog,
    Audio,
    Transcript,
    Subtitle,
    EnhancedVideo,
}

impl ArtifactKind {
    fn name(self) -> &'static str {
        match self {
            ArtifactKind::Video => "video",
            ArtifactKind::ExecutionLog => "execution_log",
            ArtifactKind::Audio => "audio",
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Subtitle => "subtitle",
            ArtifactKind::EnhancedVideo => "enhanced_video",
        }
    }
}

impl DemoArtifacts {
    fn slot(&mut self, kind: ArtifactKind) -> &mut Option<PathBuf> {
        match kind {
            ArtifactKind::Video => &mut self.video_path,
            ArtifactKind::ExecutionLog => &mut self.execution_log_path,
            ArtifactKind::Audio => &mut self.audio_path,
            ArtifactKind::Transcript => &mut self.transcript_path,
            ArtifactKind::Subtitle => &mut self.subtitle_path,
            ArtifactKind::EnhancedVideo => &mut self.enhanced_video_path,
        }
    }
}

/// 演示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demonstration {
    pub id: String,
    pub title: String,
    pub description: String,
    pub course_ref: String,
    pub topic: String,
    pub demo_type: DemoType,
    /// 讲解人设ID
    pub narration_style: String,
    pub target_url: String,
    /// 时长（分钟）：创建时为模板估计值，增强完成后为成片实际时长
    pub duration_minutes: f64,
    /// 来源模板
    pub template_key: String,
    pub archived: bool,
    steps: Vec<DemoStep>,
    status: DemoStatus,
    artifacts: DemoArtifacts,
    warnings: Vec<String>,
}

impl Demonstration {
    /// 从模板创建演示
    ///
    /// 所有步骤在这里被校验，任何一步非法都会拒绝整个模板。
    pub fn from_template(
        id: impl Into<String>,
        course_ref: &str,
        template: &DemoTemplate,
    ) -> Result<Self, ValidationError> {
        Self::from_template_with(id, course_ref, template, &StepDefaults::default())
    }

    /// 同 [`Demonstration::from_template`]，缺省的滚动距离和等待时长取自 `defaults`
    pub fn from_template_with(
        id: impl Into<String>,
        course_ref: &str,
        template: &DemoTemplate,
        defaults: &StepDefaults,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if template.steps.is_empty() {
            return Err(ValidationError::EmptyTemplate {
                template: template.key.clone(),
            });
        }
        let steps = template
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| DemoStep::from_template(&id, i + 1, step, defaults))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            title: template.title.clone(),
            description: template.description.clone(),
            course_ref: course_ref.to_string(),
            topic: template.topic.clone(),
            demo_type: template.demo_type,
            narration_style: template.narration_style.clone(),
            target_url: template.target_url.clone(),
            duration_minutes: template.estimated_duration_minutes,
            template_key: template.key.clone(),
            archived: false,
            steps,
            status: DemoStatus::Created,
            artifacts: DemoArtifacts::default(),
            warnings: Vec::new(),
        })
    }

    /// 步骤（顺序固定）
    pub fn steps(&self) -> &[DemoStep] {
        &self.steps
    }

    pub fn status(&self) -> DemoStatus {
        self.status
    }

    pub fn artifacts(&self) -> &DemoArtifacts {
        &self.artifacts
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 状态迁移（只能向前）
    pub fn transition(&mut self, next: DemoStatus) -> Result<(), ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::IllegalTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// 挂载产物，已存在的产物不允许覆盖
    pub fn attach(&mut self, kind: ArtifactKind, path: PathBuf) -> Result<(), ValidationError> {
        let slot = self.artifacts.slot(kind);
        if let Some(existing) = slot {
            return Err(ValidationError::ArtifactAlreadyAttached {
                artifact: kind.name().to_string(),
                existing: existing.display().to_string(),
            });
        }
        *slot = Some(path);
        Ok(())
    }

    pub fn add_screenshots(&mut self, shots: impl IntoIterator<Item = PathBuf>) {
        self.artifacts.screenshots.extend(shots);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::DemoTemplate;
    use crate::models::category::Category;
    use crate::models::step::StepTemplate;

    fn template() -> DemoTemplate {
        DemoTemplate::new(
            "t1",
            Category::DataScience,
            "Explore a dataset",
            "https://example.com",
            vec![
                StepTemplate::new("navigate", "https://example.com", "Open the site"),
                StepTemplate::new("click", "#load", "Load the data").highlighted(),
            ],
        )
    }

    #[test]
    fn test_status_moves_forward_only() {
        let mut demo = Demonstration::from_template("d1", "AI501", &template()).unwrap();
        assert!(demo.transition(DemoStatus::Captured).is_err());
        demo.transition(DemoStatus::Running).unwrap();
        demo.transition(DemoStatus::Captured).unwrap();
        assert!(demo.transition(DemoStatus::Running).is_err());
        demo.transition(DemoStatus::Completed).unwrap();
        assert!(demo.transition(DemoStatus::Failed).is_err());
    }

    #[test]
    fn test_failed_is_reachable_from_running() {
        let mut demo = Demonstration::from_template("d1", "AI501", &template()).unwrap();
        demo.transition(DemoStatus::Running).unwrap();
        demo.transition(DemoStatus::Failed).unwrap();
        assert_eq!(demo.status(), DemoStatus::Failed);
    }

    #[test]
    fn test_artifacts_are_never_overwritten() {
        let mut demo = Demonstration::from_template("d1", "AI501", &template()).unwrap();
        demo.attach(ArtifactKind::Video, PathBuf::from("a.mp4")).unwrap();
        let err = demo
            .attach(ArtifactKind::Video, PathBuf::from("b.mp4"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::ArtifactAlreadyAttached { .. }));
        assert_eq!(demo.artifacts().video_path, Some(PathBuf::from("a.mp4")));
    }

    #[test]
    fn test_empty_template_is_rejected() {
        let mut t = template();
        t.steps.clear();
        assert!(matches!(
            Demonstration::from_template("d1", "AI501", &t),
            Err(ValidationError::EmptyTemplate { .. })
        ));
    }
}
