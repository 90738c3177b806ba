use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::demonstration::{DemoStatus, Demonstration};

/// 演示库状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryStatus {
    Created,
    Running,
    Completed,
    /// 部分演示失败
    CompletedWithFailures,
    Failed,
    /// 课程重建后被归档
    Archived,
}

/// 被拒绝的模板
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedTemplate {
    pub template_key: String,
    pub reason: String,
}

/// 一门课程的演示库
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoLibrary {
    pub id: String,
    pub course_ref: String,
    /// 有序且不重复
    pub demo_ids: Vec<String>,
    pub aggregate_duration_minutes: f64,
    pub status: LibraryStatus,
    pub created_at: DateTime<Utc>,
    pub rejected_templates: Vec<RejectedTemplate>,
}

impl DemoLibrary {
    pub fn new(id: impl Into<String>, course_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            course_ref: course_ref.into(),
            demo_ids: Vec::new(),
            aggregate_duration_minutes: 0.0,
            status: LibraryStatus::Created,
            created_at: Utc::now(),
            rejected_templates: Vec::new(),
        }
    }

    /// 追加演示ID（已存在则忽略）
    pub fn push_demo(&mut self, demo_id: impl Into<String>) -> bool {
        let demo_id = demo_id.into();
        if self.demo_ids.contains(&demo_id) {
            return false;
        }
        self.demo_ids.push(demo_id);
        true
    }
}

/// 单个演示的摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSummary {
    pub id: String,
    pub title: String,
    pub course_ref: String,
    pub status: DemoStatus,
    pub duration_minutes: f64,
    pub final_video: Option<String>,
    pub warnings: usize,
}

impl From<&Demonstration> for DemoSummary {
    fn from(demo: &Demonstration) -> Self {
        let artifacts = demo.artifacts();
        let final_video = artifacts
            .enhanced_video_path
            .as_ref()
            .or(artifacts.video_path.as_ref())
            .map(|p| p.display().to_string());
        Self {
            id: demo.id.clone(),
            title: demo.title.clone(),
            course_ref: demo.course_ref.clone(),
            status: demo.status(),
            duration_minutes: demo.duration_minutes,
            final_video,
            warnings: demo.warnings().len(),
        }
    }
}

/// 演示库状态报告（纯读取聚合）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryStatusReport {
    pub library_id: String,
    pub course_ref: String,
    pub status: LibraryStatus,
    pub total: usize,
    pub created: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub aggregate_duration_minutes: f64,
    pub demos: Vec<DemoSummary>,
}

impl LibraryStatusReport {
    /// 根据演示列表聚合
    pub fn aggregate(library: &DemoLibrary, demos: &[&Demonstration]) -> Self {
        let mut report = Self {
            library_id: library.id.clone(),
            course_ref: library.course_ref.clone(),
            status: library.status,
            total: demos.len(),
            created: 0,
            in_progress: 0,
            completed: 0,
            failed: 0,
            aggregate_duration_minutes: 0.0,
            demos: Vec::with_capacity(demos.len()),
        };
        for demo in demos {
            match demo.status() {
                DemoStatus::Created => report.created += 1,
                DemoStatus::Running | DemoStatus::Captured => report.in_progress += 1,
                DemoStatus::Completed => report.completed += 1,
                DemoStatus::Failed => report.failed += 1,
            }
            report.aggregate_duration_minutes += demo.duration_minutes;
            report.demos.push(DemoSummary::from(*demo));
        }
        report
    }
}

/// 根据演示的最终状态推导演示库状态
pub fn settle_status(completed: usize, failed: usize) -> LibraryStatus {
    match (completed, failed) {
        (_, 0) => LibraryStatus::Completed,
        (0, _) => LibraryStatus::Failed,
        _ => LibraryStatus::CompletedWithFailures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_demo_keeps_order_and_uniqueness() {
        let mut library = DemoLibrary::new("lib", "AI501");
        assert!(library.push_demo("a"));
        assert!(library.push_demo("b"));
        assert!(!library.push_demo("a"));
        assert_eq!(library.demo_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_settle_status() {
        assert_eq!(settle_status(3, 0), LibraryStatus::Completed);
        assert_eq!(settle_status(0, 0), LibraryStatus::Completed);
        assert_eq!(settle_status(0, 2), LibraryStatus::Failed);
        assert_eq!(settle_status(1, 1), LibraryStatus::CompletedWithFailures);
    }
}
