//! 演示库编排器 - 编排层
//!
//! ## 职责
//!
//! 1. **建库**：课程 → 分类 → 模板 → 演示实例，非法模板记录在库上
//! 2. **执行**：在同一个会话上按顺序驱动每个演示，单个演示失败不中断队列
//! 3. **查询**：状态聚合、演示摘要列表（纯读取）
//! 4. **归档**：同一课程重建时，旧库和它的演示被归档而不是删除

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult, ValidationError};
use crate::infrastructure::{ArtifactLayout, AutomationDriver, MediaToolkit, SpeechSynthesizer};
use crate::models::library::{settle_status, RejectedTemplate};
use crate::models::{
    DemoCatalog, DemoLibrary, DemoStatus, DemoSummary, Demonstration, LibraryStatus,
    LibraryStatusReport, PersonaRegistry, StepDefaults,
};
use crate::services::{
    ArtifactWriter, AutomationExecutor, NarrationComposer, VideoComposer,
};
use crate::utils::logging;
use crate::workflow::{DemoCtx, DemoFlow, DemoOutcome};

/// 演示库编排器
pub struct LibraryOrchestrator {
    catalog: Arc<DemoCatalog>,
    flow: DemoFlow,
    step_defaults: StepDefaults,
    /// 按创建顺序
    libraries: Vec<DemoLibrary>,
    demos: HashMap<String, Demonstration>,
}

impl LibraryOrchestrator {
    pub fn new(catalog: Arc<DemoCatalog>, flow: DemoFlow) -> Self {
        Self {
            catalog,
            flow,
            step_defaults: StepDefaults::default(),
            libraries: Vec::new(),
            demos: HashMap::new(),
        }
    }

    /// 用配置和外部能力组装完整的流水线
    pub fn assemble(
        config: &Config,
        catalog: Arc<DemoCatalog>,
        personas: Arc<PersonaRegistry>,
        driver: Arc<dyn AutomationDriver>,
        toolkit: Arc<dyn MediaToolkit>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let layout = ArtifactLayout::new(&config.output_root);
        let writer = ArtifactWriter::new(layout.clone());
        let flow = DemoFlow::new(
            AutomationExecutor::new(driver, layout, config.automation.clone()),
            NarrationComposer::new(config.narration.clone()).with_speech(speech),
            VideoComposer::new(toolkit, writer.clone(), config.enhancement.clone()),
            writer,
            personas,
        );
        Self::new(catalog, flow).with_step_defaults(config.automation.step_defaults())
    }

    pub fn with_step_defaults(mut self, defaults: StepDefaults) -> Self {
        self.step_defaults = defaults;
        self
    }

    /// 为课程建立演示库
    ///
    /// # 返回
    /// 新演示库的ID；课程未知时返回校验错误
    pub fn build_library(&mut self, course_id: &str) -> AppResult<String> {
        let catalog = Arc::clone(&self.catalog);
        let categories = catalog
            .categories_for(course_id)
            .ok_or_else(|| ValidationError::UnknownCourse {
                course_id: course_id.to_string(),
            })?;
        let templates = catalog.templates_for(categories);

        self.archive_course(course_id);

        let mut library = DemoLibrary::new(new_id(&format!("lib-{}", slug(course_id))), course_id);
        for template in templates {
            let demo_id = new_id(&template.key);
            match Demonstration::from_template_with(
                demo_id,
                course_id,
                template,
                &self.step_defaults,
            ) {
                Ok(demo) => {
                    library.aggregate_duration_minutes += demo.duration_minutes;
                    library.push_demo(demo.id.clone());
                    self.demos.insert(demo.id.clone(), demo);
                }
                Err(e) => {
                    warn!("⚠️ 模板 {} 被拒绝: {}", template.key, e);
                    library.rejected_templates.push(RejectedTemplate {
                        template_key: template.key.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "📚 课程 {} 建库完成: {} 个演示, {} 个模板被拒绝, 预计 {:.1} 分钟",
            course_id,
            library.demo_ids.len(),
            library.rejected_templates.len(),
            library.aggregate_duration_minutes
        );
        let id = library.id.clone();
        self.libraries.push(library);
        Ok(id)
    }

    /// 按顺序执行库中所有演示
    ///
    /// 已经结束的演示会被跳过；任何单个演示的失败都不会中断队列
    pub async fn execute_library(&mut self, library_id: &str) -> AppResult<LibraryStatusReport> {
        let library = self
            .libraries
            .iter_mut()
            .find(|l| l.id == library_id)
            .ok_or_else(|| AppError::LibraryNotFound {
                library_id: library_id.to_string(),
            })?;
        if library.status == LibraryStatus::Archived {
            return Err(ValidationError::IllegalTransition {
                from: "archived".to_string(),
                to: "running".to_string(),
            }
            .into());
        }

        library.status = LibraryStatus::Running;
        let total = library.demo_ids.len();
        logging::log_library_start(&library.id, &library.course_ref, total);

        let (mut completed, mut failed) = (0, 0);
        for (i, demo_id) in library.demo_ids.iter().enumerate() {
            let Some(demo) = self.demos.get_mut(demo_id) else {
                warn!("⚠️ 演示 {} 不存在，跳过", demo_id);
                failed += 1;
                continue;
            };
            let outcome = if demo.status().is_terminal() {
                info!("[演示 {}/{}] 已结束 ({})，跳过", i + 1, total, demo.status());
                if demo.status() == DemoStatus::Completed {
                    DemoOutcome::Completed
                } else {
                    DemoOutcome::Failed
                }
            } else {
                let ctx = DemoCtx::new(library.id.clone(), i + 1, total);
                self.flow.run(demo, &ctx).await
            };
            match outcome {
                DemoOutcome::Completed => completed += 1,
                DemoOutcome::Failed => failed += 1,
            }
        }

        // 完成的演示时长已换成成片实际时长
        library.aggregate_duration_minutes = library
            .demo_ids
            .iter()
            .filter_map(|id| self.demos.get(id))
            .map(|d| d.duration_minutes)
            .sum();
        library.status = settle_status(completed, failed);
        info!(
            "📊 演示库 {} 执行结束: 完成 {}, 失败 {} → {:?}",
            library.id, completed, failed, library.status
        );
        self.get_status(library_id)
    }

    /// 聚合演示库状态（纯读取）
    pub fn get_status(&self, library_id: &str) -> AppResult<LibraryStatusReport> {
        let library = self.library(library_id).ok_or_else(|| AppError::LibraryNotFound {
            library_id: library_id.to_string(),
        })?;
        let demos: Vec<&Demonstration> = library
            .demo_ids
            .iter()
            .filter_map(|id| self.demos.get(id))
            .collect();
        Ok(LibraryStatusReport::aggregate(library, &demos))
    }

    /// 未归档演示的摘要，可按课程过滤
    pub fn list_demonstrations(&self, course_id: Option<&str>) -> Vec<DemoSummary> {
        self.libraries
            .iter()
            .flat_map(|l| l.demo_ids.iter())
            .filter_map(|id| self.demos.get(id))
            .filter(|d| !d.archived)
            .filter(|d| course_id.map_or(true, |c| d.course_ref == c))
            .map(DemoSummary::from)
            .collect()
    }

    pub fn library(&self, library_id: &str) -> Option<&DemoLibrary> {
        self.libraries.iter().find(|l| l.id == library_id)
    }

    pub fn demonstration(&self, demo_id: &str) -> AppResult<&Demonstration> {
        self.demos.get(demo_id).ok_or_else(|| AppError::DemoNotFound {
            demo_id: demo_id.to_string(),
        })
    }

    /// 归档同一课程下仍在使用的演示库及其演示
    fn archive_course(&mut self, course_id: &str) {
        for library in self
            .libraries
            .iter_mut()
            .filter(|l| l.course_ref == course_id && l.status != LibraryStatus::Archived)
        {
            info!("🗄️ 归档旧演示库: {}", library.id);
            library.status = LibraryStatus::Archived;
            for demo_id in &library.demo_ids {
                if let Some(demo) = self.demos.get_mut(demo_id) {
                    demo.archived = true;
                }
            }
        }
    }
}

fn slug(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// `{prefix}-{8位随机}`
fn new_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AutomationConfig;
    use crate::infrastructure::fakes::{FakeMediaToolkit, FakeSpeech, ScriptedDriver};

    fn orchestrator(root: &std::path::Path) -> LibraryOrchestrator {
        let config = Config {
            output_root: root.to_path_buf(),
            automation: AutomationConfig::instant(),
            ..Config::default()
        };
        LibraryOrchestrator::assemble(
            &config,
            Arc::new(DemoCatalog::builtin()),
            Arc::new(PersonaRegistry::default()),
            Arc::new(ScriptedDriver::new()),
            Arc::new(FakeMediaToolkit::new()),
            Arc::new(FakeSpeech::new()),
        )
    }

    #[test]
    fn test_unknown_course_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = orchestrator(dir.path()).build_library("NOPE999").unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnknownCourse { .. })
        ));
    }

    #[test]
    fn test_rebuild_archives_previous_library() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(dir.path());
        let first = orch.build_library("DS201").unwrap();
        let before = orch.list_demonstrations(Some("DS201")).len();
        let second = orch.build_library("DS201").unwrap();

        assert_ne!(first, second);
        assert_eq!(orch.library(&first).unwrap().status, LibraryStatus::Archived);
        assert_eq!(orch.list_demonstrations(Some("DS201")).len(), before);
        assert!(orch.list_demonstrations(Some("AI501")).is_empty());
    }

    #[tokio::test]
    async fn test_archived_library_cannot_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut orch = orchestrator(dir.path());
        let first = orch.build_library("SEC301").unwrap();
        orch.build_library("SEC301").unwrap();
        assert!(orch.execute_library(&first).await.is_err());
    }

    #[test]
    fn test_step_defaults_come_from_automation_config() {
        use crate::models::{Category, DemoTemplate, StepAction, StepTemplate};

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_root: dir.path().to_path_buf(),
            automation: AutomationConfig {
                scroll_delta: 900,
                default_wait_seconds: 0.25,
                ..AutomationConfig::instant()
            },
            ..Config::default()
        };
        let catalog = DemoCatalog::new()
            .with_course("OPS100", [Category::DevOps])
            .with_template(DemoTemplate::new(
                "ops-scroll",
                Category::DevOps,
                "dashboards",
                "https://example.com",
                vec![
                    StepTemplate::new("scroll", "", "Scroll down"),
                    StepTemplate::new("wait", "", "Wait a moment"),
                ],
            ));
        let mut orch = LibraryOrchestrator::assemble(
            &config,
            Arc::new(catalog),
            Arc::new(PersonaRegistry::default()),
            Arc::new(ScriptedDriver::new()),
            Arc::new(FakeMediaToolkit::new()),
            Arc::new(FakeSpeech::new()),
        );

        let library_id = orch.build_library("OPS100").unwrap();
        let demo_id = orch.library(&library_id).unwrap().demo_ids[0].clone();
        let steps = orch.demonstration(&demo_id).unwrap().steps();
        assert_eq!(steps[0].action, StepAction::Scroll { delta_y: 900 });
        assert_eq!(steps[1].action, StepAction::Wait { seconds: 0.25 });
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug(" AI 501 "), "ai-501");
    }
}
