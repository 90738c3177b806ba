//! 演示库流水线测试（不需要浏览器和 ffmpeg）

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use demo_studio::config::{AutomationConfig, Config};
use demo_studio::error::AppError;
use demo_studio::infrastructure::fakes::{FakeMediaToolkit, FakeSpeech, ScriptedDriver};
use demo_studio::infrastructure::{SpeechSynthesizer, UnavailableSpeech};
use demo_studio::models::{
    Category, DemoCatalog, DemoStatus, DemoTemplate, Layer, LibraryStatus,
    PersonaRegistry, StepTemplate,
};
use demo_studio::services::NarrationComposer;
use demo_studio::LibraryOrchestrator;

fn test_config(root: &Path) -> Config {
    Config {
        output_root: root.to_path_buf(),
        automation: AutomationConfig::instant(),
        ..Config::default()
    }
}

fn three_step_catalog() -> DemoCatalog {
    DemoCatalog::new()
        .with_course("TEST100", [Category::Programming])
        .with_template(DemoTemplate::new(
            "three-steps",
            Category::Programming,
            "button handling",
            "https://example.com",
            vec![
                StepTemplate::new("navigate", "https://example.com", "Open the page"),
                StepTemplate::new("click", "#missing", "Click the missing button").highlighted(),
                StepTemplate::new("wait", "", "Wait for the result").with_meta("seconds", "2"),
            ],
        ))
}

struct Pipeline {
    orchestrator: LibraryOrchestrator,
    toolkit: Arc<FakeMediaToolkit>,
    driver: Arc<ScriptedDriver>,
}

fn pipeline(
    root: &Path,
    catalog: DemoCatalog,
    driver: ScriptedDriver,
    toolkit: FakeMediaToolkit,
    speech: Arc<dyn SpeechSynthesizer>,
) -> Pipeline {
    let driver = Arc::new(driver);
    let toolkit = Arc::new(toolkit);
    let orchestrator = LibraryOrchestrator::assemble(
        &test_config(root),
        Arc::new(catalog),
        Arc::new(PersonaRegistry::default()),
        driver.clone(),
        toolkit.clone(),
        speech,
    );
    Pipeline {
        orchestrator,
        toolkit,
        driver,
    }
}

#[test]
fn test_build_library_selects_course_categories() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = DemoCatalog::builtin();
    let expected = catalog.categories_for("AI501").unwrap().clone();
    assert_eq!(
        expected,
        BTreeSet::from([Category::MachineLearning, Category::DataScience])
    );
    let wanted = catalog.templates_for(&expected).len();
    let mut p = pipeline(
        dir.path(),
        catalog.clone(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("AI501").unwrap();
    let library = p.orchestrator.library(&library_id).unwrap();

    assert_eq!(library.demo_ids.len(), wanted);
    assert!(wanted > 0);
    for id in &library.demo_ids {
        let demo = p.orchestrator.demonstration(id).unwrap();
        let template = catalog
            .templates()
            .iter()
            .find(|t| t.key == demo.template_key)
            .unwrap();
        assert!(expected.contains(&template.category));
        assert_eq!(demo.status(), DemoStatus::Created);
    }
}

#[tokio::test]
async fn test_failed_step_is_isolated_and_demo_completes() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new().with_missing("#missing"),
        FakeMediaToolkit::new().with_audio_duration(12.0),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    let report = p.orchestrator.execute_library(&library_id).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.status, LibraryStatus::Completed);

    let demo_id = &p.orchestrator.library(&library_id).unwrap().demo_ids[0];
    let demo = p.orchestrator.demonstration(demo_id).unwrap();
    assert_eq!(demo.status(), DemoStatus::Completed);
    assert!(demo.warnings().iter().any(|w| w.contains("#missing")));

    let log_path = demo.artifacts().execution_log_path.clone().unwrap();
    let log: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(log_path).unwrap()).unwrap();
    let statuses: Vec<&str> = log["log"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["success", "failed", "success"]);

    let artifacts = demo.artifacts();
    assert!(artifacts.audio_path.is_some());
    assert!(artifacts.transcript_path.as_ref().unwrap().exists());
    assert!(artifacts.subtitle_path.as_ref().unwrap().exists());
    let final_video = artifacts.enhanced_video_path.as_ref().unwrap();
    assert!(final_video.exists());
    assert!(p.driver.active_highlights().is_empty());
}

#[tokio::test]
async fn test_session_failure_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        DemoCatalog::builtin(),
        ScriptedDriver::new().with_failing_session("ml-teachable-machine"),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("AI501").unwrap();
    let report = p.orchestrator.execute_library(&library_id).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.completed, report.total - 1);
    assert_eq!(report.status, LibraryStatus::CompletedWithFailures);
    let failed = report
        .demos
        .iter()
        .find(|d| d.status == DemoStatus::Failed)
        .unwrap();
    assert!(failed.id.starts_with("ml-teachable-machine"));
}

#[tokio::test]
async fn test_every_session_failing_fails_library() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new().failing_all_sessions(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    let report = p.orchestrator.execute_library(&library_id).await.unwrap();

    assert_eq!(report.status, LibraryStatus::Failed);
    assert!(p.toolkit.operations().is_empty());
}

#[tokio::test]
async fn test_compose_failure_falls_back_to_raw_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new().failing_compose().failing_fade(),
        Arc::new(UnavailableSpeech),
    );

    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    p.orchestrator.execute_library(&library_id).await.unwrap();

    let demo_id = p.orchestrator.library(&library_id).unwrap().demo_ids[0].clone();
    let demo = p.orchestrator.demonstration(&demo_id).unwrap();
    let artifacts = demo.artifacts();
    assert_eq!(demo.status(), DemoStatus::Completed);
    assert_eq!(artifacts.enhanced_video_path, artifacts.video_path);
    assert!(artifacts.enhanced_video_path.as_ref().unwrap().exists());
    // 语音不可用：只有文字稿
    assert!(artifacts.audio_path.is_none());
    assert!(artifacts.transcript_path.is_some());
}

#[tokio::test]
async fn test_annotation_windows_with_default_duration() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new().with_video_info(None),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    p.orchestrator.execute_library(&library_id).await.unwrap();

    let spec = p.toolkit.last_spec().unwrap();
    assert_eq!(spec.duration, 60.0);
    assert!(spec.overlay_count() > 0);
    for layer in &spec.layers {
        if let Layer::Overlay { window, .. } = layer {
            assert!(window.within(60.0), "{:?}", window);
        }
    }
}

#[test]
fn test_aggregate_duration_is_sum_of_demos() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        DemoCatalog::builtin(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("CS101").unwrap();
    let report = p.orchestrator.get_status(&library_id).unwrap();
    let sum: f64 = report.demos.iter().map(|d| d.duration_minutes).sum();

    assert!((report.aggregate_duration_minutes - sum).abs() < 1e-6);
    let library = p.orchestrator.library(&library_id).unwrap();
    assert!((library.aggregate_duration_minutes - sum).abs() < 1e-6);
}

#[tokio::test]
async fn test_completed_demo_reports_final_video_duration() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new(),
        // 视频 30s，音频 12s → 成片 12s
        FakeMediaToolkit::new().with_audio_duration(12.0),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    let report = p.orchestrator.execute_library(&library_id).await.unwrap();

    let demo_id = &p.orchestrator.library(&library_id).unwrap().demo_ids[0];
    let demo = p.orchestrator.demonstration(demo_id).unwrap();
    assert_eq!(demo.status(), DemoStatus::Completed);
    assert!((demo.duration_minutes - 0.2).abs() < 1e-9);
    assert!((report.aggregate_duration_minutes - 0.2).abs() < 1e-9);
    let library = p.orchestrator.library(&library_id).unwrap();
    assert!((library.aggregate_duration_minutes - 0.2).abs() < 1e-9);
}

#[test]
fn test_malformed_template_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = three_step_catalog().with_template(DemoTemplate::new(
        "broken",
        Category::Programming,
        "teleporting",
        "https://example.com",
        vec![StepTemplate::new("teleport", "#somewhere", "Teleport away")],
    ));
    let mut p = pipeline(
        dir.path(),
        catalog,
        ScriptedDriver::new(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );

    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    let library = p.orchestrator.library(&library_id).unwrap();

    assert_eq!(library.demo_ids.len(), 1);
    assert_eq!(library.rejected_templates.len(), 1);
    assert_eq!(library.rejected_templates[0].template_key, "broken");
}

#[test]
fn test_narration_is_deterministic_and_scales_with_rate() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );
    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    let demo_id = p.orchestrator.library(&library_id).unwrap().demo_ids[0].clone();
    let demo = p.orchestrator.demonstration(&demo_id).unwrap();
    let persona = PersonaRegistry::default().resolve(&demo.narration_style);
    let composer = NarrationComposer::new(test_config(dir.path()).narration);

    let first = composer.generate_with_rate(demo, &persona, 1.0);
    let again = composer.generate_with_rate(demo, &persona, 1.0);
    assert_eq!(first, again);

    let fast = composer.generate_with_rate(demo, &persona, 2.0);
    assert_eq!(first.len(), fast.len());
    for (slow, quick) in first.iter().zip(&fast) {
        assert_eq!(slow.text, quick.text);
        assert!((slow.duration / 2.0 - quick.duration).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_unknown_library_and_listing() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        DemoCatalog::builtin(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );

    assert!(matches!(
        p.orchestrator.get_status("missing"),
        Err(AppError::LibraryNotFound { .. })
    ));
    assert!(p.orchestrator.execute_library("missing").await.is_err());

    p.orchestrator.build_library("AI501").unwrap();
    p.orchestrator.build_library("SEC301").unwrap();
    let all = p.orchestrator.list_demonstrations(None);
    let security = p.orchestrator.list_demonstrations(Some("SEC301"));
    assert!(security.iter().all(|d| d.course_ref == "SEC301"));
    assert_eq!(
        all.len(),
        security.len() + p.orchestrator.list_demonstrations(Some("AI501")).len()
    );
}

#[tokio::test]
async fn test_rerun_skips_finished_demos() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = pipeline(
        dir.path(),
        three_step_catalog(),
        ScriptedDriver::new(),
        FakeMediaToolkit::new(),
        Arc::new(FakeSpeech::new()),
    );
    let library_id = p.orchestrator.build_library("TEST100").unwrap();
    p.orchestrator.execute_library(&library_id).await.unwrap();
    let sessions_before = p.driver.calls().iter().filter(|c| c.starts_with("begin:")).count();

    let report = p.orchestrator.execute_library(&library_id).await.unwrap();
    let sessions_after = p.driver.calls().iter().filter(|c| c.starts_with("begin:")).count();

    assert_eq!(report.completed, 1);
    assert_eq!(sessions_before, sessions_after);
    let demo_id = &p.orchestrator.library(&library_id).unwrap().demo_ids[0];
    let demo = p.orchestrator.demonstration(demo_id).unwrap();
    assert!(demo.artifacts().video_path.is_some());
}
