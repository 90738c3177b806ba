use std::sync::Arc;

use demo_studio::browser::{connect_to_browser, launch_headless_browser};
use demo_studio::config::{AutomationConfig, Config};
use demo_studio::infrastructure::{
    ArtifactLayout, ChromiumDriver, FfmpegToolkit, JsExecutor, MediaToolkit,
};
use demo_studio::models::{Category, DemoCatalog, DemoTemplate, StepTemplate};
use demo_studio::services::{AutomationExecutor, StepStatus};
use demo_studio::utils::logging;
use demo_studio::{App, Demonstration};

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_connection() {
    logging::init(true);

    let config = Config::from_env().expect("配置无效");

    let result = connect_to_browser(config.browser_debug_port).await;

    assert!(result.is_ok(), "应该能够成功连接浏览器");
}

#[tokio::test]
#[ignore] // 需要本机安装 Chrome 和 ffmpeg
async fn test_record_single_demo_headless() {
    logging::init(true);

    let dir = tempfile::tempdir().expect("无法创建临时目录");
    let config = Config {
        output_root: dir.path().to_path_buf(),
        ..Config::default()
    };
    let layout = ArtifactLayout::new(&config.output_root);
    layout.ensure_dirs().await.expect("无法创建输出目录");

    let (_browser, page) = launch_headless_browser(None)
        .await
        .expect("启动无头浏览器失败");
    let toolkit: Arc<dyn MediaToolkit> = Arc::new(FfmpegToolkit::new(&config.media));
    let driver = Arc::new(ChromiumDriver::new(
        JsExecutor::new(page),
        toolkit,
        config.automation.frame_interval,
    ));

    let template = DemoTemplate::new(
        "example-page",
        Category::WebDevelopment,
        "static pages",
        "https://example.com",
        vec![
            StepTemplate::new("navigate", "https://example.com", "Open the example page"),
            StepTemplate::new("hover", "h1", "Look at the heading").highlighted(),
            StepTemplate::new("click", "#does-not-exist", "Click a button that is not there"),
            StepTemplate::new("screenshot", "", "Capture the page"),
        ],
    );
    let demo = Demonstration::from_template("example-page-live", "WEB220", &template)
        .expect("模板应该合法");

    let executor = AutomationExecutor::new(
        driver,
        layout,
        AutomationConfig {
            honor_step_durations: false,
            ..config.automation.clone()
        },
    );
    let report = executor.execute(&demo).await.expect("会话应该能建立");

    assert_eq!(report.log.len(), 4);
    assert_eq!(report.log[0].status, StepStatus::Success);
    assert_eq!(report.log[2].status, StepStatus::Failed);
    assert!(report.video_path.map_or(false, |p| p.exists()));
}

#[tokio::test]
#[ignore] // 完整流程：需要 Chrome、ffmpeg 以及网络
async fn test_full_run_for_course() {
    logging::init(true);

    let dir = tempfile::tempdir().expect("无法创建临时目录");
    let config = Config {
        output_root: dir.path().to_path_buf(),
        output_log_file: dir.path().join("run.txt").display().to_string(),
        course_id: "WEB220".to_string(),
        use_headless: true,
        ..Config::default()
    };
    assert!(DemoCatalog::builtin().categories_for("WEB220").is_some());

    let mut app = App::initialize(config).await.expect("初始化失败");
    app.run().await.expect("运行失败");
}
