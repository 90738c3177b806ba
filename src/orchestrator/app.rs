//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：写日志文件头、连接或启动浏览器、组装流水线
//! 2. **资源管理**：持有 Browser，保证页面在整个运行期间有效
//! 3. **运行**：为配置的课程建库并执行，输出统计
//!
//! 浏览器无法连接时初始化直接失败；之后的单个演示失败不会影响其他演示。

use std::sync::Arc;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{
    ArtifactLayout, ChromiumDriver, FfmpegToolkit, HttpSpeechSynthesizer, JsExecutor,
    MediaToolkit, SpeechSynthesizer, UnavailableSpeech,
};
use crate::models::{load_catalog_folder, load_persona_file, DemoCatalog, PersonaRegistry};
use crate::orchestrator::library_orchestrator::LibraryOrchestrator;
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    orchestrator: LibraryOrchestrator,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)?;
        log_startup(&config);

        ArtifactLayout::new(&config.output_root).ensure_dirs().await?;

        // 浏览器（失败是致命的）
        let (browser, page) = if config.use_headless {
            browser::launch_headless_browser(config.chrome_executable.as_deref()).await?
        } else {
            browser::connect_to_browser(config.browser_debug_port).await?
        };
        let executor = JsExecutor::new(page);

        let toolkit: Arc<dyn MediaToolkit> = Arc::new(FfmpegToolkit::new(&config.media));
        let driver = Arc::new(ChromiumDriver::new(
            executor,
            toolkit.clone(),
            config.automation.frame_interval,
        ));
        let catalog = Arc::new(load_catalog(&config).await?);
        let personas = Arc::new(load_personas(&config).await?);
        let speech = build_speech(&config)?;

        let orchestrator =
            LibraryOrchestrator::assemble(&config, catalog, personas, driver, toolkit, speech);

        Ok(Self {
            config,
            _browser: browser,
            orchestrator,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<()> {
        let library_id = self
            .orchestrator
            .build_library(&self.config.course_id)
            .with_context(|| format!("无法为课程 {} 建库", self.config.course_id))?;

        let report = self.orchestrator.execute_library(&library_id).await?;
        if report.total == 0 {
            warn!("⚠️ 课程 {} 没有可用的演示模板", self.config.course_id);
        }

        print_final_stats(&report, &self.config.output_log_file);
        Ok(())
    }
}

/// 内置目录，加上配置目录下的 TOML 模板（后者优先）
async fn load_catalog(config: &Config) -> Result<DemoCatalog> {
    let builtin = DemoCatalog::builtin();
    match &config.catalog_folder {
        Some(folder) => {
            info!("📁 加载模板目录: {}", folder.display());
            let extra = load_catalog_folder(folder).await?;
            Ok(builtin.merge(extra))
        }
        None => Ok(builtin),
    }
}

async fn load_personas(config: &Config) -> Result<PersonaRegistry> {
    let mut registry = PersonaRegistry::default();
    if let Some(path) = &config.persona_file {
        for persona in load_persona_file(path).await? {
            info!("🎭 加载人设: {}", persona.id);
            registry.insert(persona);
        }
    }
    Ok(registry)
}

fn build_speech(config: &Config) -> Result<Arc<dyn SpeechSynthesizer>> {
    let speech: Arc<dyn SpeechSynthesizer> = match &config.speech_endpoint {
        Some(endpoint) => Arc::new(HttpSpeechSynthesizer::new(endpoint.as_str())?),
        None => Arc::new(UnavailableSpeech),
    };
    Ok(speech)
}
