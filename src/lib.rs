//! # Demo Studio
//!
//! 为课程自动生成带旁白和标注的网页操作演示视频
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page、外部进程、产物目录），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `ChromiumDriver` / `FfmpegToolkit` / `HttpSpeechSynthesizer` - 三个外部能力的真实实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Demonstration
//! - `AutomationExecutor` - 执行步骤并录制
//! - `NarrationComposer` - 生成带时间码的旁白
//! - `VideoComposer` - 标注、混流、淡入淡出
//! - `ArtifactWriter` - 写日志 / 文字稿 / 字幕 / warnings.txt
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个演示"的完整处理流程
//! - `DemoCtx` - 上下文封装（library_id + demo_index）
//! - `DemoFlow` - 流程编排（capture → narrate → enhance）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/library_orchestrator` - 建库、顺序执行、状态聚合
//! - `orchestrator/app` - 进程入口，管理浏览器资源
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{DemoCatalog, Demonstration, PersonaRegistry};
pub use orchestrator::{App, LibraryOrchestrator};
pub use workflow::{DemoCtx, DemoFlow, DemoOutcome};
