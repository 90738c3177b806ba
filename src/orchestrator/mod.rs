//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责演示库的生命周期和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 管理浏览器资源（Browser、ChromiumDriver）
//! - 输出全局统计信息
//!
//! ### `library_orchestrator` - 演示库编排器
//! - 课程 → 演示库（Vec<Demonstration>）
//! - 顺序执行，每个演示交给 DemoFlow
//! - 状态聚合与归档
//!
//! ## 层次关系
//!
//! ```text
//! app (进程入口)
//!     ↓
//! library_orchestrator (处理 Vec<Demonstration>)
//!     ↓
//! workflow::DemoFlow (处理单个 Demonstration)
//!     ↓
//! services (能力层：执行 / 旁白 / 标注 / 合成 / 写产物)
//!     ↓
//! infrastructure (基础设施：驱动 / 媒体工具 / 语音)
//! ```

pub mod app;
pub mod library_orchestrator;

pub use app::App;
pub use library_orchestrator::LibraryOrchestrator;
