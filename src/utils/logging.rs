use anyhow::{Context, Result};
/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::LibraryStatusReport;

/// 初始化 tracing 订阅器
///
/// 优先读取 `RUST_LOG`，未设置时 verbose 为 debug，否则为 info。
/// 重复调用是安全的（测试里会多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n演示视频生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 演示视频生成");
    info!("📚 课程: {}", config.course_id);
    info!("📁 输出目录: {}", config.output_root.display());
    info!(
        "🌐 浏览器: {}",
        if config.use_headless {
            "无头模式".to_string()
        } else {
            format!("连接端口 {}", config.browser_debug_port)
        }
    );
    info!(
        "🗣️ 语音服务: {}",
        config.speech_endpoint.as_deref().unwrap_or("未配置（仅文字稿）")
    );
    info!("{}", "=".repeat(60));
}

/// 记录演示库开始执行
pub fn log_library_start(library_id: &str, course_id: &str, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始执行演示库 {} (课程 {})", library_id, course_id);
    info!("📄 共 {} 个演示，按顺序执行", total);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &LibraryStatusReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成: {}/{}", report.completed, report.total);
    info!("❌ 失败: {}", report.failed);
    info!("⏱️ 预计总时长: {:.1} 分钟", report.aggregate_duration_minutes);
    for demo in &report.demos {
        info!(
            "  - [{}] {} → {}",
            demo.status,
            truncate_text(&demo.title, 40),
            demo.final_video.as_deref().unwrap_or("-")
        );
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
