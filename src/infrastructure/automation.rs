//! 浏览器自动化能力接口
//!
//! 执行器只依赖这个 trait；真实实现是 [`ChromiumDriver`](super::ChromiumDriver)，
//! 测试使用 [`ScriptedDriver`](super::fakes::ScriptedDriver)。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{SessionError, StepError, ToolError};

/// 浏览器自动化驱动
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// 开始一个演示的录制会话，失败对该演示是致命的
    async fn begin_session(&self, demo_id: &str, frames_dir: &Path) -> Result<(), SessionError>;

    /// 结束录制，把整段会话编码到 `output`
    async fn end_session(&self, output: &Path) -> Result<PathBuf, ToolError>;

    /// 导航并等待网络空闲
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), StepError>;

    async fn click(&self, selector: &str) -> Result<(), StepError>;

    /// 清空并输入文字
    async fn fill(&self, selector: &str, text: &str) -> Result<(), StepError>;

    async fn select_option(&self, selector: &str, value: &str) -> Result<(), StepError>;

    async fn hover(&self, selector: &str) -> Result<(), StepError>;

    async fn scroll_by(&self, delta_y: i64) -> Result<(), StepError>;

    /// 轮询直到元素出现或超时
    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), StepError>;

    async fn screenshot(&self, path: &Path) -> Result<(), StepError>;

    /// 给元素加上/去掉临时高亮边框
    async fn set_highlight(&self, selector: &str, enabled: bool) -> Result<(), StepError>;

    /// 驱动名称（用于日志）
    fn name(&self) -> &str;
}
