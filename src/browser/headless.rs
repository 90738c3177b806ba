use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::SessionError;

/// 录制窗口尺寸
const WINDOW_WIDTH: u32 = 1920;
const WINDOW_HEIGHT: u32 = 1080;

/// 启动无头浏览器并打开一个空白页
pub async fn launch_headless_browser(
    chrome_executable: Option<&Path>,
) -> Result<(Browser, Page), SessionError> {
    info!("🚀 启动无头浏览器...");

    let mut builder = BrowserConfig::builder()
        .new_headless_mode()
        .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--hide-scrollbars",
            "--mute-audio",
        ]);
    if let Some(path) = chrome_executable {
        debug!("使用浏览器: {}", path.display());
        builder = builder.chrome_executable(path);
    }
    let config = builder.build().map_err(|e| {
        error!("配置无头浏览器失败: {}", e);
        SessionError::LaunchFailed { reason: e }
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动无头浏览器失败: {}", e);
        SessionError::LaunchFailed {
            reason: e.to_string(),
        }
    })?;
    debug!("无头浏览器启动成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        SessionError::PageCreationFailed {
            reason: e.to_string(),
        }
    })?;

    info!("✅ 无头浏览器已就绪");
    Ok((browser, page))
}
