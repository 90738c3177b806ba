use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::SessionError;

/// 连接到已打开的浏览器，复用第一个空白页或新建页面
pub async fn connect_to_browser(port: u16) -> Result<(Browser, Page), SessionError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        SessionError::ConnectionFailed {
            port,
            reason: e.to_string(),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser
        .pages()
        .await
        .map_err(|e| SessionError::ConnectionFailed {
            port,
            reason: e.to_string(),
        })?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            if url == "about:blank" {
                info!("✓ 复用空白页面");
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("创建空白页面用于录制");
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建空白页面失败: {}", e);
        SessionError::PageCreationFailed {
            reason: e.to_string(),
        }
    })?;

    Ok((browser, page))
}
