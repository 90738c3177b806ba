//! 会话录制
//!
//! 按固定间隔抓取页面截图作为视频帧，会话结束时交给媒体工具编码。
//! 这是流水线里唯一的后台任务，随会话启动、随会话结束被回收。

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::CapturedFrame;

/// 正在进行的录制
pub struct FrameRecorder {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Vec<CapturedFrame>>,
}

impl FrameRecorder {
    /// 开始录制
    pub fn start(page: Page, frames_dir: PathBuf, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut frames = Vec::new();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let path = frames_dir.join(format!("frame_{:06}.png", frames.len()));
                        let offset = started.elapsed().as_secs_f64();
                        match page.save_screenshot(ScreenshotParams::builder().build(), &path).await {
                            Ok(_) => frames.push(CapturedFrame { path, offset }),
                            Err(e) => debug!("抓帧失败 (偏移 {:.2}s): {}", offset, e),
                        }
                    }
                }
            }

            frames
        });

        Self { stop_tx, task }
    }

    /// 停止录制并返回所有帧
    pub async fn stop(self) -> Vec<CapturedFrame> {
        // 接收端已结束时发送失败是正常的
        let _ = self.stop_tx.send(());
        match self.task.await {
            Ok(frames) => frames,
            Err(e) => {
                debug!("录制任务异常结束: {}", e);
                Vec::new()
            }
        }
    }
}
