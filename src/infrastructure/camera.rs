//! 摄像头连接 - 基础设施层
//!
//! 持有唯一的视频帧处理任务，只暴露"是否在线 / 释放"的能力

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::landmarks::Frame;

/// 逐帧回调
///
/// 输入一帧，输出（可能带标注的）同一帧；分类结果作为副作用写入处理器自身的状态
pub trait FrameProcessor: Send + Sync {
    fn process(&self, frame: Frame) -> Frame;
}

/// 视频传输方提供的帧流
pub struct VideoFeed {
    frames: mpsc::Receiver<Frame>,
    display: Option<mpsc::Sender<Frame>>,
}

impl VideoFeed {
    pub fn new(frames: mpsc::Receiver<Frame>) -> Self {
        Self {
            frames,
            display: None,
        }
    }

    /// 处理后的帧回传给显示端
    pub fn with_display(mut self, display: mpsc::Sender<Frame>) -> Self {
        self.display = Some(display);
        self
    }
}

/// 摄像头连接
///
/// 职责：
/// - 在独立任务中消费帧流，逐帧交给处理器
/// - 记录已收到的帧数，用于判断连接是否建立
/// - `release()` 或 drop 时停止任务
pub struct CameraConnection {
    task: Option<JoinHandle<()>>,
    frames_seen: watch::Receiver<u64>,
}

impl CameraConnection {
    /// 打开连接（必须在 tokio 运行时内调用）
    pub fn open(feed: VideoFeed, processor: Arc<dyn FrameProcessor>) -> Self {
        let (seen_tx, seen_rx) = watch::channel(0u64);
        let VideoFeed {
            mut frames,
            display,
        } = feed;

        let task = tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                let processed = processor.process(frame);
                seen_tx.send_modify(|n| *n += 1);

                if let Some(display) = &display {
                    if display.send(processed).await.is_err() {
                        debug!("显示端已关闭，继续检测但不再回传画面");
                    }
                }
            }
            debug!("视频流已结束");
        });

        info!("📷 摄像头连接已打开");

        Self {
            task: Some(task),
            frames_seen: seen_rx,
        }
    }

    /// 已处理的帧数
    pub fn frames_seen(&self) -> u64 {
        *self.frames_seen.borrow()
    }

    /// 连接已建立：任务仍在运行且至少收到过一帧
    pub fn is_live(&self) -> bool {
        match &self.task {
            Some(task) => !task.is_finished() && self.frames_seen() > 0,
            None => false,
        }
    }

    /// 等待第一帧到达
    pub async fn wait_until_live(&self, timeout: Duration) -> bool {
        let mut rx = self.frames_seen.clone();
        let arrived = tokio::time::timeout(timeout, async move {
            rx.wait_for(|n| *n > 0).await.is_ok()
        })
        .await
        .unwrap_or(false);
        arrived && self.is_live()
    }

    pub fn is_released(&self) -> bool {
        self.task.is_none()
    }

    /// 释放摄像头（可重复调用）
    pub fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("📷 摄像头已释放 (共处理 {} 帧)", self.frames_seen());
        }
    }
}

impl Drop for CameraConnection {
    fn drop(&mut self) {
        self.release();
    }
}
