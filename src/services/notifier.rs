//! 通知服务 - 业务能力层
//!
//! 只负责"把访问码送到候选人手里"，不关心何时发送

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};

/// 通知接口
pub trait Notifier: Send + Sync {
    /// 发送访问码
    ///
    /// # 参数
    /// - `candidate_id`: 候选人标识（邮箱）
    /// - `secret`: 访问码
    fn notify(&self, candidate_id: &str, secret: &str) -> Result<()>;
}

/// 发件箱通知
///
/// 每条通知追加一行到发件箱文件，由外部投递程序读取发送
pub struct OutboxNotifier {
    outbox_path: PathBuf,
}

impl OutboxNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            outbox_path: path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.outbox_path
    }
}

impl Notifier for OutboxNotifier {
    fn notify(&self, candidate_id: &str, secret: &str) -> Result<()> {
        debug!("写入发件箱: {} -> {}", candidate_id, self.outbox_path.display());

        if let Some(parent) = self.outbox_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.outbox_path)
            .with_context(|| format!("无法打开发件箱: {}", self.outbox_path.display()))?;

        let line = format!(
            "{} | to: {} | 您已通过初筛，在线测评访问码: {}\n",
            Utc::now().to_rfc3339(),
            candidate_id,
            secret
        );
        file.write_all(line.as_bytes())?;

        info!("📧 已通知候选人 {}", candidate_id);
        Ok(())
    }
}
