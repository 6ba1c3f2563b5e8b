//! 申请台账 - 业务能力层
//!
//! 只负责"按邮箱查记录 / 更新记录字段"，不关心流程。
//! 同步接口，后写覆盖先写；单次更新对下一次读取可见。

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::models::record::{ApplicationRecord, LedgerFile, RecordPatch};

/// 台账接口
pub trait Ledger: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Vec<ApplicationRecord>, PersistenceError>;

    fn find_by_id(&self, id: &str) -> Result<Option<ApplicationRecord>, PersistenceError>;

    fn insert_record(&self, record: ApplicationRecord) -> Result<(), PersistenceError>;

    fn update_record(&self, id: &str, patch: RecordPatch) -> Result<(), PersistenceError>;

    /// 访问码是否已被任意记录使用
    fn secret_in_use(&self, secret: &str) -> Result<bool, PersistenceError>;
}

/// JSON 文件台账
///
/// 内存中保留全部记录，每次写入整体重写文件。`path` 为 `None` 时只在内存中保存。
pub struct FileLedger {
    path: Option<PathBuf>,
    records: RwLock<Vec<ApplicationRecord>>,
}

impl FileLedger {
    /// 打开台账文件（不存在则视为空台账）
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let records = match std::fs::read_to_string(&path) {
            Ok(content) => {
                let file: LedgerFile = serde_json::from_str(&content)
                    .map_err(|e| PersistenceError::serialize(path.display().to_string(), e))?;
                file.migrate()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("台账文件不存在，将新建: {}", path.display());
                Vec::new()
            }
            Err(e) => return Err(PersistenceError::io(path.display().to_string(), e)),
        };

        info!("✓ 已加载 {} 条申请记录", records.len());

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// 纯内存台账
    pub fn in_memory(records: Vec<ApplicationRecord>) -> Self {
        Self {
            path: None,
            records: RwLock::new(records),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn all_records(&self) -> Vec<ApplicationRecord> {
        self.records.read().clone()
    }

    fn persist(&self, records: &[ApplicationRecord]) -> Result<(), PersistenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::io(parent.display().to_string(), e))?;
        }

        let json = serde_json::to_string_pretty(&LedgerFile::from_records(records))
            .map_err(|e| PersistenceError::serialize(path.display().to_string(), e))?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)
            .map_err(|e| PersistenceError::io(tmp_path.display().to_string(), e))?;
        std::fs::rename(&tmp_path, path)
            .map_err(|e| PersistenceError::io(path.display().to_string(), e))?;

        debug!("台账已写入: {}", path.display());
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn find_by_email(&self, email: &str) -> Result<Vec<ApplicationRecord>, PersistenceError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.email_matches(email))
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<ApplicationRecord>, PersistenceError> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    fn insert_record(&self, record: ApplicationRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.write();
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            records.push(record);
        }
        self.persist(&records)
    }

    fn update_record(&self, id: &str, patch: RecordPatch) -> Result<(), PersistenceError> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PersistenceError::RecordNotFound { id: id.to_string() })?;

        if record.rewrites_outcome(&patch) {
            let existing = record
                .test_status
                .map(|s| s.to_string())
                .unwrap_or_default();
            warn!("拒绝改写申请 {} 的考试结果 ({})", id, existing);
            return Err(PersistenceError::OutcomeLocked {
                id: id.to_string(),
                existing,
            });
        }

        let before = record.clone();
        record.apply(patch);

        if let Err(e) = self.persist(&records) {
            // 写盘失败时回滚内存，保持与文件一致
            if let Some(record) = records.iter_mut().find(|r| r.id == id) {
                *record = before;
            }
            return Err(e);
        }
        Ok(())
    }

    fn secret_in_use(&self, secret: &str) -> Result<bool, PersistenceError> {
        Ok(self.records.read().iter().any(|r| {
            r.credential
                .as_ref()
                .map(|c| c.secret == secret)
                .unwrap_or(false)
        }))
    }
}
