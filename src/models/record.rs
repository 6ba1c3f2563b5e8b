//! 申请记录 - 数据模型
//!
//! 台账文件带 `schema_version`，旧版本在读入时统一补齐默认值，
//! 业务代码拿到的 `ApplicationRecord` 字段总是完整的。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 当前台账格式版本
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// 岗位名称缺省值
pub const DEFAULT_ROLE: &str = "Open Role";

/// 申请状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Rejected,
}

/// 考试结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Terminated (Malpractice)")]
    TerminatedMalpractice,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Completed => write!(f, "Completed"),
            TestStatus::TerminatedMalpractice => write!(f, "Terminated (Malpractice)"),
        }
    }
}

/// 考试访问码
///
/// 签发后不再修改；重新签发时整体替换
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// 申请记录 ID（候选人 + 岗位）
    pub subject_id: String,
    pub secret: String,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// 是否仍在有效期内
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.issued_at < ttl
    }
}

/// 一条申请记录（候选人 × 岗位）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    pub email: String,
    pub job_id: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub credential: Option<Credential>,
    pub test_status: Option<TestStatus>,
    pub test_score: Option<u32>,
    pub aptitude_passed: Option<bool>,
}

impl ApplicationRecord {
    pub fn new(id: impl Into<String>, email: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            job_id: job_id.into(),
            role: DEFAULT_ROLE.to_string(),
            status: ApplicationStatus::Applied,
            credential: None,
            test_status: None,
            test_score: None,
            aptitude_passed: None,
        }
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = status;
        self
    }

    /// 邮箱比较忽略大小写和首尾空白
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }

    /// 考试是否已经结束（结果只写一次）
    pub fn outcome_recorded(&self) -> bool {
        self.test_status.is_some()
    }

    /// 该更新是否会改写已写入的考试结果
    ///
    /// 重复写入完全相同的结果不算改写
    pub fn rewrites_outcome(&self, patch: &RecordPatch) -> bool {
        let Some(existing) = self.test_status else {
            return false;
        };
        let status_changed = patch.test_status.map_or(false, |s| s != existing);
        let score_changed = patch.test_score.is_some() && patch.test_score != self.test_score;
        let passed_changed =
            patch.aptitude_passed.is_some() && patch.aptitude_passed != self.aptitude_passed;
        status_changed || score_changed || passed_changed
    }

    /// 应用一次字段更新（后写覆盖先写）
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(credential) = patch.credential {
            self.credential = Some(credential);
        }
        if let Some(test_status) = patch.test_status {
            self.test_status = Some(test_status);
        }
        if let Some(score) = patch.test_score {
            self.test_score = Some(score);
        }
        if let Some(passed) = patch.aptitude_passed {
            self.aptitude_passed = Some(passed);
        }
    }
}

/// 记录字段更新
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub status: Option<ApplicationStatus>,
    pub credential: Option<Credential>,
    pub test_status: Option<TestStatus>,
    pub test_score: Option<u32>,
    pub aptitude_passed: Option<bool>,
}

impl RecordPatch {
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn credential(credential: Credential) -> Self {
        Self {
            credential: Some(credential),
            ..Default::default()
        }
    }

    pub fn terminated() -> Self {
        Self {
            test_status: Some(TestStatus::TerminatedMalpractice),
            ..Default::default()
        }
    }

    pub fn completed(score: u32, passed: bool) -> Self {
        Self {
            test_status: Some(TestStatus::Completed),
            test_score: Some(score),
            aptitude_passed: Some(passed),
            ..Default::default()
        }
    }
}

// ========== 磁盘格式 ==========

/// 台账文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerFile {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

/// 磁盘上的记录，兼容各版本（缺失字段为 None）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub email: String,
    pub job_id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<ApplicationStatus>,
    #[serde(default)]
    pub credential: Option<Credential>,
    #[serde(default)]
    pub test_status: Option<TestStatus>,
    #[serde(default)]
    pub test_score: Option<u32>,
    #[serde(default)]
    pub aptitude_passed: Option<bool>,
}

impl LedgerFile {
    /// 读入后补齐默认值，返回完整记录
    pub fn migrate(self) -> Vec<ApplicationRecord> {
        let version = self.schema_version;
        self.records
            .into_iter()
            .map(|stored| {
                if version < CURRENT_SCHEMA_VERSION {
                    tracing::debug!("记录 {} 来自旧版台账 (v{})，补齐默认值", stored.id, version);
                }
                ApplicationRecord {
                    role: stored
                        .role
                        .filter(|r| !r.trim().is_empty())
                        .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
                    status: stored.status.unwrap_or(ApplicationStatus::Applied),
                    id: stored.id,
                    email: stored.email,
                    job_id: stored.job_id,
                    credential: stored.credential,
                    test_status: stored.test_status,
                    test_score: stored.test_score,
                    aptitude_passed: stored.aptitude_passed,
                }
            })
            .collect()
    }

    pub fn from_records(records: &[ApplicationRecord]) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            records: records
                .iter()
                .map(|r| StoredRecord {
                    id: r.id.clone(),
                    email: r.email.clone(),
                    job_id: r.job_id.clone(),
                    role: Some(r.role.clone()),
                    status: Some(r.status),
                    credential: r.credential.clone(),
                    test_status: r.test_status,
                    test_score: r.test_score,
                    aptitude_passed: r.aptitude_passed,
                })
                .collect(),
        }
    }
}
