//! 访问码服务 - 业务能力层
//!
//! 签发 / 校验绑定到申请记录的一次性考试访问码

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{AppResult, AuthError};
use crate::models::attempt::AttemptSeed;
use crate::models::record::{ApplicationStatus, Credential, RecordPatch};
use crate::services::ledger::Ledger;

/// 访问码字符集（去掉 0/O、1/I 这类容易看错的字符）
pub const SECRET_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 重新生成访问码的最多次数
const MAX_ISSUE_ATTEMPTS: usize = 32;

/// 访问码服务
pub struct CredentialStore {
    ledger: Arc<dyn Ledger>,
    ttl: chrono::Duration,
    secret_length: usize,
    /// 考试已结束但结果尚未写入台账的申请
    revoked: Mutex<HashSet<String>>,
}

impl CredentialStore {
    pub fn new(ledger: Arc<dyn Ledger>, ttl_hours: i64, secret_length: usize) -> Self {
        Self {
            ledger,
            ttl: chrono::Duration::hours(ttl_hours),
            secret_length,
            revoked: Mutex::new(HashSet::new()),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// 作废申请的访问码（进程内）
    ///
    /// 考试被终止但结果还没写进台账时调用，阻止同一访问码重新登录
    pub fn revoke(&self, subject_id: &str) {
        if self.revoked.lock().insert(subject_id.to_string()) {
            warn!("🔒 申请 {} 的访问码已作废", subject_id);
        }
    }

    pub fn is_revoked(&self, subject_id: &str) -> bool {
        self.revoked.lock().contains(subject_id)
    }

    /// 为申请记录签发新访问码
    ///
    /// 新码覆盖旧码；访问码在所有记录间唯一
    pub fn issue(&self, subject_id: &str, now: DateTime<Utc>) -> AppResult<Credential> {
        let mut secret = generate_secret(self.secret_length);
        let mut attempts = 1;
        while self.ledger.secret_in_use(&secret)? {
            if attempts >= MAX_ISSUE_ATTEMPTS {
                warn!("访问码连续 {} 次重复，使用加长访问码", attempts);
                secret = generate_secret(self.secret_length + 2);
                continue;
            }
            secret = generate_secret(self.secret_length);
            attempts += 1;
        }

        let credential = Credential {
            subject_id: subject_id.to_string(),
            secret,
            issued_at: now,
        };

        self.ledger
            .update_record(subject_id, RecordPatch::credential(credential.clone()))?;

        info!("🔑 已为申请 {} 签发访问码", subject_id);
        Ok(credential)
    }

    /// 校验邮箱 + 访问码
    ///
    /// 依次检查：访问码匹配 → 已入围 → 考试未结束 → 未过期
    pub fn validate(
        &self,
        email: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> AppResult<AttemptSeed> {
        let records = self.ledger.find_by_email(email)?;
        if records.is_empty() {
            debug!("邮箱 {} 无申请记录", email);
            return Err(AuthError::NotFound.into());
        }

        let secret = secret.trim();
        let mut matches: Vec<_> = records
            .into_iter()
            .filter_map(|record| {
                let credential = record.credential.clone()?;
                (credential.secret == secret).then_some((record, credential))
            })
            .collect();

        if matches.is_empty() {
            return Err(AuthError::BadCredential.into());
        }

        // 旧数据里可能有重复访问码：优先已入围、再取最近签发的
        matches.sort_by_key(|(record, credential)| {
            (
                record.status == ApplicationStatus::Shortlisted,
                credential.issued_at,
            )
        });
        let (record, credential) = matches.pop().ok_or(AuthError::BadCredential)?;

        if record.status != ApplicationStatus::Shortlisted {
            return Err(AuthError::NotEligible.into());
        }
        if record.outcome_recorded() || self.is_revoked(&record.id) {
            debug!("申请 {} 的考试已结束，拒绝再次登录", record.id);
            return Err(AuthError::AttemptUsed.into());
        }
        if !credential.is_fresh(now, self.ttl) {
            return Err(AuthError::Expired.into());
        }

        let seed = AttemptSeed {
            record_id: record.id,
            candidate_email: record.email,
            job_id: record.job_id,
        };
        info!("{} ✓ 访问码校验通过", seed);
        Ok(seed)
    }
}

/// 生成随机访问码
pub fn generate_secret(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| SECRET_ALPHABET[rng.gen_range(0..SECRET_ALPHABET.len())] as char)
        .collect()
}
