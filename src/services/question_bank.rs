//! 题库服务 - 业务能力层
//!
//! ## 职责
//! - 通用题池：全局只生成一次，所有岗位共享
//! - 岗位题库：两批技术题 + 通用题池，合并后按岗位保存
//! - 抽题：按标签分层抽取、打乱顺序
//!
//! 生成失败的批次直接跳过，只要还有题就继续建库。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::SamplingSettings;
use crate::error::{AppError, AppResult, BankError, PersistenceError};
use crate::models::loaders::{bank_path, load_bank, save_bank};
use crate::models::question::{Question, QuestionTag};
use crate::services::question_generator::QuestionGenerator;

/// 通用题池的存储名
pub const GENERAL_POOL_ID: &str = "_general_pool";

/// 通用题的两个主题
const GENERAL_TOPICS: [&str; 2] = [
    "Quantitative aptitude (arithmetic, percentages, ratios, time and work)",
    "Logical reasoning and verbal ability",
];

/// 技术题的两个主题（结合岗位描述）
const TECHNICAL_TOPICS: [&str; 2] = [
    "Core technical concepts required for this role",
    "Practical problem-solving scenarios from this role's day-to-day work",
];

/// 建库结果
#[derive(Debug, Clone)]
pub struct BankBuildReport {
    pub job_id: String,
    pub total: usize,
    pub technical: usize,
    pub general: usize,
    /// 可读导出文件路径
    pub export_path: PathBuf,
}

/// 题库服务
pub struct QuestionBank {
    dir: PathBuf,
    generator: Arc<dyn QuestionGenerator>,
    general_pool: OnceCell<Vec<Question>>,
    settings: SamplingSettings,
}

impl QuestionBank {
    pub fn new(
        dir: impl Into<PathBuf>,
        generator: Arc<dyn QuestionGenerator>,
        settings: SamplingSettings,
    ) -> Self {
        Self {
            dir: dir.into(),
            generator,
            general_pool: OnceCell::new(),
            settings,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &SamplingSettings {
        &self.settings
    }

    /// 确保通用题池存在
    ///
    /// 已持久化则直接读取；否则生成一次并保存。并发调用只会触发一次生成。
    pub async fn ensure_general_pool(&self) -> AppResult<Vec<Question>> {
        let pool = self
            .general_pool
            .get_or_try_init(|| async {
                let path = bank_path(&self.dir, GENERAL_POOL_ID);
                if let Some(existing) = load_bank(&path).await? {
                    if !existing.is_empty() {
                        info!("✓ 已加载通用题池: {} 道", existing.len());
                        return Ok(existing);
                    }
                }

                info!("📚 通用题池不存在，开始生成...");
                let generated = self
                    .generate_batches(&GENERAL_TOPICS, None, self.settings.general_batch_size, QuestionTag::General)
                    .await;
                if generated.is_empty() {
                    return Err(AppError::Bank(BankError::GeneralPoolUnavailable));
                }

                save_bank(&path, &generated).await?;
                info!("✓ 通用题池已保存: {} 道", generated.len());
                Ok::<_, AppError>(generated)
            })
            .await?;

        Ok(pool.clone())
    }

    /// 为岗位建库
    ///
    /// 技术题按岗位描述生成，与通用题池合并后保存，并写出可读版本
    pub async fn build_for_job(&self, job_text: &str, job_id: &str) -> AppResult<BankBuildReport> {
        info!("📦 开始为岗位 {} 建立题库", job_id);

        let technical = self
            .generate_batches(
                &TECHNICAL_TOPICS,
                Some(job_text),
                self.settings.technical_batch_size,
                QuestionTag::Technical,
            )
            .await;

        let general = match self.ensure_general_pool().await {
            Ok(pool) => pool,
            Err(e) => {
                warn!("⚠️ 通用题池不可用，题库只包含技术题: {}", e);
                Vec::new()
            }
        };

        if technical.is_empty() && general.is_empty() {
            return Err(BankError::AllBatchesFailed {
                job_id: job_id.to_string(),
            }
            .into());
        }

        let merged = dedup_by_text(technical.into_iter().chain(general));
        let technical_count = merged.iter().filter(|q| q.is_tagged(QuestionTag::Technical)).count();
        let general_count = merged.len() - technical_count;

        save_bank(&bank_path(&self.dir, job_id), &merged).await?;
        let export_path = self.write_export(job_id, &merged).await?;

        info!(
            "✓ 岗位 {} 题库已保存: 共 {} 道 (技术 {} / 通用 {})",
            job_id,
            merged.len(),
            technical_count,
            general_count
        );

        Ok(BankBuildReport {
            job_id: job_id.to_string(),
            total: merged.len(),
            technical: technical_count,
            general: general_count,
            export_path,
        })
    }

    /// 读取岗位题库
    pub async fn load(&self, job_id: &str) -> AppResult<Vec<Question>> {
        let bank = load_bank(&bank_path(&self.dir, job_id))
            .await?
            .ok_or_else(|| BankError::BankNotFound {
                job_id: job_id.to_string(),
            })?;

        if bank.is_empty() {
            return Err(BankError::EmptyBank {
                job_id: job_id.to_string(),
            }
            .into());
        }
        Ok(bank)
    }

    /// 按默认数量抽题
    pub async fn sample_default(&self, job_id: &str) -> AppResult<Vec<Question>> {
        self.sample(job_id, self.settings.n_technical, self.settings.n_general)
            .await
    }

    /// 为一次考试抽题
    pub async fn sample(
        &self,
        job_id: &str,
        n_technical: usize,
        n_general: usize,
    ) -> AppResult<Vec<Question>> {
        let bank = self.load(job_id).await?;
        let picked = stratified_sample(&bank, n_technical, n_general, &mut rand::thread_rng());
        info!("🎲 岗位 {} 抽题 {} 道 (题库 {} 道)", job_id, picked.len(), bank.len());
        Ok(picked)
    }

    /// 重新导出已有题库
    pub async fn export(&self, job_id: &str) -> AppResult<PathBuf> {
        let bank = self.load(job_id).await?;
        self.write_export(job_id, &bank).await
    }

    /// 并发生成多个批次，失败的批次只记录警告
    async fn generate_batches(
        &self,
        topics: &[&str],
        job_text: Option<&str>,
        batch_size: usize,
        tag: QuestionTag,
    ) -> Vec<Question> {
        let results = join_all(
            topics
                .iter()
                .map(|topic| self.generator.generate(topic, job_text, batch_size)),
        )
        .await;

        let mut questions = Vec::new();
        for (topic, result) in topics.iter().zip(results) {
            match result {
                Ok(raw) => {
                    let received = raw.len();
                    let valid: Vec<Question> = raw
                        .into_iter()
                        .filter_map(|r| Question::from_raw(r, tag))
                        .collect();
                    if valid.len() < received {
                        warn!(
                            "⚠️ 批次 [{}] 丢弃 {} 道格式不正确的题目",
                            topic,
                            received - valid.len()
                        );
                    }
                    questions.extend(valid);
                }
                Err(e) => {
                    warn!("⚠️ 批次 [{}] 生成失败，跳过: {}", topic, e);
                }
            }
        }

        dedup_by_text(questions)
    }

    async fn write_export(&self, job_id: &str, questions: &[Question]) -> AppResult<PathBuf> {
        let path = self.dir.join(format!("{}_question_bank.md", job_id));
        tokio::fs::write(&path, render_export(job_id, questions))
            .await
            .map_err(|e| PersistenceError::io(path.display().to_string(), e))?;
        info!("📄 题库导出: {}", path.display());
        Ok(path)
    }
}

/// 分层抽题
///
/// 题库带标签时，技术题与通用题分别无放回抽取 `min(n, 可用数)` 道；
/// 旧题库没有任何标签时，整体无放回抽取 `n_technical + n_general` 道。
/// 结果整体打乱。
pub fn stratified_sample<R: Rng + ?Sized>(
    bank: &[Question],
    n_technical: usize,
    n_general: usize,
    rng: &mut R,
) -> Vec<Question> {
    let tagged = bank.iter().any(|q| q.tag.is_some());

    let mut picked: Vec<Question> = if tagged {
        let technical: Vec<&Question> = bank
            .iter()
            .filter(|q| q.is_tagged(QuestionTag::Technical))
            .collect();
        let general: Vec<&Question> = bank
            .iter()
            .filter(|q| q.is_tagged(QuestionTag::General))
            .collect();

        let mut picked: Vec<Question> = technical
            .choose_multiple(rng, n_technical)
            .map(|q| (*q).clone())
            .collect();
        picked.extend(general.choose_multiple(rng, n_general).map(|q| (*q).clone()));
        picked
    } else {
        bank.choose_multiple(rng, n_technical + n_general)
            .cloned()
            .collect()
    };

    picked.shuffle(rng);
    picked
}

/// 按题干去重，保留先出现的
fn dedup_by_text(questions: impl IntoIterator<Item = Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.text.to_lowercase()))
        .collect()
}

/// 渲染可读导出（Markdown）
pub fn render_export(job_id: &str, questions: &[Question]) -> String {
    let mut out = format!("# Question Bank: {}\n\n", job_id);
    for (i, q) in questions.iter().enumerate() {
        let tag = q.tag.map(|t| t.to_string()).unwrap_or_else(|| "Untagged".to_string());
        out.push_str(&format!("**Q{}.** {} _({})_\n\n", i + 1, q.text, tag));
        for option in &q.options {
            out.push_str(&format!("- {}\n", option));
        }
        out.push_str(&format!("\n**Correct Answer:** {}\n\n", q.answer));
        out.push_str(&format!("{}\n\n", "-".repeat(50)));
    }
    out
}
