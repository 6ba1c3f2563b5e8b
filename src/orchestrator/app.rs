//! 应用 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载台账、创建题库 / 访问码 / 通知服务
//! 2. **管理命令**：入围并发码、建题库、导出、试抽题
//! 3. **会话工厂**：为每位候选人创建独立的 `ExamSession`
//!
//! 不做具体业务判断，只负责把能力装配起来并输出统计。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, PersistenceError};
use crate::infrastructure::LandmarkEstimator;
use crate::models::loaders::list_banks;
use crate::models::question::QuestionTag;
use crate::models::record::{ApplicationStatus, Credential, RecordPatch};
use crate::services::question_bank::GENERAL_POOL_ID;
use crate::services::{
    BankBuildReport, CredentialStore, FileLedger, Ledger, LlmQuestionGenerator, Notifier,
    OutboxNotifier, QuestionBank, QuestionGenerator,
};
use crate::utils::logging::{log_startup, truncate_text};
use crate::workflow::{ExamSession, SessionDeps};

/// 管理命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 将申请标记为入围并发送访问码
    Shortlist { record_id: String },
    /// 根据岗位描述文件建题库
    BuildBank { job_id: String, jd_file: PathBuf },
    /// 重新导出题库
    Export { job_id: String },
    /// 试抽一套题，查看组成
    Sample { job_id: String },
    /// 列出已有题库
    Banks,
}

impl Command {
    pub const USAGE: &'static str = "用法:
  proctor_exam shortlist <record_id>
  proctor_exam build-bank <job_id> <jd_file>
  proctor_exam export <job_id>
  proctor_exam sample <job_id>
  proctor_exam banks";

    /// 解析命令行参数（不含程序名）
    pub fn parse(args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = match args.as_slice() {
            ["shortlist", record_id] => Command::Shortlist {
                record_id: record_id.to_string(),
            },
            ["build-bank", job_id, jd_file] => Command::BuildBank {
                job_id: job_id.to_string(),
                jd_file: PathBuf::from(jd_file),
            },
            ["export", job_id] => Command::Export {
                job_id: job_id.to_string(),
            },
            ["sample", job_id] => Command::Sample {
                job_id: job_id.to_string(),
            },
            ["banks"] => Command::Banks,
            _ => bail!("无法识别的命令: {:?}\n{}", args, Self::USAGE),
        };
        Ok(command)
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    ledger: Arc<dyn Ledger>,
    credentials: Arc<CredentialStore>,
    bank: Arc<QuestionBank>,
    notifier: Arc<dyn Notifier>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let ledger_path = config.ledger_path();
        let ledger = FileLedger::open(&ledger_path)
            .with_context(|| format!("无法加载台账: {}", ledger_path.display()))?;

        let generator = Arc::new(LlmQuestionGenerator::new(&config));
        let notifier = Arc::new(OutboxNotifier::new(config.outbox_path()));

        Ok(Self::with_parts(config, Arc::new(ledger), generator, notifier))
    }

    /// 用指定的协作方装配应用
    pub fn with_parts(
        config: Config,
        ledger: Arc<dyn Ledger>,
        generator: Arc<dyn QuestionGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let credentials = Arc::new(CredentialStore::new(
            ledger.clone(),
            config.credential_ttl_hours,
            config.secret_length,
        ));
        let bank = Arc::new(QuestionBank::new(
            config.questions_path(),
            generator,
            config.sampling_settings(),
        ));

        Self {
            config,
            ledger,
            credentials,
            bank,
            notifier,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub fn bank(&self) -> &Arc<QuestionBank> {
        &self.bank
    }

    /// 会话依赖
    pub fn session_deps(&self, landmarks: Option<Arc<dyn LandmarkEstimator>>) -> SessionDeps {
        SessionDeps {
            credentials: self.credentials.clone(),
            bank: self.bank.clone(),
            ledger: self.ledger.clone(),
            landmarks,
            settings: self.config.session_settings(),
        }
    }

    /// 为一位候选人创建新会话
    pub fn new_session(&self, landmarks: Option<Arc<dyn LandmarkEstimator>>) -> ExamSession {
        ExamSession::new(self.session_deps(landmarks))
    }

    /// 入围：更新状态 → 签发访问码 → 通知候选人
    ///
    /// 通知在访问码写入台账之后发送，且每次入围只发送一次
    pub fn shortlist(&self, record_id: &str, now: DateTime<Utc>) -> AppResult<Credential> {
        let record = self
            .ledger
            .find_by_id(record_id)?
            .ok_or_else(|| PersistenceError::RecordNotFound {
                id: record_id.to_string(),
            })?;

        self.ledger
            .update_record(record_id, RecordPatch::status(ApplicationStatus::Shortlisted))?;
        let credential = self.credentials.issue(record_id, now)?;

        if let Err(e) = self.notifier.notify(&record.email, &credential.secret) {
            error!("通知 {} 失败，可重新执行入围以重发: {:#}", record.email, e);
            return Err(AppError::Other(format!("通知发送失败: {}", e)));
        }

        info!(
            "✓ 申请 {} ({} / {}) 已入围并发送访问码",
            record_id, record.email, record.role
        );
        Ok(credential)
    }

    /// 根据岗位描述文件建题库
    pub async fn build_bank(&self, job_id: &str, jd_file: &Path) -> Result<BankBuildReport> {
        let job_text = tokio::fs::read_to_string(jd_file)
            .await
            .with_context(|| format!("无法读取岗位描述: {}", jd_file.display()))?;

        info!("📄 岗位描述: {}", truncate_text(job_text.trim(), 60));
        Ok(self.bank.build_for_job(&job_text, job_id).await?)
    }

    /// 执行管理命令
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Shortlist { record_id } => {
                let credential = self.shortlist(&record_id, Utc::now())?;
                info!(
                    "🔑 访问码签发于 {}，{} 小时内有效",
                    credential.issued_at.format("%Y-%m-%d %H:%M:%S"),
                    self.config.credential_ttl_hours
                );
            }
            Command::BuildBank { job_id, jd_file } => {
                let report = self.build_bank(&job_id, &jd_file).await?;
                info!("{}", "=".repeat(60));
                info!("📊 岗位 {} 题库统计", report.job_id);
                info!(
                    "总计 {} 道 | 技术 {} 道 | 通用 {} 道",
                    report.total, report.technical, report.general
                );
                info!("导出文件: {}", report.export_path.display());
                info!("{}", "=".repeat(60));
            }
            Command::Export { job_id } => {
                let path = self.bank.export(&job_id).await?;
                info!("✓ 已导出: {}", path.display());
            }
            Command::Sample { job_id } => {
                let questions = self.bank.sample_default(&job_id).await?;
                let technical = questions
                    .iter()
                    .filter(|q| q.is_tagged(QuestionTag::Technical))
                    .count();
                info!(
                    "🎲 试抽 {} 道: 技术 {} 道 / 通用 {} 道",
                    questions.len(),
                    technical,
                    questions.len() - technical
                );
                for (i, q) in questions.iter().enumerate() {
                    info!("  {:>2}. {}", i + 1, truncate_text(&q.text, 60));
                }
            }
            Command::Banks => {
                let banks: Vec<String> = list_banks(self.bank.dir())
                    .await?
                    .into_iter()
                    .filter(|id| id != GENERAL_POOL_ID)
                    .collect();
                if banks.is_empty() {
                    info!("⚠️ 还没有任何岗位题库");
                }
                for job_id in banks {
                    info!("📚 {}", job_id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::RawQuestion;
    use crate::models::record::ApplicationRecord;
    use futures::future::BoxFuture;
    use parking_lot::Mutex;

    struct NoGenerator;

    impl QuestionGenerator for NoGenerator {
        fn generate<'a>(
            &'a self,
            _topic: &'a str,
            _job_text: Option<&'a str>,
            _count: usize,
        ) -> BoxFuture<'a, anyhow::Result<Vec<RawQuestion>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    /// 记录通知时访问码是否已经可以登录
    struct RecordingNotifier {
        ledger: Arc<dyn Ledger>,
        sent: Mutex<Vec<(String, String, bool)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, candidate_id: &str, secret: &str) -> anyhow::Result<()> {
            let stored = self
                .ledger
                .find_by_email(candidate_id)?
                .into_iter()
                .any(|r| {
                    r.status == ApplicationStatus::Shortlisted
                        && r.credential.as_ref().map(|c| c.secret.as_str()) == Some(secret)
                });
            self.sent
                .lock()
                .push((candidate_id.to_string(), secret.to_string(), stored));
            Ok(())
        }
    }

    fn app_with(records: Vec<ApplicationRecord>) -> (App, Arc<RecordingNotifier>) {
        let ledger: Arc<dyn Ledger> = Arc::new(FileLedger::in_memory(records));
        let notifier = Arc::new(RecordingNotifier {
            ledger: ledger.clone(),
            sent: Mutex::new(Vec::new()),
        });
        let app = App::with_parts(
            Config::default(),
            ledger,
            Arc::new(NoGenerator),
            notifier.clone(),
        );
        (app, notifier)
    }

    #[test]
    fn test_parse_commands() {
        let args = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();
        assert_eq!(
            Command::parse(&args("shortlist r1")).unwrap(),
            Command::Shortlist {
                record_id: "r1".to_string()
            }
        );
        assert_eq!(
            Command::parse(&args("build-bank acme jd.txt")).unwrap(),
            Command::BuildBank {
                job_id: "acme".to_string(),
                jd_file: PathBuf::from("jd.txt")
            }
        );
        assert!(Command::parse(&args("build-bank acme")).is_err());
        assert!(Command::parse(&[]).is_err());
    }

    #[test]
    fn test_shortlist_notifies_once_after_credential_stored() {
        let (app, notifier) = app_with(vec![ApplicationRecord::new("r1", "a@x.com", "acme")]);

        let credential = app.shortlist("r1", Utc::now()).unwrap();

        let sent = notifier.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], ("a@x.com".to_string(), credential.secret.clone(), true));
        drop(sent);

        let record = app.ledger().find_by_id("r1").unwrap().unwrap();
        assert_eq!(record.status, ApplicationStatus::Shortlisted);
    }

    #[test]
    fn test_shortlist_unknown_record() {
        let (app, notifier) = app_with(Vec::new());
        assert!(matches!(
            app.shortlist("ghost", Utc::now()),
            Err(AppError::Persistence(PersistenceError::RecordNotFound { .. }))
        ));
        assert!(notifier.sent.lock().is_empty());
    }
}
