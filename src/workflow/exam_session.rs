//! 考试会话 - 流程层
//!
//! 核心职责：定义"一次考试"的完整流程
//!
//! 阶段顺序：
//! 1. Login：校验邮箱 + 访问码
//! 2. Rules：展示规则、打开摄像头，候选人确认后进入考试
//! 3. Exam：抽题一次，每次刷新轮询警告数
//! 4. Terminated / Submitted：写入结果、释放摄像头，只能回到 Login
//!
//! 会话持有检测器和摄像头，从 Rules 一直活到终态；任何离开路径都会释放摄像头。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::SessionSettings;
use crate::error::{AppResult, SessionError};
use crate::infrastructure::{CameraConnection, FrameProcessor, LandmarkEstimator, VideoFeed};
use crate::models::attempt::{ExamAttempt, Stage};
use crate::models::question::Question;
use crate::models::record::RecordPatch;
use crate::services::ledger::Ledger;
use crate::services::violation_detector::{Verdict, ViolationDetector};
use crate::services::{scorer, CredentialStore, QuestionBank};

/// 会话依赖的业务能力
#[derive(Clone)]
pub struct SessionDeps {
    pub credentials: Arc<CredentialStore>,
    pub bank: Arc<QuestionBank>,
    pub ledger: Arc<dyn Ledger>,
    /// 人脸关键点后端（`None` 时检测器以直通模式运行）
    pub landmarks: Option<Arc<dyn LandmarkEstimator>>,
    pub settings: SessionSettings,
}

/// 考试会话
///
/// - 不使用任何全局状态，一个值对应一位候选人的一次会话
/// - 检测器在 Rules 阶段创建，进入 Exam 后沿用同一实例
/// - 只通过轮询读取警告数，检测器不会主动改变会话阶段
pub struct ExamSession {
    deps: SessionDeps,
    stage: Stage,
    attempt: Option<ExamAttempt>,
    detector: Option<Arc<ViolationDetector>>,
    camera: Option<CameraConnection>,
    last_seen_warnings: u32,
    termination_pending: bool,
}

impl ExamSession {
    pub fn new(deps: SessionDeps) -> Self {
        Self {
            deps,
            stage: Stage::Login,
            attempt: None,
            detector: None,
            camera: None,
            last_seen_warnings: 0,
            termination_pending: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn attempt(&self) -> Option<&ExamAttempt> {
        self.attempt.as_ref()
    }

    /// 本次考试的题目（进入 Exam 后固定）
    pub fn questions(&self) -> &[Question] {
        self.attempt
            .as_ref()
            .map(|a| a.sampled_questions.as_slice())
            .unwrap_or(&[])
    }

    pub fn detector(&self) -> Option<&Arc<ViolationDetector>> {
        self.detector.as_ref()
    }

    pub fn warn_count(&self) -> u32 {
        self.detector.as_ref().map(|d| d.warn_count()).unwrap_or(0)
    }

    /// 摄像头是否处于打开状态
    pub fn camera_open(&self) -> bool {
        self.camera.as_ref().map(|c| !c.is_released()).unwrap_or(false)
    }

    /// 规则页文字
    pub fn rules_text(&self) -> String {
        let s = &self.deps.settings;
        let sampling = self.deps.bank.settings();
        let count = match self.questions().len() {
            0 => format!("最多 {} 道", sampling.n_technical + sampling.n_general),
            n => format!("共 {} 道", n),
        };
        format!(
            "考试规则:\n\
             1. 考试时长 {} 分钟，{}单选题。\n\
             2. 全程保持摄像头开启，画面中只能有你一个人。\n\
             3. 不要离开画面或长时间向左右张望。\n\
             4. 不要切换窗口或离开考试页面。\n\
             5. 累计 {} 次警告将自动终止考试，并记录为违规。",
            s.exam_duration_minutes,
            count,
            s.warn_threshold
        )
    }

    /// 登录
    ///
    /// 成功后进入 Rules，不产生任何持久化副作用
    pub fn login(&mut self, email: &str, secret: &str, now: DateTime<Utc>) -> AppResult<()> {
        self.expect_stage(Stage::Login)?;

        let seed = self.deps.credentials.validate(email, secret, now)?;
        info!("{} 登录成功，进入规则页", seed);

        self.attempt = Some(ExamAttempt::new(seed));
        self.stage = Stage::Rules;
        Ok(())
    }

    /// 打开摄像头（Rules 阶段）
    ///
    /// 检测器只创建一次；视频流断开后可以重新打开，警告数保留
    pub fn open_camera(&mut self, feed: VideoFeed) -> AppResult<()> {
        self.expect_stage(Stage::Rules)?;
        if self.camera_open() {
            return Err(SessionError::CameraAlreadyOpen.into());
        }

        let settings = self.deps.settings.detector.clone();
        let landmarks = self.deps.landmarks.clone();
        let detector = self
            .detector
            .get_or_insert_with(|| Arc::new(ViolationDetector::new(landmarks, settings)))
            .clone();

        let processor: Arc<dyn FrameProcessor> = detector;
        self.camera = Some(CameraConnection::open(feed, processor));
        Ok(())
    }

    /// 等待摄像头收到第一帧
    pub async fn wait_for_camera(&self, timeout: Duration) -> bool {
        match &self.camera {
            Some(camera) => camera.wait_until_live(timeout).await,
            None => false,
        }
    }

    /// 确认规则，进入考试
    ///
    /// 摄像头必须已经收到画面；题目只在第一次进入时抽取
    pub async fn acknowledge_rules(&mut self) -> AppResult<Stage> {
        self.expect_stage(Stage::Rules)?;

        let camera_live = self.camera.as_ref().map(|c| c.is_live()).unwrap_or(false);
        if !camera_live || self.detector.is_none() {
            return Err(SessionError::CameraNotReady.into());
        }

        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveAttempt)?;
        if attempt.sampled_questions.is_empty() {
            let questions = self.deps.bank.sample_default(&attempt.seed.job_id).await?;
            info!("{} 📋 已抽取 {} 道题目", attempt.seed, questions.len());
            attempt.sampled_questions = questions;
        }

        self.stage = Stage::Exam;
        info!("{} ✓ 已确认规则，考试开始", attempt.seed);

        // 规则页期间累计的警告同样计入
        self.tick()
    }

    /// 控制循环的一次刷新
    ///
    /// 读取检测器的警告数，达到上限时终止考试。终止记录写入成功后阶段才变为 Terminated，
    /// 写入失败时保持等待状态，下一次刷新重试。
    pub fn tick(&mut self) -> AppResult<Stage> {
        if self.stage != Stage::Exam {
            return Ok(self.stage);
        }

        let warnings = self.warn_count();
        if warnings > self.last_seen_warnings {
            debug!("警告数变化: {} → {}", self.last_seen_warnings, warnings);
            self.last_seen_warnings = warnings;
        }

        if self.termination_pending || warnings >= self.deps.settings.warn_threshold {
            self.terminate(warnings)?;
        }
        Ok(self.stage)
    }

    /// 记录一次切屏 / 失去焦点
    ///
    /// 与画面违规共用去抖和上限；返回是否计入警告
    pub fn report_focus_lost(&mut self, now: DateTime<Utc>) -> AppResult<bool> {
        self.tick()?;
        self.expect_stage(Stage::Exam)?;

        let detector = self.detector.as_ref().ok_or(SessionError::CameraNotReady)?;
        let counted = detector.record_violation_at(Verdict::FocusLost, now);
        self.tick()?;
        Ok(counted)
    }

    /// 作答
    ///
    /// # 参数
    /// - `index`: 题号（从 0 开始）
    /// - `option`: 所选选项原文
    pub fn answer(&mut self, index: usize, option: &str) -> AppResult<()> {
        self.tick()?;
        if self.termination_pending {
            return Err(SessionError::TerminationPending.into());
        }
        self.expect_stage(Stage::Exam)?;

        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveAttempt)?;
        let len = attempt.sampled_questions.len();
        let question = attempt
            .sampled_questions
            .get(index)
            .ok_or(SessionError::QuestionOutOfRange { index, len })?;

        if !question.options.iter().any(|o| o == option) {
            return Err(SessionError::UnknownOption {
                index,
                option: option.to_string(),
            }
            .into());
        }

        attempt.answers.insert(index, option.to_string());
        Ok(())
    }

    /// 交卷
    ///
    /// 写入成绩成功后进入 Submitted 并释放摄像头；写入失败时停留在 Exam，可再次交卷
    pub fn submit(&mut self) -> AppResult<u32> {
        self.tick()?;
        if self.termination_pending {
            return Err(SessionError::TerminationPending.into());
        }
        self.expect_stage(Stage::Exam)?;

        let warnings = self.warn_count();
        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveAttempt)?;
        let raw_score = scorer::score(&attempt.sampled_questions, &attempt.answers);
        let passed = raw_score >= self.deps.settings.aptitude_threshold;

        if let Err(e) = self.deps.ledger.update_record(
            &attempt.seed.record_id,
            RecordPatch::completed(raw_score, passed),
        ) {
            error!("{} 成绩保存失败: {}", attempt.seed, e);
            return Err(e.into());
        }

        attempt.raw_score = Some(raw_score);
        attempt.warn_count_at_end = Some(warnings);
        info!(
            "{} ✓ 已交卷: {}/{} (答题 {} 道, 警告 {} 次, 能力测评{})",
            attempt.seed,
            raw_score,
            attempt.sampled_questions.len(),
            attempt.answered_count(),
            warnings,
            if passed { "通过" } else { "未通过" }
        );

        self.stage = Stage::Submitted;
        self.release_camera();
        Ok(raw_score)
    }

    /// 退出登录
    ///
    /// 任何阶段都可以调用：释放摄像头，丢弃未保存的进度，回到 Login。
    /// 若考试应被终止，先写入终止记录；写入失败时摄像头照样释放，但会话停在等待终止的状态，
    /// 再次刷新或退出时重试。
    pub fn logout(&mut self) -> AppResult<()> {
        let settled = self.tick();
        self.release_camera();
        if let Err(e) = settled {
            if let Some(attempt) = &self.attempt {
                error!("{} 🚨 终止记录未能写入，暂不退出: {}", attempt.seed, e);
            }
            return Err(e);
        }

        if let Some(attempt) = self.attempt.take() {
            info!("{} 已退出 (阶段: {})", attempt.seed, self.stage);
        }
        self.detector = None;
        self.last_seen_warnings = 0;
        self.termination_pending = false;
        self.stage = Stage::Login;
        Ok(())
    }

    fn terminate(&mut self, warnings: u32) -> AppResult<()> {
        let attempt = self.attempt.as_mut().ok_or(SessionError::NoActiveAttempt)?;
        if !self.termination_pending {
            warn!(
                "{} 🚨 警告 {} 次，已达上限，终止考试",
                attempt.seed, warnings
            );
            self.termination_pending = true;
            attempt.answers.clear();
            self.deps.credentials.revoke(&attempt.seed.record_id);
        }

        if let Err(e) = self
            .deps
            .ledger
            .update_record(&attempt.seed.record_id, RecordPatch::terminated())
        {
            error!("{} 终止记录写入失败，将在下次刷新重试: {}", attempt.seed, e);
            return Err(e.into());
        }

        attempt.warn_count_at_end = Some(warnings);
        self.termination_pending = false;
        self.stage = Stage::Terminated;
        info!("{} 考试已终止 (违规)", attempt.seed);
        self.release_camera();
        Ok(())
    }

    fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), SessionError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(SessionError::wrong_stage(expected, self.stage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingSettings;
    use crate::error::{AppError, AuthError, PersistenceError};
    use crate::infrastructure::Frame;
    use crate::models::loaders::{bank_path, save_bank};
    use crate::models::question::{QuestionTag, RawQuestion};
    use crate::models::record::{
        ApplicationRecord, ApplicationStatus, Credential, TestStatus,
    };
    use crate::services::{FileLedger, QuestionGenerator};
    use chrono::Duration as ChronoDuration;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    struct NoGenerator;

    impl QuestionGenerator for NoGenerator {
        fn generate<'a>(
            &'a self,
            _topic: &'a str,
            _job_text: Option<&'a str>,
            _count: usize,
        ) -> BoxFuture<'a, anyhow::Result<Vec<RawQuestion>>> {
            Box::pin(async { anyhow::bail!("offline") })
        }
    }

    /// 可以切换为"写入失败"的台账
    struct FlakyLedger {
        inner: FileLedger,
        failing: AtomicBool,
    }

    impl Ledger for FlakyLedger {
        fn find_by_email(&self, email: &str) -> Result<Vec<ApplicationRecord>, PersistenceError> {
            self.inner.find_by_email(email)
        }
        fn find_by_id(&self, id: &str) -> Result<Option<ApplicationRecord>, PersistenceError> {
            self.inner.find_by_id(id)
        }
        fn insert_record(&self, record: ApplicationRecord) -> Result<(), PersistenceError> {
            self.inner.insert_record(record)
        }
        fn update_record(&self, id: &str, patch: RecordPatch) -> Result<(), PersistenceError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(PersistenceError::io(
                    "ledger",
                    std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                ));
            }
            self.inner.update_record(id, patch)
        }
        fn secret_in_use(&self, secret: &str) -> Result<bool, PersistenceError> {
            self.inner.secret_in_use(secret)
        }
    }

    struct Fixture {
        session: ExamSession,
        deps: SessionDeps,
        ledger: Arc<FlakyLedger>,
        frames: mpsc::Sender<Frame>,
        _dir: tempfile::TempDir,
    }

    const SECRET: &str = "ABC234";

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let questions: Vec<Question> = (0..30)
            .map(|i| Question {
                text: format!("Question {}", i),
                options: vec![format!("correct {}", i), format!("wrong {}", i)],
                answer: format!("correct {}", i),
                tag: Some(if i < 20 {
                    QuestionTag::Technical
                } else {
                    QuestionTag::General
                }),
            })
            .collect();
        save_bank(&bank_path(dir.path(), "acme"), &questions)
            .await
            .unwrap();

        let mut record = ApplicationRecord::new("r1", "dev@x.com", "acme")
            .with_status(ApplicationStatus::Shortlisted);
        record.credential = Some(Credential {
            subject_id: "r1".to_string(),
            secret: SECRET.to_string(),
            issued_at: Utc::now(),
        });
        let ledger = Arc::new(FlakyLedger {
            inner: FileLedger::in_memory(vec![record]),
            failing: AtomicBool::new(false),
        });

        let deps = SessionDeps {
            credentials: Arc::new(CredentialStore::new(ledger.clone(), 30, 6)),
            bank: Arc::new(QuestionBank::new(
                dir.path(),
                Arc::new(NoGenerator),
                SamplingSettings::default(),
            )),
            ledger: ledger.clone(),
            landmarks: None,
            settings: SessionSettings::default(),
        };

        let (tx, _rx) = mpsc::channel(8);
        Fixture {
            session: ExamSession::new(deps.clone()),
            deps,
            ledger,
            frames: tx,
            _dir: dir,
        }
    }

    /// 登录并打开摄像头，推送一帧使连接建立
    async fn into_rules(fx: &mut Fixture) {
        fx.session.login("dev@x.com", SECRET, Utc::now()).unwrap();
        let (tx, rx) = mpsc::channel(8);
        fx.session.open_camera(VideoFeed::new(rx)).unwrap();
        tx.send(Frame::blank(0)).await.unwrap();
        assert!(fx.session.wait_for_camera(Duration::from_secs(2)).await);
        fx.frames = tx;
    }

    async fn into_exam(fx: &mut Fixture) {
        into_rules(fx).await;
        assert_eq!(fx.session.acknowledge_rules().await.unwrap(), Stage::Exam);
    }

    fn push_warnings(session: &ExamSession, n: u32) {
        let detector = session.detector().unwrap().clone();
        let t0 = Utc::now();
        for i in 0..n {
            detector.record_violation_at(
                Verdict::MultipleFaces,
                t0 + ChronoDuration::seconds(5 * i as i64),
            );
        }
    }

    fn stored(fx: &Fixture) -> ApplicationRecord {
        fx.ledger.find_by_id("r1").unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_login_failure_stays_on_login() {
        let mut fx = fixture().await;
        let err = fx.session.login("dev@x.com", "WRONG1", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(fx.session.stage(), Stage::Login);
    }

    #[tokio::test]
    async fn test_cannot_start_without_live_camera() {
        let mut fx = fixture().await;
        fx.session.login("dev@x.com", SECRET, Utc::now()).unwrap();

        assert!(matches!(
            fx.session.acknowledge_rules().await,
            Err(AppError::Session(SessionError::CameraNotReady))
        ));

        // 打开了但还没有画面
        let (_tx, rx) = mpsc::channel(8);
        fx.session.open_camera(VideoFeed::new(rx)).unwrap();
        assert!(matches!(
            fx.session.acknowledge_rules().await,
            Err(AppError::Session(SessionError::CameraNotReady))
        ));
        assert_eq!(fx.session.stage(), Stage::Rules);
    }

    #[tokio::test]
    async fn test_questions_sampled_once() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;

        let first: Vec<String> = fx.session.questions().iter().map(|q| q.text.clone()).collect();
        assert_eq!(first.len(), 30);
        fx.session.tick().unwrap();
        fx.session.tick().unwrap();
        let again: Vec<String> = fx.session.questions().iter().map(|q| q.text.clone()).collect();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn test_rules_warnings_carry_into_exam() {
        let mut fx = fixture().await;
        into_rules(&mut fx).await;
        let detector = fx.session.detector().unwrap().clone();
        push_warnings(&fx.session, 2);

        fx.session.acknowledge_rules().await.unwrap();
        assert!(Arc::ptr_eq(&detector, fx.session.detector().unwrap()));
        assert_eq!(fx.session.warn_count(), 2);
    }

    #[tokio::test]
    async fn test_threshold_terminates_and_blocks_answers() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;

        let option = fx.session.questions()[0].options[0].clone();
        fx.session.answer(0, &option).unwrap();

        push_warnings(&fx.session, 5);
        assert_eq!(fx.session.tick().unwrap(), Stage::Terminated);
        assert!(!fx.session.camera_open());
        assert_eq!(stored(&fx).test_status, Some(TestStatus::TerminatedMalpractice));
        assert!(fx.session.attempt().unwrap().answers.is_empty());

        assert!(matches!(
            fx.session.answer(1, &option),
            Err(AppError::Session(SessionError::WrongStage { .. }))
        ));
        assert!(fx.session.submit().is_err());
    }

    #[tokio::test]
    async fn test_termination_persists_before_visible() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        fx.ledger.failing.store(true, Ordering::SeqCst);

        push_warnings(&fx.session, 5);
        assert!(fx.session.tick().is_err());
        assert_eq!(fx.session.stage(), Stage::Exam);
        let option = fx.session.questions()[0].options[0].clone();
        assert!(fx.session.answer(0, &option).is_err());

        fx.ledger.failing.store(false, Ordering::SeqCst);
        assert_eq!(fx.session.tick().unwrap(), Stage::Terminated);
        assert_eq!(stored(&fx).test_status, Some(TestStatus::TerminatedMalpractice));
    }

    #[tokio::test]
    async fn test_focus_loss_counts_toward_threshold() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        push_warnings(&fx.session, 4);

        let later = Utc::now() + ChronoDuration::minutes(5);
        assert!(fx.session.report_focus_lost(later).unwrap());
        assert_eq!(fx.session.stage(), Stage::Terminated);
    }

    #[tokio::test]
    async fn test_submit_persists_score() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;

        let answers: Vec<String> = fx.session.questions().iter().map(|q| q.answer.clone()).collect();
        for (i, answer) in answers.iter().enumerate() {
            fx.session.answer(i, answer).unwrap();
        }
        assert!(matches!(
            fx.session.answer(0, "not an option"),
            Err(AppError::Session(SessionError::UnknownOption { .. }))
        ));

        assert_eq!(fx.session.submit().unwrap(), 30);
        assert_eq!(fx.session.stage(), Stage::Submitted);
        assert!(!fx.session.camera_open());

        let record = stored(&fx);
        assert_eq!(record.test_status, Some(TestStatus::Completed));
        assert_eq!(record.test_score, Some(30));
        assert_eq!(record.aptitude_passed, Some(true));
    }

    #[tokio::test]
    async fn test_submit_failure_can_retry() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        fx.ledger.failing.store(true, Ordering::SeqCst);
        assert!(matches!(fx.session.submit(), Err(AppError::Persistence(_))));
        assert_eq!(fx.session.stage(), Stage::Exam);

        fx.ledger.failing.store(false, Ordering::SeqCst);
        assert_eq!(fx.session.submit().unwrap(), 0);
        assert_eq!(stored(&fx).aptitude_passed, Some(false));
    }

    #[tokio::test]
    async fn test_logout_releases_camera_from_any_stage() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        assert!(fx.session.camera_open());

        fx.session.logout().unwrap();
        assert_eq!(fx.session.stage(), Stage::Login);
        assert!(!fx.session.camera_open());
        assert!(fx.session.attempt().is_none());
        assert_eq!(fx.session.warn_count(), 0);
        assert!(stored(&fx).test_status.is_none());
    }

    fn assert_attempt_used(result: AppResult<()>) {
        assert!(
            matches!(result, Err(AppError::Auth(AuthError::AttemptUsed))),
            "expected AttemptUsed, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_no_retake_after_termination() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        push_warnings(&fx.session, 5);
        assert_eq!(fx.session.tick().unwrap(), Stage::Terminated);

        fx.session.logout().unwrap();
        assert_attempt_used(fx.session.login("dev@x.com", SECRET, Utc::now()));
        assert_eq!(fx.session.stage(), Stage::Login);
        assert_eq!(stored(&fx).test_status, Some(TestStatus::TerminatedMalpractice));
    }

    #[tokio::test]
    async fn test_no_retake_after_submit() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        let first = fx.session.questions()[0].answer.clone();
        fx.session.answer(0, &first).unwrap();
        assert_eq!(fx.session.submit().unwrap(), 1);

        fx.session.logout().unwrap();
        assert_attempt_used(fx.session.login("dev@x.com", SECRET, Utc::now()));
        assert_eq!(stored(&fx).test_score, Some(1));
    }

    #[tokio::test]
    async fn test_logout_keeps_pending_termination() {
        let mut fx = fixture().await;
        into_exam(&mut fx).await;
        fx.ledger.failing.store(true, Ordering::SeqCst);
        push_warnings(&fx.session, 5);
        assert!(fx.session.tick().is_err());

        // 写入失败：摄像头释放，但终止不会被丢弃
        assert!(matches!(fx.session.logout(), Err(AppError::Persistence(_))));
        assert!(!fx.session.camera_open());
        assert_eq!(fx.session.stage(), Stage::Exam);
        let option = fx.session.questions()[0].options[0].clone();
        assert!(fx.session.answer(0, &option).is_err());

        // 另开一个会话也无法用同一访问码重新登录
        let mut other = ExamSession::new(fx.deps.clone());
        assert_attempt_used(other.login("dev@x.com", SECRET, Utc::now()));

        fx.ledger.failing.store(false, Ordering::SeqCst);
        fx.session.logout().unwrap();
        assert_eq!(fx.session.stage(), Stage::Login);
        assert_eq!(stored(&fx).test_status, Some(TestStatus::TerminatedMalpractice));
    }

    #[tokio::test]
    async fn test_rules_show_actual_question_count() {
        let mut fx = fixture().await;
        into_rules(&mut fx).await;
        assert!(fx.session.rules_text().contains("最多 40 道"));

        fx.session.acknowledge_rules().await.unwrap();
        assert!(fx.session.rules_text().contains("共 30 道"));
    }
}
