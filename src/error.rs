use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 认证错误
    #[error("认证失败: {0}")]
    Auth(#[from] AuthError),
    /// 题库错误
    #[error("题库错误: {0}")]
    Bank(#[from] BankError),
    /// 持久化错误
    #[error("保存失败: {0}")]
    Persistence(#[from] PersistenceError),
    /// 考试会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 访问码认证错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// 邮箱下没有任何申请记录
    #[error("未找到该邮箱的申请记录")]
    NotFound,
    /// 没有记录的访问码与输入一致
    #[error("访问码不正确")]
    BadCredential,
    /// 找到记录但未进入候选名单
    #[error("该申请未进入候选名单")]
    NotEligible,
    /// 访问码已超过有效期
    #[error("访问码已过期")]
    Expired,
    /// 该申请的考试已经结束（交卷或被终止）
    #[error("该访问码对应的考试已经结束")]
    AttemptUsed,
}

impl AuthError {
    /// 展示给候选人的提示
    ///
    /// NotFound 与 BadCredential 使用同一句提示，不暴露邮箱是否存在
    pub fn user_message(self) -> &'static str {
        match self {
            AuthError::NotFound | AuthError::BadCredential => "邮箱或访问码无效，请检查后重试",
            AuthError::NotEligible => "该申请当前没有考试资格",
            AuthError::Expired => "访问码已过期，请联系招聘方重新获取",
            AuthError::AttemptUsed => "该访问码的考试已经结束，不能再次进入",
        }
    }
}

/// 违规检测错误
///
/// 只在检测器内部流转，检测器会降级为直通模式，不会让考试失败
#[derive(Debug, Error)]
pub enum DetectorError {
    /// 人脸关键点后端不可用
    #[error("人脸关键点后端不可用: {0}")]
    BackendUnavailable(String),
    /// 单帧处理失败
    #[error("帧 {seq} 处理失败: {reason}")]
    FrameRejected { seq: u64, reason: String },
}

/// 题库生成/读取错误
#[derive(Debug, Error)]
pub enum BankError {
    /// 所有批次都生成失败
    #[error("题目生成全部失败 (岗位: {job_id})")]
    AllBatchesFailed { job_id: String },
    /// 通用题池生成失败
    #[error("通用题池生成失败")]
    GeneralPoolUnavailable,
    /// 岗位题库不存在
    #[error("岗位 {job_id} 的题库不存在")]
    BankNotFound { job_id: String },
    /// 岗位题库为空
    #[error("岗位 {job_id} 的题库为空")]
    EmptyBank { job_id: String },
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 文件读写失败
    #[error("文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 序列化/反序列化失败
    #[error("数据格式错误 ({path}): {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    /// 记录不存在
    #[error("记录 {id} 不存在")]
    RecordNotFound { id: String },
    /// 考试结果已写入，不允许改写
    #[error("记录 {id} 的考试结果已是 {existing}，不允许改写")]
    OutcomeLocked { id: String, existing: String },
}

/// 考试会话错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 当前阶段不允许该操作
    #[error("当前阶段 {actual} 不允许该操作 (需要: {expected})")]
    WrongStage { expected: String, actual: String },
    /// 摄像头尚未收到画面
    #[error("摄像头尚未连接，请等待画面出现后再开始")]
    CameraNotReady,
    /// 摄像头已经打开
    #[error("摄像头已经打开")]
    CameraAlreadyOpen,
    /// 已达到警告上限，等待终止记录写入
    #[error("警告次数已达上限，考试正在终止")]
    TerminationPending,
    /// 题号超出范围
    #[error("题号 {index} 超出范围 [0, {len})")]
    QuestionOutOfRange { index: usize, len: usize },
    /// 选项不属于该题
    #[error("选项 '{option}' 不属于第 {index} 题")]
    UnknownOption { index: usize, option: String },
    /// 没有进行中的考试
    #[error("没有进行中的考试")]
    NoActiveAttempt,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("配置文件 {path} 解析失败: {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 返回内容中找不到题目 JSON
    #[error("LLM返回内容中没有题目列表: {preview}")]
    NoQuestionList { preview: String },
    /// 题目 JSON 解析失败
    #[error("题目JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: serde_json::Error,
    },
}

// ========== 便捷构造函数 ==========

impl PersistenceError {
    /// 创建文件读写错误
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建序列化错误
    pub fn serialize(path: impl Into<String>, source: serde_json::Error) -> Self {
        PersistenceError::Serialize {
            path: path.into(),
            source,
        }
    }
}

impl SessionError {
    /// 创建阶段错误
    pub fn wrong_stage(expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        SessionError::WrongStage {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
