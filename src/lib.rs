//! # Proctor Exam
//!
//! 带人脸监考的在线招聘测评系统
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（摄像头连接），只暴露能力
//! - `CameraConnection` - 唯一的帧处理任务持有者，释放即停止
//! - `LandmarkEstimator` - 人脸关键点后端接口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，互不依赖流程
//! - `CredentialStore` - 签发 / 校验访问码
//! - `ViolationDetector` - 逐帧判定违规，带去抖的警告计数
//! - `QuestionBank` - 通用题池、岗位题库、分层抽题
//! - `scorer` - 判分（纯函数）
//! - `Ledger` / `Notifier` - 台账与通知
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次考试"的完整流程
//! - `ExamSession` - Login → Rules → Exam → Terminated / Submitted
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 应用装配、管理命令、会话工厂
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CameraConnection, FaceLandmarks, Frame, LandmarkEstimator, VideoFeed};
pub use models::{ApplicationRecord, ApplicationStatus, Question, QuestionTag, Stage, TestStatus};
pub use orchestrator::{App, Command};
pub use services::{Verdict, ViolationDetector};
pub use workflow::{ExamSession, SessionDeps};
