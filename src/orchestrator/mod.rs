//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 管理应用生命周期，装配各层能力，执行管理命令。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (装配 / 管理命令 / 会话工厂)
//!     ↓
//! workflow::ExamSession (一次考试的完整流程)
//!     ↓
//! services (能力层：访问码 / 题库 / 检测 / 判分 / 台账 / 通知)
//!     ↓
//! infrastructure (基础设施：摄像头连接、关键点后端)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：摄像头只由会话持有，编排层不接触视频帧
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做装配和统计，不做具体业务判断

pub mod app;

pub use app::{App, Command};
