//! 违规检测服务 - 业务能力层
//!
//! 只负责"这一帧是否违规、是否计入警告"，不决定考试是否终止。
//!
//! ## 流程
//! 1. 每隔 `frame_stride` 帧取一帧做关键点估计
//! 2. 0 张脸 → NoFace；多张脸 → MultipleFaces；1 张脸 → 按视线比例判断左右
//! 3. 违规时按去抖窗口计数：距上次计数不足 `debounce` 的违规被忽略
//!
//! 帧回调运行在摄像头任务里，会话控制循环只读取 `warn_count()`，
//! 两边通过同一把锁访问 `ViolationState`。

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::DetectorSettings;
use crate::error::DetectorError;
use crate::infrastructure::{FaceLandmarks, Frame, FrameProcessor, LandmarkEstimator};

/// 单帧（或单次外部信号）的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Secure,
    NoFace,
    MultipleFaces,
    LookingLeft,
    LookingRight,
    /// 页面失焦 / 切换标签页
    FocusLost,
}

impl Verdict {
    pub fn is_violation(self) -> bool {
        self != Verdict::Secure
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Secure => "正常",
            Verdict::NoFace => "未检测到人脸",
            Verdict::MultipleFaces => "检测到多张人脸",
            Verdict::LookingLeft => "视线偏左",
            Verdict::LookingRight => "视线偏右",
            Verdict::FocusLost => "离开考试页面",
        }
    }
}

/// 检测器状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationState {
    pub warn_count: u32,
    pub last_violation_at: Option<DateTime<Utc>>,
    pub frame_counter: u64,
}

/// 违规检测器
///
/// 一个实例只服务一次考试，从规则页打开摄像头时创建，考试结束时随摄像头一起释放
pub struct ViolationDetector {
    state: Mutex<ViolationState>,
    estimator: Option<Arc<dyn LandmarkEstimator>>,
    degraded: AtomicBool,
    settings: DetectorSettings,
}

impl ViolationDetector {
    /// 创建检测器
    ///
    /// `estimator` 为 `None` 时直接以直通模式运行
    pub fn new(estimator: Option<Arc<dyn LandmarkEstimator>>, mut settings: DetectorSettings) -> Self {
        // 步长至少为 1（每帧都检测）
        settings.frame_stride = settings.frame_stride.max(1);
        if estimator.is_none() {
            warn!("⚠️ 未配置人脸关键点后端，违规检测以直通模式运行");
        }
        Self {
            state: Mutex::new(ViolationState::default()),
            degraded: AtomicBool::new(estimator.is_none()),
            estimator,
            settings,
        }
    }

    /// 根据检测到的人脸判定
    pub fn classify(faces: &[FaceLandmarks], settings: &DetectorSettings) -> Verdict {
        match faces {
            [] => Verdict::NoFace,
            [face] => {
                let ratio = face.gaze_ratio();
                if ratio < settings.look_left_ratio {
                    Verdict::LookingLeft
                } else if ratio > settings.look_right_ratio {
                    Verdict::LookingRight
                } else {
                    Verdict::Secure
                }
            }
            _ => Verdict::MultipleFaces,
        }
    }

    /// 处理一帧（使用给定时间，便于测试）
    ///
    /// 任何单帧错误都被吞掉，原样返回该帧
    pub fn process_frame_at(&self, mut frame: Frame, now: DateTime<Utc>) -> Frame {
        let counter = {
            let mut state = self.state.lock();
            let current = state.frame_counter;
            state.frame_counter += 1;
            current
        };

        if counter % self.settings.frame_stride != 0 || self.is_degraded() {
            return frame;
        }
        let Some(estimator) = &self.estimator else {
            return frame;
        };

        let estimated = catch_unwind(AssertUnwindSafe(|| estimator.estimate(&frame)))
            .unwrap_or_else(|_| {
                Err(DetectorError::FrameRejected {
                    seq: frame.seq,
                    reason: "关键点后端发生 panic".to_string(),
                })
            });

        match estimated {
            Ok(faces) => {
                let verdict = Self::classify(&faces, &self.settings);
                if verdict.is_violation() {
                    let counted = self.record_violation_at(verdict, now);
                    frame.overlay = Some(format!(
                        "⚠ {} (警告 {})",
                        verdict.label(),
                        self.warn_count()
                    ));
                    if counted {
                        debug!("帧 {} 计入警告: {}", frame.seq, verdict.label());
                    }
                }
            }
            Err(DetectorError::BackendUnavailable(reason)) => {
                self.degrade(&reason);
            }
            Err(e) => {
                debug!("跳过该帧: {}", e);
            }
        }

        frame
    }

    /// 记录一次违规（带去抖）
    ///
    /// 返回是否计入警告
    pub fn record_violation_at(&self, verdict: Verdict, now: DateTime<Utc>) -> bool {
        if !verdict.is_violation() {
            return false;
        }

        let mut state = self.state.lock();
        let due = match state.last_violation_at {
            Some(last) => now - last >= self.settings.debounce,
            None => true,
        };
        if !due {
            return false;
        }

        state.warn_count += 1;
        state.last_violation_at = Some(now);
        info!("🚨 违规警告 #{}: {}", state.warn_count, verdict.label());
        true
    }

    /// 当前警告数（供控制循环轮询）
    pub fn warn_count(&self) -> u32 {
        self.state.lock().warn_count
    }

    pub fn snapshot(&self) -> ViolationState {
        *self.state.lock()
    }

    /// 是否已降级为直通模式
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    fn degrade(&self, reason: &str) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            warn!("⚠️ 关键点后端不可用，违规检测降级为直通: {}", reason);
        }
    }
}

impl FrameProcessor for ViolationDetector {
    fn process(&self, frame: Frame) -> Frame {
        self.process_frame_at(frame, Utc::now())
    }
}
