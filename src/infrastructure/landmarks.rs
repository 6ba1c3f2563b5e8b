//! 视频帧与人脸关键点 - 基础设施层
//!
//! 关键点估计是可替换的后端，这里只定义契约

use crate::error::DetectorError;

/// 一帧视频画面
///
/// 编码方式由视频传输方决定，这里只当作不透明字节处理
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 传输方给出的帧序号
    pub seq: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// 叠加在画面上的提示文字（检测器写入）
    pub overlay: Option<String>,
}

impl Frame {
    pub fn new(seq: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            seq,
            width,
            height,
            data,
            overlay: None,
        }
    }

    /// 空白帧（测试和占位用）
    pub fn blank(seq: u64) -> Self {
        Self::new(seq, 0, 0, Vec::new())
    }
}

/// 单张人脸的关键点（只用到水平坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceLandmarks {
    pub nose_x: f32,
    pub left_ear_x: f32,
    pub right_ear_x: f32,
}

impl FaceLandmarks {
    pub fn new(nose_x: f32, left_ear_x: f32, right_ear_x: f32) -> Self {
        Self {
            nose_x,
            left_ear_x,
            right_ear_x,
        }
    }

    /// 水平视线比例 |鼻-左耳| / (|鼻-右耳| + ε)
    pub fn gaze_ratio(&self) -> f32 {
        const EPSILON: f32 = 1e-6;
        (self.nose_x - self.left_ear_x).abs() / ((self.nose_x - self.right_ear_x).abs() + EPSILON)
    }
}

/// 人脸关键点估计后端
///
/// 返回画面中检测到的所有人脸。后端整体不可用时返回
/// `DetectorError::BackendUnavailable`，检测器随即降级为直通。
pub trait LandmarkEstimator: Send + Sync {
    fn estimate(&self, frame: &Frame) -> Result<Vec<FaceLandmarks>, DetectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaze_ratio_centered() {
        let face = FaceLandmarks::new(0.5, 0.3, 0.7);
        assert!((face.gaze_ratio() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_gaze_ratio_nose_on_right_ear() {
        // 分母只剩 ε，比例非常大但不会除零
        let face = FaceLandmarks::new(0.7, 0.3, 0.7);
        assert!(face.gaze_ratio() > 2.0);
        assert!(face.gaze_ratio().is_finite());
    }
}
