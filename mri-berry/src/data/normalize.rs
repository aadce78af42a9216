//! 单张切片的强度归一化.

use crate::consts::RGB_CHANNELS;
use ndarray::{Array2, Array3, ArrayView2};

/// 切片无法归一化.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    /// 切片最大强度不为正 (通常是全背景切片), 无法作为缩放分母.
    #[error("切片最大强度为 {0}, 无法归一化")]
    BlankSlice(f32),

    /// 切片中存在 NaN 或无穷值.
    #[error("切片中存在非有限强度值")]
    NonFinite,
}

/// 将切片强度按最大值线性缩放到 `[0, 255]`: `round(v / max * 255)`.
///
/// 缩放保持单调. 负强度 (在最大值为正时) 被截断为 0.
pub fn normalize_0_255(slice: ArrayView2<f32>) -> Result<Array2<u8>, NormalizeError> {
    let mut max = f32::NEG_INFINITY;
    for &v in slice.iter() {
        if !v.is_finite() {
            return Err(NormalizeError::NonFinite);
        }
        max = max.max(v);
    }
    // 空切片同样没有正的最大值.
    if max <= 0.0 {
        return Err(NormalizeError::BlankSlice(max.max(0.0)));
    }

    let max = max as f64;
    Ok(slice.mapv(|v| {
        // 255, not 256.
        let scaled = (v as f64 / max * 255.0).round();
        scaled.clamp(0.0, 255.0) as u8
    }))
}

/// 灰度图转 RGB: `(H, W)` -> `(H, W, 3)`, 三个通道取值相同.
pub fn gray_to_rgb(gray: Array2<u8>) -> Array3<u8> {
    let (h, w) = gray.dim();
    Array3::from_shape_fn((h, w, RGB_CHANNELS), |(i, j, _)| gray[(i, j)])
}
