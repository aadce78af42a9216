//! MRI scan/label 切片视图.

use crate::consts::gray::{BLACK, LABEL_BACKGROUND, WHITE};
use crate::consts::SLICE_SIDE;
use crate::Idx2d;
use ndarray::{Array3, ArrayView2, Axis};
use std::ops::Index;

/// 不可变、借用的二维 MRI 扫描切片.
#[derive(Debug, Clone, Copy)]
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::MriScan`] 或调用者.
    data: ArrayView2<'a, f32>,
}

/// 不可变、借用的二维 MRI 标注切片. 像素值为 0 或 1.
#[derive(Debug, Clone, Copy)]
pub struct LabelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::MriLabel`] 或调用者.
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for ScanSlice<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl Index<Idx2d> for LabelSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

/// 切片是否恰好为模型要求的 `SLICE_SIDE × SLICE_SIDE`.
#[inline]
fn is_model_sized((h, w): Idx2d) -> bool {
    h == SLICE_SIDE && w == SLICE_SIDE
}

impl<'a> ScanSlice<'a> {
    /// 包装一个二维视图.
    #[inline]
    pub fn new(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// `(高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 是否可直接送入模型.
    #[inline]
    pub fn is_model_sized(&self) -> bool {
        is_model_sized(self.shape())
    }

    /// 获得底层数据的一份 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'a, f32> {
        self.data
    }
}

impl<'a> LabelSlice<'a> {
    /// 包装一个二维视图.
    #[inline]
    pub fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// `(高, 宽)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 是否可直接送入模型.
    #[inline]
    pub fn is_model_sized(&self) -> bool {
        is_model_sized(self.shape())
    }

    /// 切片是否全为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().all(|&p| p == LABEL_BACKGROUND)
    }

    /// 生成 `(H, W, 1)` 的实例掩码: 前景为白色 (255), 背景为黑色 (0).
    pub fn to_mask_record(&self) -> Array3<u8> {
        self.data
            .mapv(|p| if p != LABEL_BACKGROUND { WHITE } else { BLACK })
            .insert_axis(Axis(2))
    }
}
