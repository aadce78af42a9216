//! 数据集操作.
//!
//! 从 nii 体数据目录提取切片, 组织成外部训练器可直接消费的数据集.

use ndarray::Array3;
use std::ops::Range;
use std::path::{Path, PathBuf};

mod catalog;
mod error;
mod extract;
pub mod loader;
mod vis;

pub use catalog::{BrainDataset, CatalogEntry, ClassInfo, Provenance};
pub use error::PrepareError;
pub use extract::{BlankSlicePolicy, ExtractOptions, ExtractReport, SliceExtractor, VolumeSource};
pub use vis::export_png;

/// 外部训练器要求数据集提供的最小能力集合.
///
/// 图像 id 从 0 开始连续编号.
pub trait SegmentationDataset {
    /// 图像个数.
    fn image_count(&self) -> usize;

    /// 所有图像 id.
    #[inline]
    fn image_ids(&self) -> Range<usize> {
        0..self.image_count()
    }

    /// 获取 `(H, W, 3)` 的 RGB 图像. `id` 越界时返回 `None`.
    fn get_image(&self, id: usize) -> Option<&Array3<u8>>;

    /// 获取 `(H, W, 实例数)` 的实例掩码及每个实例的类别 id.
    fn get_mask(&self, id: usize) -> Option<(&Array3<u8>, Vec<i32>)>;

    /// 获取图像来源信息.
    fn get_metadata(&self, id: usize) -> Option<&Provenance>;

    /// 所有类别名, 下标即类别 id. 第 0 项为背景.
    fn class_names(&self) -> Vec<&str>;

    /// 类别个数 (含背景).
    #[inline]
    fn num_classes(&self) -> usize {
        self.class_names().len()
    }
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}
