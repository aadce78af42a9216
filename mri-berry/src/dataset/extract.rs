//! 切片提取: 体数据 -> 归一化 RGB 图像 + 实例掩码.

use super::catalog::{CatalogEntry, Provenance};
use super::PrepareError;
use crate::consts::SLICE_SIDE;
use crate::data::{gray_to_rgb, normalize_0_255, NormalizeError};
use crate::{LabelSlice, ScanSlice};
use std::path::{Path, PathBuf};

/// 全背景 (最大强度不为正) 切片的处理方式.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlankSlicePolicy {
    /// 返回 [`PrepareError::BlankSlice`], 终止本次运行.
    #[default]
    Fail,

    /// 丢弃该切片并继续. 被丢弃的个数计入 [`ExtractReport`].
    Skip,
}

/// 提取选项.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// 全背景切片的处理方式.
    pub blank_slices: BlankSlicePolicy,
}

/// 一对体数据的来源文件.
#[derive(Debug, Clone)]
pub struct VolumeSource {
    /// 图像文件.
    pub image_path: PathBuf,

    /// 掩码文件.
    pub mask_path: PathBuf,
}

impl VolumeSource {
    /// 构造.
    pub fn new(image_path: impl Into<PathBuf>, mask_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            mask_path: mask_path.into(),
        }
    }
}

/// 单对体数据的提取结果统计.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// 写入目录的切片个数.
    pub emitted: usize,

    /// 若发生截断, 第一张尺寸不符的切片下标.
    pub truncated_at: Option<usize>,

    /// 按 [`BlankSlicePolicy::Skip`] 丢弃的切片个数.
    pub skipped_blank: usize,
}

/// 切片提取器.
///
/// 新条目的 id 等于目录当前长度, 因此整个提取过程中 id 从 0 起连续递增,
/// 不随体数据重置.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceExtractor {
    options: ExtractOptions,
}

impl SliceExtractor {
    /// 构造.
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    /// 提取一对体数据的所有切片, 追加到 `catalog`.
    ///
    /// 遇到第一张图像或掩码不为 `SLICE_SIDE × SLICE_SIDE` 的切片时,
    /// 该切片及其后所有切片都被丢弃 (即使后续切片尺寸合法).
    ///
    /// 返回 `Err` 时 `catalog` 保持不变.
    pub fn extract<'a, I>(
        &self,
        source: &VolumeSource,
        slices: I,
        catalog: &mut Vec<CatalogEntry>,
    ) -> Result<ExtractReport, PrepareError>
    where
        I: IntoIterator<Item = (ScanSlice<'a>, LabelSlice<'a>)>,
    {
        let mut report = ExtractReport::default();
        let first_id = catalog.len();
        let mut staged = Vec::new();

        for (slice_index, (scan, label)) in slices.into_iter().enumerate() {
            if !scan.is_model_sized() || !label.is_model_sized() {
                log::warn!(
                    "{}: slice {slice_index} is {:?} (mask {:?}), dropping the rest of the volume",
                    source.image_path.display(),
                    scan.shape(),
                    label.shape(),
                );
                report.truncated_at = Some(slice_index);
                break;
            }

            let gray = match normalize_0_255(scan.array_view()) {
                Ok(gray) => gray,
                Err(NormalizeError::BlankSlice(_))
                    if self.options.blank_slices == BlankSlicePolicy::Skip =>
                {
                    log::debug!(
                        "{}: slice {slice_index} is blank, skipped",
                        source.image_path.display()
                    );
                    report.skipped_blank += 1;
                    continue;
                }
                Err(e) => return Err(normalize_error(e, &source.image_path, slice_index)),
            };

            staged.push(CatalogEntry {
                image: gray_to_rgb(gray),
                mask: label.to_mask_record(),
                meta: Provenance {
                    id: first_id + staged.len(),
                    image_path: source.image_path.clone(),
                    mask_path: source.mask_path.clone(),
                    slice_index,
                    width: SLICE_SIDE,
                    height: SLICE_SIDE,
                },
            });
        }

        report.emitted = staged.len();
        catalog.append(&mut staged);
        Ok(report)
    }
}

fn normalize_error(e: NormalizeError, path: &Path, slice_index: usize) -> PrepareError {
    let path = path.to_owned();
    match e {
        NormalizeError::BlankSlice(_) => PrepareError::BlankSlice { path, slice_index },
        NormalizeError::NonFinite => PrepareError::NonFiniteSlice { path, slice_index },
    }
}
