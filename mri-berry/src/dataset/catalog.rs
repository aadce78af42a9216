use super::extract::{ExtractOptions, ExtractReport, SliceExtractor, VolumeSource};
use super::{loader, PrepareError, SegmentationDataset};
use crate::consts::class::{BACKGROUND_NAME, BRAIN_ID, BRAIN_NAME, SOURCE};
use crate::MriData3d;
use ndarray::Array3;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 图像来源信息.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// 目录内 id, 从 0 开始.
    pub id: usize,

    /// 图像体数据文件.
    pub image_path: PathBuf,

    /// 掩码体数据文件.
    pub mask_path: PathBuf,

    /// 切片在体数据中的下标.
    pub slice_index: usize,

    /// 宽.
    pub width: usize,

    /// 高.
    pub height: usize,
}

/// 目录中的一条训练样本. 创建后不再修改.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// `(H, W, 3)` RGB 图像, 取值 `[0, 255]`.
    pub image: Array3<u8>,

    /// `(H, W, 1)` 实例掩码, 取值 0 或 255.
    pub mask: Array3<u8>,

    /// 来源信息.
    pub meta: Provenance,
}

/// 数据集登记的类别. 随训练计划一同序列化.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    /// 数据来源.
    pub source: &'static str,

    /// 类别 id.
    pub id: i32,

    /// 类别名.
    pub name: &'static str,
}

/// 胎儿脑部 MRI 切片数据集.
///
/// 所有切片在构建时一次性载入内存, 之后只读.
/// 每张切片只有一个实例 (脑组织), 类别 id 为 1.
#[derive(Debug, Clone)]
pub struct BrainDataset {
    classes: Vec<ClassInfo>,
    entries: Vec<CatalogEntry>,
}

impl Default for BrainDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl BrainDataset {
    /// 创建空数据集, 已登记脑组织类别.
    pub fn new() -> Self {
        Self {
            classes: vec![ClassInfo {
                source: SOURCE,
                id: BRAIN_ID,
                name: BRAIN_NAME,
            }],
            entries: Vec::new(),
        }
    }

    /// 从图像目录与掩码目录加载数据集.
    ///
    /// 两个目录下的 nii 文件按文件名排序后按位置配对, 依次提取切片.
    /// 任一文件打开失败即返回 `Err`.
    pub fn load_brain_data<P: AsRef<Path>, Q: AsRef<Path>>(
        images_dir: P,
        masks_dir: Q,
        options: ExtractOptions,
    ) -> Result<Self, PrepareError> {
        let pairs = loader::pair_loader(images_dir.as_ref(), masks_dir.as_ref())?;
        let total = pairs.len();
        let mut dataset = Self::new();

        for (i, pair) in pairs.enumerate() {
            log::info!(
                "loading data {}/{total}: {}",
                i + 1,
                pair.image_path.display()
            );
            let data = pair.data?;
            let source = VolumeSource::new(pair.image_path, pair.mask_path);
            dataset.push_volume(&source, &data, options)?;
        }

        log::info!(
            "{} slices loaded from {total} volume pairs",
            dataset.image_count()
        );
        Ok(dataset)
    }

    /// 提取一对已打开的体数据, 追加到数据集末尾.
    pub fn push_volume(
        &mut self,
        source: &VolumeSource,
        data: &MriData3d,
        options: ExtractOptions,
    ) -> Result<ExtractReport, PrepareError> {
        SliceExtractor::new(options).extract(source, data.slice_iter(), &mut self.entries)
    }

    /// 数据集是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 已登记的类别 (不含背景).
    #[inline]
    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    /// 按 id 获取完整条目.
    #[inline]
    pub fn entry(&self, id: usize) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    /// 按 id 升序迭代所有条目.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &CatalogEntry> {
        self.entries.iter()
    }
}

impl SegmentationDataset for BrainDataset {
    #[inline]
    fn image_count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn get_image(&self, id: usize) -> Option<&Array3<u8>> {
        self.entry(id).map(|e| &e.image)
    }

    /// 每张切片恰有一个实例, 类别向量恒为 `[1]`.
    #[inline]
    fn get_mask(&self, id: usize) -> Option<(&Array3<u8>, Vec<i32>)> {
        self.entry(id).map(|e| (&e.mask, vec![BRAIN_ID]))
    }

    #[inline]
    fn get_metadata(&self, id: usize) -> Option<&Provenance> {
        self.entry(id).map(|e| &e.meta)
    }

    fn class_names(&self) -> Vec<&str> {
        std::iter::once(BACKGROUND_NAME)
            .chain(self.classes.iter().map(|c| c.name))
            .collect()
    }
}
