//! 通用 MRI scan/mask 数据加载器.
//!
//! 提供迭代器风格的体数据获取模式. 图像与掩码按文件名排序后按位置配对.

use super::PrepareError;
use crate::data::OpenVolumeError;
use crate::{MriData3d, MriLabel, MriScan};
use itertools::Itertools;
use std::fs;
use std::path::{Path, PathBuf};

/// 文件是否是 nii 体数据 (`.nii` 或 `.nii.gz`).
fn is_nifti(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}

/// 列出 `dir` 下所有 nii 文件, 按文件名升序排列. 不递归子目录.
pub fn list_volumes<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, PrepareError> {
    let dir = dir.as_ref();
    let read_dir_err = |source| PrepareError::ReadDir {
        path: dir.to_owned(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        if path.is_file() && is_nifti(&path) {
            files.push(path);
        }
    }
    Ok(files.into_iter().sorted().collect())
}

/// 列出并配对 `images_dir` 与 `masks_dir` 下的 nii 文件.
///
/// # 注意
///
/// 配对仅依据排序后的位置. 两边数量不一致或为空时立即返回 `Err`.
pub fn volume_pairs<P: AsRef<Path>, Q: AsRef<Path>>(
    images_dir: P,
    masks_dir: Q,
) -> Result<Vec<(PathBuf, PathBuf)>, PrepareError> {
    let images = list_volumes(images_dir.as_ref())?;
    let masks = list_volumes(masks_dir.as_ref())?;
    if images.len() != masks.len() {
        return Err(PrepareError::FileCountMismatch {
            images: images.len(),
            masks: masks.len(),
        });
    }
    if images.is_empty() {
        return Err(PrepareError::NoVolumes(images_dir.as_ref().to_owned()));
    }
    Ok(images.into_iter().zip(masks).collect())
}

/// 从图像目录与掩码目录创建体数据加载器.
pub fn pair_loader<P: AsRef<Path>, Q: AsRef<Path>>(
    images_dir: P,
    masks_dir: Q,
) -> Result<VolumePairLoader, PrepareError> {
    let mut pairs = volume_pairs(images_dir, masks_dir)?;
    pairs.reverse();
    Ok(VolumePairLoader { pairs_rev: pairs })
}

/// 3D MRI 数据 (scan + mask) 加载器. 每次迭代打开一对文件.
#[derive(Debug)]
pub struct VolumePairLoader {
    pairs_rev: Vec<(PathBuf, PathBuf)>,
}

/// 加载器的单项输出.
#[derive(Debug)]
pub struct LoadedPair {
    /// 图像文件.
    pub image_path: PathBuf,

    /// 掩码文件.
    pub mask_path: PathBuf,

    /// 打开结果. 出错时 [`PrepareError::Volume`] 指向实际出错的文件.
    pub data: Result<MriData3d, PrepareError>,
}

fn volume_err(path: &Path) -> impl FnOnce(OpenVolumeError) -> PrepareError {
    let path = path.to_owned();
    move |source| PrepareError::Volume { path, source }
}

/// 分别打开扫描与标注, 错误归属到对应文件.
/// 切片个数不一致时归属到掩码文件.
fn open_pair(image_path: &Path, mask_path: &Path) -> Result<MriData3d, PrepareError> {
    let scan = MriScan::open(image_path).map_err(volume_err(image_path))?;
    let label = MriLabel::open(mask_path).map_err(volume_err(mask_path))?;
    MriData3d::new(scan, label).map_err(volume_err(mask_path))
}

impl Iterator for VolumePairLoader {
    type Item = LoadedPair;

    fn next(&mut self) -> Option<Self::Item> {
        let (image_path, mask_path) = self.pairs_rev.pop()?;
        let data = open_pair(&image_path, &mask_path);
        Some(LoadedPair {
            image_path,
            mask_path,
            data,
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pairs_rev.len(), Some(self.pairs_rev.len()))
    }
}

impl ExactSizeIterator for VolumePairLoader {
    #[inline]
    fn len(&self) -> usize {
        self.pairs_rev.len()
    }
}
