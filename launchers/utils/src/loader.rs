//! 对 `mri-berry::train::DataSplit` 的更一层封装. 提供数据目录的定位规则.

use mri_berry::train::DataSplit;
use std::env;
use std::path::{Path, PathBuf};

/// 指定数据根目录的环境变量.
pub const DATA_DIR_ENV: &str = "FETAL_DATA_DIR";

/// 获取数据根目录.
///
/// 1. 若 `explicit` 非空, 则返回其值;
/// 2. 否则若环境变量 `$FETAL_DATA_DIR` 非空, 则返回其值;
/// 3. 否则, 返回 `$HOME/dataset/fetal`. 无法确定主目录时返回 `None`.
pub fn data_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_owned());
    }
    match env::var(DATA_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => mri_berry::dataset::home_dataset_dir_with(["fetal"]),
    }
}

/// 训练集: `{root}/train/{images, masks}`.
#[inline]
pub fn train_split<P: AsRef<Path>>(root: P) -> DataSplit {
    DataSplit::under(root.as_ref().join("train"))
}

/// 验证集: `{root}/test/{images, masks}`.
#[inline]
pub fn val_split<P: AsRef<Path>>(root: P) -> DataSplit {
    DataSplit::under(root.as_ref().join("test"))
}
