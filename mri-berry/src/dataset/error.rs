//! 数据准备阶段的错误.

use crate::data::OpenVolumeError;
use std::path::PathBuf;

/// 数据准备失败. 所有变体都会终止本次运行, 不做重试.
#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    /// 图像或掩码目录无法读取.
    #[error("无法读取目录 `{path}`")]
    ReadDir {
        /// 目录.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: std::io::Error,
    },

    /// 目录下没有任何 nii 文件.
    #[error("目录 `{0}` 下没有 nii 文件")]
    NoVolumes(PathBuf),

    /// 图像与掩码文件个数不一致, 无法按位置配对.
    #[error("图像文件 {images} 个, 掩码文件 {masks} 个, 无法配对")]
    FileCountMismatch {
        /// 图像文件数.
        images: usize,
        /// 掩码文件数.
        masks: usize,
    },

    /// 体数据打开失败.
    #[error("无法打开体数据 `{path}`")]
    Volume {
        /// 出错的文件 (图像或掩码).
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: OpenVolumeError,
    },

    /// 切片没有正的最大强度, 无法归一化.
    #[error("`{path}` 的第 {slice_index} 张切片没有正的最大强度")]
    BlankSlice {
        /// 图像文件.
        path: PathBuf,
        /// 切片在体数据中的下标.
        slice_index: usize,
    },

    /// 切片中存在 NaN 或无穷值.
    #[error("`{path}` 的第 {slice_index} 张切片存在非有限强度值")]
    NonFiniteSlice {
        /// 图像文件.
        path: PathBuf,
        /// 切片在体数据中的下标.
        slice_index: usize,
    },
}
