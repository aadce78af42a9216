#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 将胎儿脑部 MRI 的 3D nifti 体数据整理为 Mask R-CNN
//! 训练所需的 2D RGB 切片与实例掩码, 并构建训练参数与回调配置.
//!
//! 网络结构、损失函数以及训练循环均由外部框架负责, 本 crate
//! 只通过 [`train::Trainer`] trait 与之交互.
//!
//! # 注意
//!
//! 1. 图像与掩码文件按文件名排序后 **按位置** 一一对应, 数量不一致时直接报错.
//! 2. 所有切片在训练开始前一次性载入内存, 不支持流式加载.
//!
//! # 开发计划
//!
//! ### 强度归一化 ✅
//!
//! 单张切片按最大值线性缩放到 `[0, 255]`. 全零切片以
//! [`data::NormalizeError::BlankSlice`] 明确报告.
//!
//! 实现位于 `mri-berry/src/data/normalize.rs`.
//!
//! ### 切片提取 ✅
//!
//! 遇到第一张非 256×256 的切片即截断该体数据剩余部分.
//!
//! 实现位于 `mri-berry/src/dataset/extract.rs`.
//!
//! ### 数据集目录 ✅
//!
//! 实现位于 `mri-berry/src/dataset/catalog.rs`.
//!
//! ### 训练参数 / 模型参数 ✅
//!
//! 实现位于 `mri-berry/src/config`.
//!
//! ### 训练编排 ✅
//!
//! 构建参数 -> 加载数据集 -> 加载预训练权重 -> 训练.
//!
//! 实现位于 `mri-berry/src/train.rs`.
//!
//! ### 可视化导出 ✅
//!
//! 实现位于 `mri-berry/src/dataset/vis.rs`.

/// 二维索引, `(高, 宽)`.
pub type Idx2d = (usize, usize);

/// 三维索引, `(z, 高, 宽)`.
pub type Idx3d = (usize, usize, usize);

/// 3D MRI nii 文件基础数据结构.
pub mod data;

pub use data::{LabelSlice, MriData3d, MriLabel, MriScan, NiftiHeaderAttr, ScanSlice};

pub mod consts;

pub mod config;

pub mod dataset;

pub mod train;

pub mod prelude;
