//! Mask R-CNN 模型参数.

use crate::consts::SLICE_SIDE;
use serde::Serialize;

/// 特征提取骨干网络.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backbone {
    /// ResNet-50.
    Resnet50,

    /// ResNet-101.
    Resnet101,
}

/// 模型参数与数据集不匹配.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelConfigError {
    /// 输入尺寸与切片尺寸不一致.
    #[error("模型输入为 {min_dim}..={max_dim}, 切片边长为 {slice_side}")]
    ImageDim {
        /// 最小边长.
        min_dim: usize,
        /// 最大边长.
        max_dim: usize,
        /// 切片边长.
        slice_side: usize,
    },

    /// 类别个数与数据集不一致.
    #[error("模型类别数为 {model}, 数据集类别数为 {dataset}")]
    NumClasses {
        /// 模型.
        model: usize,
        /// 数据集.
        dataset: usize,
    },

    /// GPU 个数或每 GPU 图像数为 0.
    #[error("批大小为 0")]
    EmptyBatch,
}

/// 模型构建参数.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaskRcnnConfig {
    /// 配置名, 同时作为权重目录名.
    pub name: String,

    /// GPU 个数.
    pub gpu_count: usize,

    /// 每个 GPU 同时处理的图像数.
    pub images_per_gpu: usize,

    /// 骨干网络.
    pub backbone: Backbone,

    /// 类别个数, 含背景.
    pub num_classes: usize,

    /// 输入图像最小边长.
    pub image_min_dim: usize,

    /// 输入图像最大边长.
    pub image_max_dim: usize,

    /// 每个 epoch 的训练步数.
    pub steps_per_epoch: usize,

    /// 每张图像送入分类/掩码头的 ROI 数.
    pub train_rois_per_image: usize,

    /// 每张图像最多的真值实例数.
    pub max_gt_instances: usize,

    /// 推理时每张图像最多的检测数.
    pub detection_max_instances: usize,

    /// 检测置信度下限.
    pub detection_min_confidence: f64,

    /// 检测的非极大值抑制阈值.
    pub detection_nms_threshold: f64,

    /// 学习率.
    pub learning_rate: f64,
}

impl Default for MaskRcnnConfig {
    fn default() -> Self {
        Self {
            name: "FetalBrainSegmentation_v2".to_string(),
            gpu_count: 1,
            images_per_gpu: 8,
            backbone: Backbone::Resnet101,
            // 背景 + 脑组织
            num_classes: 1 + 1,
            image_min_dim: SLICE_SIDE,
            image_max_dim: SLICE_SIDE,
            steps_per_epoch: 202,
            train_rois_per_image: 32,
            max_gt_instances: 1,
            detection_max_instances: 1,
            detection_min_confidence: 0.8,
            detection_nms_threshold: 0.3,
            learning_rate: 0.001,
        }
    }
}

impl MaskRcnnConfig {
    /// 实际批大小: GPU 个数 × 每 GPU 图像数.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.gpu_count * self.images_per_gpu
    }

    /// 检查模型参数能否接受给定类别数的数据集.
    pub fn validate(&self, dataset_classes: usize) -> Result<(), ModelConfigError> {
        if self.batch_size() == 0 {
            return Err(ModelConfigError::EmptyBatch);
        }
        if self.image_min_dim != SLICE_SIDE || self.image_max_dim != SLICE_SIDE {
            return Err(ModelConfigError::ImageDim {
                min_dim: self.image_min_dim,
                max_dim: self.image_max_dim,
                slice_side: SLICE_SIDE,
            });
        }
        if self.num_classes != dataset_classes {
            return Err(ModelConfigError::NumClasses {
                model: self.num_classes,
                dataset: dataset_classes,
            });
        }
        Ok(())
    }
}
