//! 通用常量.

/// 模型接受的切片边长. 图像和掩码都必须恰为 `SLICE_SIDE × SLICE_SIDE`.
pub const SLICE_SIDE: usize = 256;

/// RGB 通道数.
pub const RGB_CHANNELS: usize = 3;

/// 单通道颜色.
pub mod gray {
    /// 单通道黑色. 掩码背景.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色. 掩码前景.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 二值标签中的背景.
    pub const LABEL_BACKGROUND: u8 = 0;

    /// 二值标签中的前景 (脑组织).
    pub const LABEL_FOREGROUND: u8 = 1;
}

/// 类别信息.
pub mod class {
    /// 背景类名. 始终占据类别 id 0.
    pub const BACKGROUND_NAME: &str = "BG";

    /// 数据来源名.
    pub const SOURCE: &str = "MRI";

    /// 脑组织类别 id.
    pub const BRAIN_ID: i32 = 1;

    /// 脑组织类名.
    pub const BRAIN_NAME: &str = "brain";
}

/// 迁移学习时不从 COCO 预训练权重中加载的输出层.
/// 这些层的形状依赖类别数, 必须重新训练.
pub const COCO_EXCLUDED_LAYERS: [&str; 4] = [
    "mrcnn_class_logits",
    "mrcnn_bbox_fc",
    "mrcnn_bbox",
    "mrcnn_mask",
];

/// COCO 预训练权重的默认文件名.
pub const COCO_WEIGHTS_FILE: &str = "mask_rcnn_coco.h5";
