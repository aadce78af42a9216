//! 🧠欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{gray_to_rgb, normalize_0_255, NormalizeError};
pub use crate::{LabelSlice, MriData3d, MriLabel, MriScan, NiftiHeaderAttr, ScanSlice};

pub use crate::consts::SLICE_SIDE;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{
    export_png, BlankSlicePolicy, BrainDataset, ExtractOptions, PrepareError, SegmentationDataset,
};

pub use crate::config::{LogLayout, MaskRcnnConfig, TrainParams};

pub use crate::train::{
    launch, run, DataSplit, Layers, RunError, TrainJob, TrainSession, Trainer,
};
