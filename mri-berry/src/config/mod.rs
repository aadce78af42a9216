//! 训练参数与模型参数.

mod callbacks;
mod model;
mod params;

pub use callbacks::Callback;
pub use model::{Backbone, MaskRcnnConfig, ModelConfigError};
pub use params::{
    CheckpointParams, ConfigError, CsvLoggerParams, EarlyStoppingParams, LogLayout, ReduceLrParams,
    TrainParams,
};
