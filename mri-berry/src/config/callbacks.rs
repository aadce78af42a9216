//! 训练回调.

use super::TrainParams;
use serde::Serialize;
use std::path::PathBuf;

/// 外部训练器在训练循环中挂载的回调.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Callback {
    /// 按监控指标保存检查点.
    ModelCheckpoint {
        /// 输出文件.
        path: PathBuf,
        /// 监控指标.
        monitor: String,
        /// 只保存最好的一次.
        save_best_only: bool,
        /// 只保存权重.
        save_weights_only: bool,
        /// 检查间隔 (epoch).
        period: u32,
        /// 详细程度.
        verbose: u8,
    },

    /// 监控指标不再改善时停止训练.
    EarlyStopping {
        /// 监控指标.
        monitor: String,
        /// 最小改善量.
        min_delta: f64,
        /// 容忍轮数.
        patience: u32,
        /// 恢复最好的权重.
        restore_best_weights: bool,
        /// 详细程度.
        verbose: u8,
    },

    /// 监控指标不再改善时衰减学习率.
    ReduceLrOnPlateau {
        /// 监控指标.
        monitor: String,
        /// 衰减系数.
        factor: f64,
        /// 容忍轮数.
        patience: u32,
        /// 学习率下限.
        min_lr: f64,
        /// 详细程度.
        verbose: u8,
    },

    /// 逐 epoch 写 CSV 日志.
    CsvLogger {
        /// 输出文件.
        path: PathBuf,
        /// 字段分隔符.
        separator: char,
        /// 追加写入.
        append: bool,
    },
}

impl TrainParams {
    /// 由参数派生四个回调, 顺序为: 检查点, 早停, 学习率衰减, CSV 日志.
    pub fn callbacks(&self) -> [Callback; 4] {
        let monitor = &self.monitor;
        [
            Callback::ModelCheckpoint {
                path: self.checkpoint.path.clone(),
                monitor: monitor.clone(),
                save_best_only: self.checkpoint.save_best_only,
                save_weights_only: self.checkpoint.save_weights_only,
                period: self.checkpoint.period,
                verbose: self.verbose,
            },
            Callback::EarlyStopping {
                monitor: monitor.clone(),
                min_delta: self.early_stopping.min_delta,
                patience: self.early_stopping.patience,
                restore_best_weights: self.early_stopping.restore_best_weights,
                verbose: self.verbose,
            },
            Callback::ReduceLrOnPlateau {
                monitor: monitor.clone(),
                factor: self.reduce_lr.factor,
                patience: self.reduce_lr.patience,
                min_lr: self.reduce_lr.min_lr,
                verbose: self.verbose,
            },
            Callback::CsvLogger {
                path: self.csv_logger.path.clone(),
                separator: self.csv_logger.separator,
                append: self.csv_logger.append,
            },
        ]
    }
}
