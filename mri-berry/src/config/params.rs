use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 构建训练参数失败.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 运行名为空、为 `.`/`..`, 或含有路径分隔符.
    #[error("非法的运行名 `{0}`")]
    InvalidRunName(String),

    /// 无法创建日志目录.
    #[error("无法创建日志目录 `{path}`")]
    CreateLogDir {
        /// 目录.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },

    /// 无法写出参数快照.
    #[error("无法写出参数快照 `{path}`")]
    WriteSnapshot {
        /// 文件.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },
}

/// 日志目录布局: `{root}/{architecture}/{run_name}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLayout {
    /// 日志根目录, 默认 `./logs`.
    pub root: PathBuf,

    /// 架构子目录, 默认 `unet`.
    pub architecture: String,
}

impl Default for LogLayout {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./logs"),
            architecture: "unet".to_string(),
        }
    }
}

impl LogLayout {
    /// 指定根目录, 架构子目录保持默认.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// 运行 `run_name` 的日志目录.
    #[inline]
    pub fn run_dir(&self, run_name: &str) -> PathBuf {
        self.root.join(&self.architecture).join(run_name)
    }
}

/// 模型检查点回调参数.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointParams {
    /// 权重文件, `{log_dir}/{run}_weights.h5`.
    pub path: PathBuf,

    /// 只保存监控指标最好的一次.
    pub save_best_only: bool,

    /// 只保存权重, 不保存模型结构.
    pub save_weights_only: bool,

    /// 每隔多少个 epoch 检查一次.
    pub period: u32,
}

/// 早停回调参数.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarlyStoppingParams {
    /// 指标无改善的最大 epoch 数.
    pub patience: u32,

    /// 视为改善的最小变化量.
    pub min_delta: f64,

    /// 停止时恢复最好的权重.
    pub restore_best_weights: bool,
}

/// 学习率衰减回调参数.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReduceLrParams {
    /// 衰减系数, 新学习率 = 旧学习率 × `factor`.
    pub factor: f64,

    /// 指标无改善多少个 epoch 后衰减.
    pub patience: u32,

    /// 学习率下限.
    pub min_lr: f64,
}

/// CSV 日志回调参数.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvLoggerParams {
    /// 日志文件, `{log_dir}/{run}_log.csv`.
    pub path: PathBuf,

    /// 字段分隔符.
    pub separator: char,

    /// 追加写入而非覆盖.
    pub append: bool,
}

/// 一次训练运行的全部参数. 构建后只读.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainParams {
    /// 运行名.
    pub run_name: String,

    /// 训练轮数, 默认 100.
    pub epochs: u32,

    /// 批大小, 默认 16.
    pub batch_size: u32,

    /// 输出详细程度, 默认 1.
    pub verbose: u8,

    /// 回调监控的验证指标, 默认 `val_loss`.
    pub monitor: String,

    /// 是否做训练数据增强, 默认开启.
    pub train_augmentation: bool,

    /// 模型结构文件, `{log_dir}/{run}_model.json`.
    pub model_path: PathBuf,

    /// 日志目录.
    pub log_dir: PathBuf,

    /// 检查点.
    pub checkpoint: CheckpointParams,

    /// 早停.
    pub early_stopping: EarlyStoppingParams,

    /// 学习率衰减.
    pub reduce_lr: ReduceLrParams,

    /// CSV 日志.
    pub csv_logger: CsvLoggerParams,
}

fn check_run_name(run_name: &str) -> Result<(), ConfigError> {
    let bad = run_name.is_empty()
        || run_name == "."
        || run_name == ".."
        || run_name.contains(['/', '\\'])
        || Path::new(run_name).is_absolute();
    if bad {
        Err(ConfigError::InvalidRunName(run_name.to_string()))
    } else {
        Ok(())
    }
}

impl TrainParams {
    /// 在 `./logs/unet/{run_name}` 下构建参数, 并确保该目录存在.
    #[inline]
    pub fn build(run_name: &str) -> Result<Self, ConfigError> {
        Self::build_in(&LogLayout::default(), run_name)
    }

    /// 按给定布局构建参数, 并确保日志目录存在.
    ///
    /// 目录已存在时不报错, 因此同一运行名可以重复构建.
    pub fn build_in(layout: &LogLayout, run_name: &str) -> Result<Self, ConfigError> {
        check_run_name(run_name)?;

        let log_dir = layout.run_dir(run_name);
        fs::create_dir_all(&log_dir).map_err(|source| ConfigError::CreateLogDir {
            path: log_dir.clone(),
            source,
        })?;
        log::debug!("log dir ready: {}", log_dir.display());

        Ok(Self {
            run_name: run_name.to_string(),
            epochs: 100,
            batch_size: 16,
            verbose: 1,
            monitor: "val_loss".to_string(),
            train_augmentation: true,
            model_path: log_dir.join(format!("{run_name}_model.json")),
            checkpoint: CheckpointParams {
                path: log_dir.join(format!("{run_name}_weights.h5")),
                save_best_only: true,
                save_weights_only: false,
                period: 1,
            },
            early_stopping: EarlyStoppingParams {
                patience: 10,
                min_delta: 0.0,
                restore_best_weights: true,
            },
            reduce_lr: ReduceLrParams {
                factor: 0.2,
                patience: 4,
                min_lr: 1e-6,
            },
            csv_logger: CsvLoggerParams {
                path: log_dir.join(format!("{run_name}_log.csv")),
                separator: ',',
                append: false,
            },
            log_dir,
        })
    }

    /// 参数快照文件, `{log_dir}/{run}_params.json`.
    #[inline]
    pub fn snapshot_path(&self) -> PathBuf {
        self.log_dir.join(format!("{}_params.json", self.run_name))
    }

    /// 以 JSON 格式写出参数.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::WriteSnapshot {
            path: path.to_owned(),
            source,
        };
        let text = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        fs::write(path, text).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_layout_and_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = LogLayout::with_root(tmp.path().join("logs"));
        let p = TrainParams::build_in(&layout, "exp1").unwrap();

        let dir = tmp.path().join("logs").join("unet").join("exp1");
        assert!(dir.is_dir());
        assert_eq!(p.log_dir, dir);
        assert_eq!(p.checkpoint.path, dir.join("exp1_weights.h5"));
        assert!(p.checkpoint.path.to_string_lossy().contains("exp1"));
        assert_eq!(p.csv_logger.path, dir.join("exp1_log.csv"));
        assert_eq!(p.model_path, dir.join("exp1_model.json"));

        assert_eq!((p.epochs, p.batch_size, p.verbose), (100, 16, 1));
        assert_eq!(p.monitor, "val_loss");
        assert!(p.train_augmentation);
        assert!(p.checkpoint.save_best_only && !p.checkpoint.save_weights_only);
        assert_eq!(p.checkpoint.period, 1);
        assert_eq!(p.early_stopping.patience, 10);
        assert_eq!(p.early_stopping.min_delta, 0.0);
        assert!(p.early_stopping.restore_best_weights);
        assert_eq!(p.reduce_lr.factor, 0.2);
        assert_eq!(p.reduce_lr.patience, 4);
        assert_eq!(p.reduce_lr.min_lr, 1e-6);
        assert_eq!(p.csv_logger.separator, ',');
        assert!(!p.csv_logger.append);
    }

    #[test]
    fn test_default_layout_path() {
        assert_eq!(
            LogLayout::default().run_dir("exp1"),
            Path::new("./logs/unet/exp1")
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = LogLayout::with_root(tmp.path());
        let a = TrainParams::build_in(&layout, "exp1").unwrap();
        let b = TrainParams::build_in(&layout, "exp1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_run_names() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = LogLayout::with_root(tmp.path());
        for name in ["", ".", "..", "a/b", "a\\b", "/abs"] {
            assert!(
                matches!(
                    TrainParams::build_in(&layout, name),
                    Err(ConfigError::InvalidRunName(_))
                ),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_log_dir_creation_failure_is_loud() {
        let tmp = tempfile::tempdir().unwrap();
        // 根目录实际是文件, 无法在其下建目录.
        let blocker = tmp.path().join("logs");
        fs::write(&blocker, b"").unwrap();
        let err = TrainParams::build_in(&LogLayout::with_root(&blocker), "exp1").unwrap_err();
        assert!(matches!(err, ConfigError::CreateLogDir { .. }));
    }

    #[test]
    fn test_save_json() {
        let tmp = tempfile::tempdir().unwrap();
        let p = TrainParams::build_in(&LogLayout::with_root(tmp.path()), "exp2").unwrap();
        p.save_json(p.snapshot_path()).unwrap();

        let text = fs::read_to_string(p.snapshot_path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["epochs"], 100);
        assert_eq!(v["monitor"], "val_loss");
        assert_eq!(v["reduce_lr"]["patience"], 4);
        assert_eq!(v["csv_logger"]["separator"], ",");
    }
}
