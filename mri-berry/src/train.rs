//! 训练编排.
//!
//! 固定的执行顺序: 构建训练参数 -> 加载训练/验证数据集 -> 加载预训练权重 -> 训练.
//! 网络本身由实现了 [`Trainer`] 的外部组件提供.

use crate::config::{
    Callback, ConfigError, LogLayout, MaskRcnnConfig, ModelConfigError, TrainParams,
};
use crate::consts::COCO_EXCLUDED_LAYERS;
use crate::dataset::{BrainDataset, ExtractOptions, PrepareError, SegmentationDataset};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};

/// 参与训练的网络层.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layers {
    /// 只训练输出头, 骨干网络保持预训练权重.
    Heads,

    /// 训练全部层.
    #[default]
    All,
}

/// 一次训练调用携带的全部内容. 数据集以引用形式交给训练器.
#[derive(Debug)]
pub struct TrainSession<'a> {
    /// 训练集.
    pub train: &'a BrainDataset,

    /// 验证集.
    pub val: &'a BrainDataset,

    /// 模型参数.
    pub model: &'a MaskRcnnConfig,

    /// 训练参数.
    pub params: &'a TrainParams,

    /// 学习率.
    pub learning_rate: f64,

    /// 训练轮数.
    pub epochs: u32,

    /// 参与训练的层.
    pub layers: Layers,

    /// 回调.
    pub callbacks: [Callback; 4],
}

/// 外部训练器.
pub trait Trainer {
    /// 训练器自身的错误.
    type Error: Error + Send + Sync + 'static;

    /// 按层名加载预训练权重, 跳过 `exclude` 中的层.
    fn load_weights(&mut self, path: &Path, exclude: &[&str]) -> Result<(), Self::Error>;

    /// 执行训练.
    fn train(&mut self, session: &TrainSession<'_>) -> Result<(), Self::Error>;
}

/// 一个数据划分的图像目录与掩码目录.
#[derive(Debug, Clone)]
pub struct DataSplit {
    /// 图像目录.
    pub images_dir: PathBuf,

    /// 掩码目录.
    pub masks_dir: PathBuf,
}

impl DataSplit {
    /// `{root}/images` 与 `{root}/masks`.
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            images_dir: root.join("images"),
            masks_dir: root.join("masks"),
        }
    }

    /// 加载该划分.
    pub fn load(&self, options: ExtractOptions) -> Result<BrainDataset, PrepareError> {
        BrainDataset::load_brain_data(&self.images_dir, &self.masks_dir, options)
    }
}

/// 一次训练任务的描述.
#[derive(Debug, Clone)]
pub struct TrainJob {
    /// 运行名, 决定日志与产物的命名空间.
    pub run_name: String,

    /// 日志目录布局.
    pub layout: LogLayout,

    /// 训练集.
    pub train: DataSplit,

    /// 验证集.
    pub val: DataSplit,

    /// 预训练权重. `None` 表示从头训练.
    pub pretrained: Option<PathBuf>,

    /// 模型参数.
    pub model: MaskRcnnConfig,

    /// 切片提取选项.
    pub extract: ExtractOptions,

    /// 参与训练的层.
    pub layers: Layers,
}

/// 编排失败.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// 训练参数构建失败.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 数据准备失败.
    #[error(transparent)]
    Prepare(#[from] PrepareError),

    /// 模型参数与数据集不匹配.
    #[error(transparent)]
    Model(#[from] ModelConfigError),

    /// 外部训练器报错.
    #[error("训练器出错")]
    Trainer(#[source] Box<dyn Error + Send + Sync>),
}

/// 一次运行的概要.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// 训练集切片数.
    pub train_images: usize,

    /// 验证集切片数.
    pub val_images: usize,

    /// 日志目录.
    pub log_dir: PathBuf,
}

/// 按固定顺序完成一次训练任务. 参数快照写入日志目录.
pub fn run<T: Trainer>(job: &TrainJob, trainer: &mut T) -> Result<RunSummary, RunError> {
    let params = TrainParams::build_in(&job.layout, &job.run_name)?;
    params.save_json(params.snapshot_path())?;

    log::info!("loading training set");
    let train = job.train.load(job.extract)?;
    log::info!("loading validation set");
    let val = job.val.load(job.extract)?;

    launch(
        &params,
        &job.model,
        job.pretrained.as_deref(),
        job.layers,
        &train,
        &val,
        trainer,
    )
}

/// 在数据集已就绪的前提下, 加载预训练权重并训练.
pub fn launch<T: Trainer>(
    params: &TrainParams,
    model: &MaskRcnnConfig,
    pretrained: Option<&Path>,
    layers: Layers,
    train: &BrainDataset,
    val: &BrainDataset,
    trainer: &mut T,
) -> Result<RunSummary, RunError> {
    model.validate(train.num_classes())?;
    let boxed = |e: T::Error| RunError::Trainer(Box::new(e));

    if let Some(path) = pretrained {
        log::info!("loading pretrained weights from {}", path.display());
        trainer
            .load_weights(path, &COCO_EXCLUDED_LAYERS)
            .map_err(boxed)?;
    }

    let session = TrainSession {
        train,
        val,
        model,
        params,
        learning_rate: model.learning_rate,
        epochs: params.epochs,
        layers,
        callbacks: params.callbacks(),
    };
    log::info!(
        "training `{}`: {} train / {} val slices, {} epochs",
        params.run_name,
        train.image_count(),
        val.image_count(),
        session.epochs
    );
    trainer.train(&session).map_err(boxed)?;

    Ok(RunSummary {
        train_images: train.image_count(),
        val_images: val.image_count(),
        log_dir: params.log_dir.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SLICE_SIDE as N;
    use crate::dataset::VolumeSource;
    use crate::{MriData3d, MriLabel, MriScan};
    use ndarray::Array3;
    use std::fmt;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom")
        }
    }

    impl Error for Boom {}

    /// 记录调用顺序的训练器.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        fail_train: bool,
    }

    impl Trainer for Recorder {
        type Error = Boom;

        fn load_weights(&mut self, path: &Path, exclude: &[&str]) -> Result<(), Boom> {
            self.calls
                .push(format!("load {} {}", path.display(), exclude.join(",")));
            Ok(())
        }

        fn train(&mut self, s: &TrainSession<'_>) -> Result<(), Boom> {
            self.calls.push(format!(
                "train {} {} {} {:?} {}",
                s.train.image_count(),
                s.val.image_count(),
                s.epochs,
                s.layers,
                s.learning_rate
            ));
            if self.fail_train {
                Err(Boom)
            } else {
                Ok(())
            }
        }
    }

    fn dataset(z: usize) -> BrainDataset {
        let scan = MriScan::from_array(Array3::from_elem((z, N, N), 3.0));
        let label = MriLabel::from_array(Array3::from_elem((z, N, N), 1));
        let data = MriData3d::new(scan, label).unwrap();
        let mut ds = BrainDataset::new();
        ds.push_volume(
            &VolumeSource::new("i.nii", "m.nii"),
            &data,
            ExtractOptions::default(),
        )
        .unwrap();
        ds
    }

    fn params(tmp: &Path) -> TrainParams {
        TrainParams::build_in(&LogLayout::with_root(tmp), "exp1").unwrap()
    }

    #[test]
    fn test_launch_order() {
        let tmp = tempfile::tempdir().unwrap();
        let p = params(tmp.path());
        let mut t = Recorder::default();
        let summary = launch(
            &p,
            &MaskRcnnConfig::default(),
            Some(Path::new("coco.h5")),
            Layers::All,
            &dataset(3),
            &dataset(2),
            &mut t,
        )
        .unwrap();

        assert_eq!(
            t.calls,
            [
                "load coco.h5 mrcnn_class_logits,mrcnn_bbox_fc,mrcnn_bbox,mrcnn_mask",
                "train 3 2 100 All 0.001",
            ]
        );
        assert_eq!(summary.train_images, 3);
        assert_eq!(summary.val_images, 2);
        assert_eq!(summary.log_dir, p.log_dir);
    }

    #[test]
    fn test_launch_without_pretrained() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = Recorder::default();
        launch(
            &params(tmp.path()),
            &MaskRcnnConfig::default(),
            None,
            Layers::Heads,
            &dataset(1),
            &dataset(1),
            &mut t,
        )
        .unwrap();
        assert_eq!(t.calls, ["train 1 1 100 Heads 0.001"]);
    }

    #[test]
    fn test_trainer_error_is_wrapped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut t = Recorder {
            fail_train: true,
            ..Recorder::default()
        };
        let err = launch(
            &params(tmp.path()),
            &MaskRcnnConfig::default(),
            None,
            Layers::All,
            &dataset(1),
            &dataset(1),
            &mut t,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Trainer(_)));
    }

    #[test]
    fn test_model_mismatch_stops_before_trainer() {
        let tmp = tempfile::tempdir().unwrap();
        let model = MaskRcnnConfig {
            num_classes: 5,
            ..MaskRcnnConfig::default()
        };
        let mut t = Recorder::default();
        let p = params(tmp.path());
        let err = launch(&p, &model, None, Layers::All, &dataset(1), &dataset(1), &mut t)
            .unwrap_err();
        assert!(matches!(err, RunError::Model(_)));
        assert!(t.calls.is_empty());
    }

    #[test]
    fn test_run_missing_data_never_reaches_trainer() {
        let tmp = tempfile::tempdir().unwrap();
        let job = TrainJob {
            run_name: "exp1".to_string(),
            layout: LogLayout::with_root(tmp.path().join("logs")),
            train: DataSplit::under(tmp.path().join("train")),
            val: DataSplit::under(tmp.path().join("test")),
            pretrained: None,
            model: MaskRcnnConfig::default(),
            extract: ExtractOptions::default(),
            layers: Layers::default(),
        };
        let mut t = Recorder::default();
        let err = run(&job, &mut t).unwrap_err();
        assert!(matches!(err, RunError::Prepare(PrepareError::ReadDir { .. })));
        assert!(t.calls.is_empty());
        // 参数先于数据构建, 日志目录已存在.
        assert!(tmp.path().join("logs/unet/exp1/exp1_params.json").is_file());
    }

    #[test]
    fn test_run_bad_run_name() {
        let tmp = tempfile::tempdir().unwrap();
        let job = TrainJob {
            run_name: "../escape".to_string(),
            layout: LogLayout::with_root(tmp.path()),
            train: DataSplit::under(tmp.path()),
            val: DataSplit::under(tmp.path()),
            pretrained: None,
            model: MaskRcnnConfig::default(),
            extract: ExtractOptions::default(),
            layers: Layers::default(),
        };
        let err = run(&job, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::InvalidRunName(_))));
    }
}
