//! 计划训练器: 把整理好的训练会话写成 JSON, 交由外部 Mask R-CNN 进程执行.

use mri_berry::config::{Callback, MaskRcnnConfig, TrainParams};
use mri_berry::dataset::{ClassInfo, SegmentationDataset};
use mri_berry::train::{Layers, TrainSession, Trainer};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 计划训练器错误.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// 预训练权重文件不存在.
    #[error("预训练权重 `{0}` 不存在")]
    MissingWeights(PathBuf),

    /// 写出计划文件失败.
    #[error("无法写出训练计划 `{path}`")]
    Write {
        /// 文件.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: io::Error,
    },

    /// 序列化失败.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct PretrainedWeights {
    path: PathBuf,
    exclude: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Plan<'a> {
    model: &'a MaskRcnnConfig,
    params: &'a TrainParams,
    callbacks: &'a [Callback],
    learning_rate: f64,
    epochs: u32,
    layers: Layers,
    train_images: usize,
    val_images: usize,
    class_names: Vec<&'a str>,
    classes: &'a [ClassInfo],
    pretrained: Option<&'a PretrainedWeights>,
}

/// 不执行网络计算, 只记录训练会话.
#[derive(Debug, Default)]
pub struct PlanTrainer {
    pretrained: Option<PretrainedWeights>,
    written: Option<PathBuf>,
}

impl PlanTrainer {
    /// 已写出的计划文件.
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl Trainer for PlanTrainer {
    type Error = PlanError;

    fn load_weights(&mut self, path: &Path, exclude: &[&str]) -> Result<(), PlanError> {
        if !path.is_file() {
            return Err(PlanError::MissingWeights(path.to_owned()));
        }
        self.pretrained = Some(PretrainedWeights {
            path: path.to_owned(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    fn train(&mut self, session: &TrainSession<'_>) -> Result<(), PlanError> {
        let plan = Plan {
            model: session.model,
            params: session.params,
            callbacks: &session.callbacks,
            learning_rate: session.learning_rate,
            epochs: session.epochs,
            layers: session.layers,
            train_images: session.train.image_count(),
            val_images: session.val.image_count(),
            class_names: session.train.class_names(),
            classes: session.train.classes(),
            pretrained: self.pretrained.as_ref(),
        };
        let text = serde_json::to_string_pretty(&plan)?;

        let path = session
            .params
            .log_dir
            .join(format!("{}_plan.json", session.params.run_name));
        fs::write(&path, text).map_err(|source| PlanError::Write {
            path: path.clone(),
            source,
        })?;
        log::info!("training plan written to {}", path.display());

        self.written = Some(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mri_berry::config::LogLayout;
    use mri_berry::consts::COCO_EXCLUDED_LAYERS;
    use mri_berry::dataset::BrainDataset;
    use mri_berry::train::{self, RunError};
    use serde_json::Value;
    use std::fs::File;

    #[test]
    fn test_missing_weights() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("coco.h5");
        let mut t = PlanTrainer::default();
        let err = t.load_weights(&path, &COCO_EXCLUDED_LAYERS).unwrap_err();
        assert!(matches!(err, PlanError::MissingWeights(ref p) if *p == path));
        assert!(t.written().is_none());
    }

    #[test]
    fn test_plan_written_to_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let weights = tmp.path().join("coco.h5");
        File::create(&weights).unwrap();
        let params = TrainParams::build_in(&LogLayout::with_root(tmp.path()), "exp1").unwrap();
        let ds = BrainDataset::new();

        let mut t = PlanTrainer::default();
        train::launch(
            &params,
            &MaskRcnnConfig::default(),
            Some(weights.as_path()),
            Layers::Heads,
            &ds,
            &ds,
            &mut t,
        )
        .unwrap();

        let written = t.written().unwrap();
        assert_eq!(written, params.log_dir.join("exp1_plan.json"));
        let plan: Value = serde_json::from_str(&fs::read_to_string(written).unwrap()).unwrap();
        assert_eq!(plan["layers"], "heads");
        assert_eq!(plan["epochs"], 100);
        assert_eq!(plan["learning_rate"], 0.001);
        assert_eq!(plan["train_images"], 0);
        assert_eq!(plan["class_names"], serde_json::json!(["BG", "brain"]));
        assert_eq!(plan["classes"][0]["source"], "MRI");
        assert_eq!(plan["classes"][0]["id"], 1);
        assert_eq!(plan["callbacks"].as_array().unwrap().len(), 4);
        assert_eq!(plan["pretrained"]["exclude"][3], "mrcnn_mask");
    }

    #[test]
    fn test_missing_weights_stops_launch() {
        let tmp = tempfile::tempdir().unwrap();
        let params = TrainParams::build_in(&LogLayout::with_root(tmp.path()), "exp1").unwrap();
        let ds = BrainDataset::new();

        let mut t = PlanTrainer::default();
        let err = train::launch(
            &params,
            &MaskRcnnConfig::default(),
            Some(tmp.path().join("absent.h5").as_path()),
            Layers::All,
            &ds,
            &ds,
            &mut t,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Trainer(_)));
        assert!(t.written().is_none());
        assert!(!params.log_dir.join("exp1_plan.json").exists());
    }
}
