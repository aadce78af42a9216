//! 程序运行函数.

use crate::plan::PlanTrainer;
use anyhow::{anyhow, Context};
use mri_berry::config::{LogLayout, MaskRcnnConfig};
use mri_berry::consts::COCO_WEIGHTS_FILE;
use mri_berry::dataset::{export_png, BlankSlicePolicy, BrainDataset, ExtractOptions};
use mri_berry::train::{self, Layers, TrainJob};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use utils::loader;

/// `train` 子命令的参数.
#[derive(Debug)]
pub struct TrainArgs {
    pub exp: String,
    pub data_dir: Option<PathBuf>,
    pub pretrained: Option<PathBuf>,
    pub from_scratch: bool,
    pub heads_only: bool,
    pub skip_blank: bool,
}

fn extract_options(skip_blank: bool) -> ExtractOptions {
    ExtractOptions {
        blank_slices: if skip_blank {
            BlankSlicePolicy::Skip
        } else {
            BlankSlicePolicy::Fail
        },
    }
}

/// 优先级: `--from-scratch` > `--pretrained` > `coco`.
///
/// 显式给出的权重原样返回, 是否存在由训练器检查;
/// 缺省的 COCO 权重不存在时退化为从头训练.
fn resolve_pretrained(args: &TrainArgs, coco: &Path) -> Option<PathBuf> {
    if args.from_scratch {
        return None;
    }
    if let Some(p) = &args.pretrained {
        return Some(p.clone());
    }
    if coco.is_file() {
        Some(coco.to_owned())
    } else {
        log::warn!("{} not found, training from scratch", coco.display());
        None
    }
}

/// 实际运行训练.
pub fn train(args: TrainArgs) -> anyhow::Result<()> {
    let root = loader::data_dir(args.data_dir.as_deref())
        .ok_or_else(|| anyhow!("cannot locate data dir, pass --data-dir"))?;
    log::info!("data dir: {}", root.display());

    let job = TrainJob {
        run_name: args.exp.clone(),
        layout: LogLayout::default(),
        train: loader::train_split(&root),
        val: loader::val_split(&root),
        pretrained: resolve_pretrained(&args, Path::new(COCO_WEIGHTS_FILE)),
        model: MaskRcnnConfig::default(),
        extract: extract_options(args.skip_blank),
        layers: if args.heads_only {
            Layers::Heads
        } else {
            Layers::All
        },
    };

    let mut trainer = PlanTrainer::default();
    let summary = train::run(&job, &mut trainer)
        .with_context(|| format!("run `{}` failed", args.exp))?;

    let mut out = io::stdout().lock();
    utils::sep_to(&mut out)?;
    writeln!(out, "Run `{}`:", args.exp)?;
    writeln!(out, "    Training slices: {}", summary.train_images)?;
    writeln!(out, "    Validation slices: {}", summary.val_images)?;
    writeln!(out, "    Log dir: {}", summary.log_dir.display())?;
    if let Some(plan) = trainer.written() {
        writeln!(out, "    Plan: {}", plan.display())?;
    }
    utils::sep_to(&mut out)?;
    Ok(())
}

/// 导出切片 PNG.
pub fn vis(images: &Path, masks: &Path, out: &Path, skip_blank: bool) -> anyhow::Result<()> {
    let dataset = BrainDataset::load_brain_data(images, masks, extract_options(skip_blank))?;
    let n = export_png(&dataset, out)
        .with_context(|| format!("export to {}", out.display()))?;
    println!("Exported {n} slices to {}", out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn args(pretrained: Option<&Path>, from_scratch: bool) -> TrainArgs {
        TrainArgs {
            exp: "exp1".to_string(),
            data_dir: None,
            pretrained: pretrained.map(Path::to_path_buf),
            from_scratch,
            heads_only: false,
            skip_blank: false,
        }
    }

    #[test]
    fn test_resolve_pretrained_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        let coco = tmp.path().join(COCO_WEIGHTS_FILE);
        File::create(&coco).unwrap();
        let explicit = tmp.path().join("mine.h5");

        assert_eq!(resolve_pretrained(&args(None, true), &coco), None);
        assert_eq!(
            resolve_pretrained(&args(Some(&explicit), false), &coco),
            Some(explicit.clone())
        );
        assert_eq!(resolve_pretrained(&args(None, false), &coco), Some(coco));
    }

    #[test]
    fn test_missing_coco_falls_back_to_scratch() {
        let tmp = tempfile::tempdir().unwrap();
        let coco = tmp.path().join(COCO_WEIGHTS_FILE);
        assert_eq!(resolve_pretrained(&args(None, false), &coco), None);

        // 显式路径不做存在性检查.
        let explicit = tmp.path().join("missing.h5");
        assert_eq!(
            resolve_pretrained(&args(Some(&explicit), false), &coco),
            Some(explicit)
        );
    }

    #[test]
    fn test_extract_options() {
        assert_eq!(extract_options(true).blank_slices, BlankSlicePolicy::Skip);
        assert_eq!(extract_options(false).blank_slices, BlankSlicePolicy::Fail);
    }
}
