use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod plan;
mod runner;

/// 胎儿脑部 MRI 的 Mask R-CNN 训练启动器.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// 日志级别.
    #[arg(long, global = true, default_value = "info")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 构建参数与数据集, 并交给训练器.
    Train {
        /// 实验名, 用于日志与权重的命名.
        #[arg(long)]
        exp: String,

        /// 数据根目录, 其下有 `train/` 与 `test/`.
        #[arg(long, env = utils::loader::DATA_DIR_ENV)]
        data_dir: Option<PathBuf>,

        /// 预训练权重. 缺省时使用当前目录下的 COCO 权重 (若存在).
        #[arg(long)]
        pretrained: Option<PathBuf>,

        /// 从头训练, 不加载任何预训练权重.
        #[arg(long, conflicts_with = "pretrained")]
        from_scratch: bool,

        /// 只训练输出头, 不更新骨干网络.
        #[arg(long, conflicts_with = "from_scratch")]
        heads_only: bool,

        /// 丢弃全背景切片而不是报错.
        #[arg(long)]
        skip_blank: bool,
    },

    /// 将数据集切片导出为 PNG, 便于检查.
    Vis {
        /// 图像目录.
        #[arg(long)]
        images: PathBuf,

        /// 掩码目录.
        #[arg(long)]
        masks: PathBuf,

        /// 输出目录.
        #[arg(long)]
        out: PathBuf,

        /// 丢弃全背景切片而不是报错.
        #[arg(long)]
        skip_blank: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .with_level(cli.log_level)
        .init()?;

    match cli.command {
        Command::Train {
            exp,
            data_dir,
            pretrained,
            from_scratch,
            heads_only,
            skip_blank,
        } => runner::train(runner::TrainArgs {
            exp,
            data_dir,
            pretrained,
            from_scratch,
            heads_only,
            skip_blank,
        }),
        Command::Vis {
            images,
            masks,
            out,
            skip_blank,
        } => runner::vis(&images, &masks, &out, skip_blank),
    }
}
