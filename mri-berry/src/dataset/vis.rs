//! 数据集的可视化导出.

use super::{BrainDataset, CatalogEntry};
use image::{GrayImage, ImageResult, Luma};
use ndarray::{ArrayView2, Axis};
use std::path::Path;

/// 将单通道视图写入灰度图. 第一维为高, 第二维为宽.
fn save_gray<P: AsRef<Path>>(view: ArrayView2<u8>, path: P) -> ImageResult<()> {
    let (height, width) = view.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), &pix) in view.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, Luma([pix]));
    }
    buf.save(path)
}

fn save_entry(entry: &CatalogEntry, dir: &Path) -> ImageResult<()> {
    let id = entry.meta.id;
    save_gray(
        entry.image.index_axis(Axis(2), 0),
        dir.join(format!("{id}_img.png")),
    )?;
    save_gray(
        entry.mask.index_axis(Axis(2), 0),
        dir.join(format!("{id}_msk.png")),
    )
}

/// 将数据集中每个条目导出为 `{id}_img.png` (图像第一个通道) 与
/// `{id}_msk.png` (掩码), 便于肉眼检查切片和掩码是否对齐.
///
/// `dir` 不存在时会被创建. 返回导出的条目个数.
pub fn export_png<P: AsRef<Path>>(dataset: &BrainDataset, dir: P) -> ImageResult<usize> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    for entry in dataset.iter() {
        save_entry(entry, dir)?;
    }
    log::info!("exported {} slices to {}", dataset.iter().len(), dir.display());
    Ok(dataset.iter().len())
}
