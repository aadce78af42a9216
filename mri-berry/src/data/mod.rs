use std::path::Path;

use ndarray::{Array3, ArrayView, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::gray::{LABEL_BACKGROUND, LABEL_FOREGROUND};
use crate::{Idx2d, Idx3d};

mod normalize;
mod slice;

pub use normalize::{gray_to_rgb, normalize_0_255, NormalizeError};
pub use slice::{LabelSlice, ScanSlice};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 打开 nii 体数据失败.
#[derive(Debug, thiserror::Error)]
pub enum OpenVolumeError {
    /// 文件不存在、格式损坏等 nifti 层面的错误.
    #[error("无法读取 nifti 文件: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 体数据不是三维的.
    #[error("体数据应为三维, 实际为 {0} 维")]
    NotThreeDimensional(usize),

    /// 扫描与标注的切片个数不一致.
    #[error("扫描有 {scan} 张切片, 标注有 {label} 张切片")]
    SliceCountMismatch {
        /// 扫描切片数.
        scan: usize,
        /// 标注切片数.
        label: usize,
    },
}

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 读取 nii 文件, 返回 header 和 `(z, H, W)` 标准布局的体数据.
fn read_volume(path: &Path) -> Result<(BoxedHeader, Array3<f32>), OpenVolumeError> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());

    let data = obj.into_volume().into_ndarray::<f32>()?;
    let ndim = data.ndim();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| OpenVolumeError::NotThreeDimensional(ndim))?;

    // [W, H, z] -> [z, H, W].
    // hint: 原第一维向下增长, 原第二维向右增长.
    Ok((header, into_standard(data.permuted_axes([2, 1, 0]))))
}

#[inline]
fn into_standard<T: Clone>(data: Array3<T>) -> Array3<T> {
    if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    }
}

/// 为内存中直接构造的体数据生成 header. `data` 为 `(z, H, W)` 布局.
fn fake_header<T>(data: &Array3<T>) -> BoxedHeader {
    let (z, h, w) = data.dim();
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    header.pixdim = [1.0; 8];
    header.intent_name[..4].copy_from_slice(b"fake");
    header
}

/// 3D nii 文件 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小, `(z, H, W)`.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取单个体素分辨率, 以毫米为单位, 依次为 z, 高, 宽.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 判断该结构是否是在内存中手动拼接的.
    fn is_faked(&self) -> bool {
        self.header().intent_name.starts_with(b"fake")
    }
}

/// nii 格式 3D MRI 扫描. 强度以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct MriScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for MriScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl MriScan {
    /// 打开 nii 文件格式的 3D MRI 扫描. `path` 为 nii 文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let (header, data) = read_volume(path.as_ref())?;
        Ok(Self { header, data })
    }

    /// 根据 `(z, H, W)` 布局的裸数据直接创建扫描, 体素分辨率均为 1mm.
    pub fn from_array(data: Array3<f32>) -> Self {
        let data = into_standard(data);
        Self {
            header: fake_header(&data),
            data,
        }
    }

    /// 获取第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ScanSlice<'_> {
        ScanSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ScanSlice> {
        self.data.axis_iter(Axis(0)).map(ScanSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }
}

/// nii 格式 3D MRI 标注. 加载时二值化: 非零体素为
/// [`LABEL_FOREGROUND`], 其余为 [`LABEL_BACKGROUND`].
#[derive(Debug, Clone)]
pub struct MriLabel {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for MriLabel {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

#[inline]
fn binarize(v: f32) -> u8 {
    if v != 0.0 {
        LABEL_FOREGROUND
    } else {
        LABEL_BACKGROUND
    }
}

impl MriLabel {
    /// 打开 nii 文件格式的 3D MRI 标注.
    ///
    /// 标注可能以浮点格式存储, 因此先按 `f32` 读取再二值化.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let (header, data) = read_volume(path.as_ref())?;
        Ok(Self {
            header,
            data: data.mapv(binarize),
        })
    }

    /// 根据 `(z, H, W)` 布局的裸数据直接创建标注. 非零值视为前景.
    pub fn from_array(data: Array3<u8>) -> Self {
        let data = into_standard(data.mapv(|v| binarize(v as f32)));
        Self {
            header: fake_header(&data),
            data,
        }
    }

    /// 获取第 `z_index` 层切片视图.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> LabelSlice<'_> {
        LabelSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = LabelSlice> {
        self.data.axis_iter(Axis(0)).map(LabelSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 前景体素个数.
    #[inline]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|p| **p == LABEL_FOREGROUND).count()
    }
}

/// nii 格式的 3D MRI 扫描与对应的标注.
///
/// 两者切片个数必须相同; 切片的高宽则不做要求,
/// 由切片提取阶段按截断规则处理.
#[derive(Debug, Clone)]
pub struct MriData3d {
    /// 3D MRI 扫描.
    pub scan: MriScan,

    /// 3D MRI 标注.
    pub label: MriLabel,
}

impl MriData3d {
    /// 组合已有的扫描和标注. 切片个数不一致时返回 `Err`.
    pub fn new(scan: MriScan, label: MriLabel) -> Result<Self, OpenVolumeError> {
        if scan.len_z() != label.len_z() {
            return Err(OpenVolumeError::SliceCountMismatch {
                scan: scan.len_z(),
                label: label.len_z(),
            });
        }
        Ok(Self { scan, label })
    }

    /// 获取切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.scan.len_z()
    }

    /// 获取第 `z_index` 层 (扫描, 标注) 切片.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> (ScanSlice<'_>, LabelSlice<'_>) {
        (self.scan.slice_at(z_index), self.label.slice_at(z_index))
    }

    /// 获取能按升序迭代 (扫描, 标注) 切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = (ScanSlice, LabelSlice)> {
        self.scan.slice_iter().zip(self.label.slice_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_from_array_shape() {
        let scan = MriScan::from_array(Array3::zeros((4, 3, 2)));
        assert_eq!(scan.shape(), (4, 3, 2));
        assert_eq!(scan.slice_shape(), (3, 2));
        assert_eq!(scan.len_z(), 4);
        assert!(scan.is_faked());
        assert_eq!(scan.pix_dim(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_label_is_binarized() {
        let mut raw = Array3::<u8>::zeros((1, 2, 2));
        raw[(0, 0, 0)] = 3;
        raw[(0, 1, 1)] = 1;
        let label = MriLabel::from_array(raw);
        assert_eq!(label.foreground_count(), 2);
        assert_eq!(label.data()[(0, 0, 0)], LABEL_FOREGROUND);
        assert_eq!(label.data()[(0, 0, 1)], LABEL_BACKGROUND);
    }

    #[test]
    fn test_slice_count_mismatch() {
        let scan = MriScan::from_array(Array3::zeros((3, 2, 2)));
        let label = MriLabel::from_array(Array3::zeros((2, 2, 2)));
        assert!(matches!(
            MriData3d::new(scan, label),
            Err(OpenVolumeError::SliceCountMismatch { scan: 3, label: 2 })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            MriScan::open("/definitely/not/here.nii"),
            Err(OpenVolumeError::Nifti(_))
        ));
    }

    #[test]
    fn test_slice_iter_pairs() {
        let scan = MriScan::from_array(Array3::from_shape_fn((3, 2, 2), |(z, _, _)| z as f32));
        let label = MriLabel::from_array(Array3::zeros((3, 2, 2)));
        let data = MriData3d::new(scan, label).unwrap();
        assert_eq!(data.slice_iter().len(), 3);
        let (s, l) = data.slice_at(2);
        assert_eq!(s[(0, 0)], 2.0);
        assert_eq!(l[(1, 1)], LABEL_BACKGROUND);
    }
}
