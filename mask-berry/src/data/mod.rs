use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3};
use nifti::writer::WriterOptions;
use log::warn;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::gray::{BACKGROUND, OTHER_FOREGROUND};
use crate::error::{QcError, Result};
use crate::Idx3d;

mod binary;
mod combined;
pub mod morph_3d;

pub use binary::{check_shape, BinaryMask};
pub use combined::{join_zones, split_combined};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 3D nii 文件 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }
}

/// nii 格式 3D 分割掩膜, 包括 header (空间参考信息) 和标签. 标签值以 `u8` 保存.
///
/// 标签可能是多值的 (例如合并分区掩膜), 通过 [`Self::binarize`]
/// 或 [`Self::split_combined`] 进入二值处理流程.
#[derive(Debug, Clone)]
pub struct MaskVolume {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for MaskVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MaskVolume {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

/// 文件是否是 `.mhd` 格式. 目前只能识别, 无法读取.
#[inline]
fn is_meta_image(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("mhd"))
}

/// 将体素值转换为 `u8` 标签, 同时返回该值是否恰好是合法标签.
///
/// - 非正值 (包括 NaN) 为背景;
/// - 四舍五入后落在 `1..=254` 的正值取该整数;
/// - 其它正值 (例如 `0.3` 或 `256`) 为 [`OTHER_FOREGROUND`].
///
/// 因此 `> 0` 的二值化规则总是成立, 且不会有任何值回绕.
fn narrow_label(v: f64) -> (u8, bool) {
    if v.is_nan() || v <= 0.0 {
        return (BACKGROUND, v == 0.0);
    }
    let r = v.round();
    if (1.0..OTHER_FOREGROUND as f64).contains(&r) {
        (r as u8, r == v)
    } else {
        (OTHER_FOREGROUND, false)
    }
}

impl MaskVolume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D 掩膜. `path` 为文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_meta_image(path) {
            return Err(QcError::UnsupportedFormat(path.to_owned()));
        }
        let obj = ReaderOptions::new().read_file(path)?;
        let header = Box::new(obj.header().clone());

        // nifti 数据按 [W, H, z] 列优先排列, 其内存序恰为 [z, H, W] 的行优先序.
        // 先以 f64 读取, 避免浮点与宽整数标签在转换为 u8 时被截断或回绕.
        let data = obj.into_volume().into_ndarray::<f64>()?;
        debug_assert!(data.t().is_standard_layout());

        let mut irregular = 0;
        let labels = data
            .into_raw_vec()
            .into_iter()
            .map(|v| {
                let (label, exact) = narrow_label(v);
                irregular += usize::from(!exact);
                label
            })
            .collect();
        if irregular > 0 {
            warn!(
                "{irregular} voxels in `{}` are not labels in 0..=254, kept as foreground",
                path.display()
            );
        }
        let data = Array3::from_shape_vec(get_shape_from_header(&header), labels)?;

        Ok(Self { header, data })
    }

    /// 根据裸标签数据创建实体, 使用默认 header (单位体素分辨率).
    ///
    /// `data` 按照 \[z, h, w\] 格式组织.
    pub fn from_raw(data: Array3<u8>) -> Self {
        Self::with_header(&NiftiHeader::default(), data)
    }

    /// 以 `header` 为空间参考信息, 直接创建数据.
    ///
    /// `data` 按照 \[z, h, w\] 格式组织.
    pub fn with_header(header: &NiftiHeader, data: Array3<u8>) -> Self {
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };
        Self {
            header: Box::new(header.clone()),
            data,
        }
    }

    /// 以二值掩膜 `mask` 为数据, 复制 `self` 的空间参考信息, 创建新实体.
    #[inline]
    pub fn derive(&self, mask: &BinaryMask) -> Self {
        self.derive_labels(mask.data().to_owned())
    }

    /// 以标签数组 `data` 为数据, 复制 `self` 的空间参考信息, 创建新实体.
    #[inline]
    pub fn derive_labels(&self, data: Array3<u8>) -> Self {
        Self::with_header(&self.header, data)
    }

    /// 以 nii 格式保存到 `path`. 后缀为 `.gz` 时会压缩.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // [z, H, W] -> [W, H, z]
        let data = self.data.view().reversed_axes();
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&data)?;
        Ok(())
    }

    /// 获取数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 将所有非零标签视为前景, 获得二值掩膜.
    #[inline]
    pub fn binarize(&self) -> BinaryMask {
        BinaryMask::from_labels(self.data())
    }

    /// 将合并分区掩膜拆分为 `(外周带, 中央带)`.
    #[inline]
    pub fn split_combined(&self) -> (BinaryMask, BinaryMask) {
        split_combined(self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::{narrow_label, MaskVolume, NiftiHeaderAttr};
    use crate::consts::gray::OTHER_FOREGROUND;
    use crate::QcError;
    use ndarray::Array3;

    #[test]
    fn test_derive_keeps_header() {
        let mut raw = Array3::<u8>::zeros((2, 3, 4));
        raw[(1, 2, 3)] = 2;
        let mut header = nifti::NiftiHeader::default();
        header.pixdim = [1.0, 0.5, 0.5, 3.0, 1.0, 1.0, 1.0, 1.0];
        let vol = MaskVolume::with_header(&header, raw);

        let derived = vol.derive(&vol.binarize().complement());
        assert_eq!(derived.shape(), (2, 3, 4));
        assert_eq!(derived.pix_dim(), [3.0, 0.5, 0.5]);
        assert!((derived.voxel() - 0.75).abs() < 1e-12);
        assert_eq!(derived[(1, 2, 3)], 0);
        assert_eq!(derived[(0, 0, 0)], 1);
    }

    #[test]
    fn test_narrow_label() {
        assert_eq!(narrow_label(0.0), (0, true));
        assert_eq!(narrow_label(2.0), (2, true));
        assert_eq!(narrow_label(1.2), (1, false));
        assert_eq!(narrow_label(0.4), (OTHER_FOREGROUND, false));
        assert_eq!(narrow_label(256.0), (OTHER_FOREGROUND, false));
        assert_eq!(narrow_label(-3.0), (0, false));
        assert_eq!(narrow_label(f64::NAN), (0, false));
    }

    #[test]
    fn test_mhd_is_unsupported() {
        let err = MaskVolume::open("case_0001.mhd").unwrap_err();
        assert!(matches!(err, QcError::UnsupportedFormat(_)));
    }
}
