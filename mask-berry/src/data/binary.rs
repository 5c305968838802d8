//! 二值掩膜.

use crate::consts::gray::*;
use crate::error::ShapeMismatch;
use crate::Idx3d;
use ndarray::{Array3, ArrayView3, Zip};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 3D 二值掩膜. 体素值只可能是 `BACKGROUND` 或 `FOREGROUND`.
///
/// 内部数据以 `(z, h, w)` 标准布局 (行优先) 存储. 所有集合运算都返回新的掩膜,
/// 不修改参与运算的掩膜本身.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BinaryMask {
    data: Array3<u8>,
}

impl Index<Idx3d> for BinaryMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl BinaryMask {
    /// 创建形状为 `shape` 的全背景掩膜.
    #[inline]
    pub fn zeros(shape: Idx3d) -> Self {
        Self {
            data: Array3::zeros(shape),
        }
    }

    /// 二值化多标签数据: 所有非零体素都成为前景.
    pub fn from_labels(labels: ArrayView3<u8>) -> Self {
        Self::from_predicate(labels, is_foreground)
    }

    /// 仅选取标签值恰为 `label` 的体素作为前景.
    pub fn from_label_eq(labels: ArrayView3<u8>, label: u8) -> Self {
        Self::from_predicate(labels, |p| p == label)
    }

    /// 以 `pred` 决定每个体素是否为前景. 结果总是标准布局.
    fn from_predicate(labels: ArrayView3<u8>, pred: impl Fn(u8) -> bool) -> Self {
        let data = Array3::from_shape_fn(labels.dim(), |pos| pred(labels[pos]) as u8);
        Self { data }
    }

    /// 由裸标签数组创建掩膜. 非零体素被视为前景.
    #[inline]
    pub fn from_raw(data: Array3<u8>) -> Self {
        Self::from_labels(data.view())
    }

    /// 以 `positions` 给出的索引为前景, 创建形状为 `shape` 的掩膜.
    ///
    /// 如果存在越界索引, 则程序 panic.
    pub fn from_positions<I: IntoIterator<Item = Idx3d>>(shape: Idx3d, positions: I) -> Self {
        let mut data = Array3::zeros(shape);
        for pos in positions {
            data[pos] = FOREGROUND;
        }
        Self { data }
    }

    /// 以 `indices` 给出的行优先扁平索引为前景, 创建形状为 `shape` 的掩膜.
    pub(crate) fn from_flat<I: IntoIterator<Item = usize>>(shape: Idx3d, indices: I) -> Self {
        let mut raw = vec![BACKGROUND; shape.0 * shape.1 * shape.2];
        for i in indices {
            raw[i] = FOREGROUND;
        }
        // 长度与形状一致, 不会生成 `Err`.
        let data = Array3::from_shape_vec(shape, raw).unwrap();
        Self { data }
    }

    /// 获取数据形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 体素总数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 前景体素个数.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 是否不存在前景.
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|p| is_background(*p))
    }

    /// 索引处是否为前景. 越界时返回 `false`.
    #[inline]
    pub fn contains(&self, pos: Idx3d) -> bool {
        self.data.get(pos).is_some_and(|p| is_foreground(*p))
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 按行优先序访问底层数据.
    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        // 所有构造途径都产生标准布局, 可直接 unwrap.
        self.data.as_slice().unwrap()
    }

    /// 消费自我, 获得底层数组.
    #[inline]
    pub fn into_raw(self) -> Array3<u8> {
        self.data
    }

    /// 收集所有前景体素的索引, 结果按行优先存储.
    pub fn positions(&self) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(pos, p)| is_foreground(*p).then_some(pos))
            .collect()
    }

    /// 检查 `self` 与 `other` 形状是否一致.
    #[inline]
    pub fn check_shape(&self, other: &Self) -> Result<(), ShapeMismatch> {
        check_shape(self.shape(), other.shape())
    }

    /// 逻辑或. 形状不一致时 panic.
    pub fn union(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a | b)
    }

    /// 逻辑与. 形状不一致时 panic.
    pub fn intersection(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & b)
    }

    /// 差集 `self - other`: 在 `self` 中为前景且在 `other` 中为背景的体素.
    /// 形状不一致时 panic.
    pub fn difference(&self, other: &Self) -> Self {
        self.zip_with(other, |a, b| a & (b ^ FOREGROUND))
    }

    /// 逻辑取反: 背景变为前景, 前景变为背景.
    pub fn complement(&self) -> Self {
        Self {
            data: self.data.mapv(|p| p ^ FOREGROUND),
        }
    }

    /// `self` 的前景是否完全包含于 `other` 的前景. 形状不一致时 panic.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.assert_same_shape(other);
        Zip::from(&self.data)
            .and(&other.data)
            .all(|&a, &b| a <= b)
    }

    /// 两个掩膜取值不同的体素个数. 形状不一致时 panic.
    pub fn diff_count(&self, other: &Self) -> usize {
        self.assert_same_shape(other);
        self.as_slice()
            .iter()
            .zip(other.as_slice())
            .filter(|(a, b)| a != b)
            .count()
    }

    #[inline]
    fn assert_same_shape(&self, other: &Self) {
        assert_eq!(self.shape(), other.shape(), "掩膜形状不一致");
    }

    fn zip_with(&self, other: &Self, op: impl Fn(u8, u8) -> u8) -> Self {
        self.assert_same_shape(other);
        let raw = self
            .as_slice()
            .iter()
            .zip(other.as_slice())
            .map(|(a, b)| op(*a, *b))
            .collect();
        // 长度与形状一致, 不会生成 `Err`.
        let data = Array3::from_shape_vec(self.shape(), raw).unwrap();
        Self { data }
    }
}

/// 检查两个形状是否一致. `left` 为被比较方, `right` 为参照方.
#[inline]
pub fn check_shape(left: Idx3d, right: Idx3d) -> Result<(), ShapeMismatch> {
    if left == right {
        Ok(())
    } else {
        Err(ShapeMismatch { left, right })
    }
}
