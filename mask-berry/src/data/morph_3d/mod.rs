//! 3D 形态学操作.
//!
//! 包括连通分量分析 ([`ComponentAnalyzer`]), 碎片过滤 ([`ComponentFilter`])
//! 和背景空洞修补 ([`HoleRepairer`]). 三者在整个系统中共用同一种邻接规则,
//! 默认为 6-邻接 (面相邻).

use crate::Idx3d;
use itertools::iproduct;

mod component;
mod filter;
mod hole;

pub use component::{Analysis, Component, ComponentAnalyzer};
pub use filter::{ComponentFilter, Filtered};
pub use hole::{HoleRepairer, Patched};

/// 三维偏移量.
pub(crate) type Offset3d = (isize, isize, isize);

/// 体素邻接规则.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Connectivity {
    /// 6-邻接: 仅共享一个面的体素相邻.
    #[default]
    Face6,

    /// 18-邻接: 共享一个面或一条棱的体素相邻.
    Edge18,

    /// 26-邻接: 共享面, 棱或顶点的体素都相邻.
    Vertex26,
}

impl Connectivity {
    /// 获取所有邻居偏移量. 顺序固定 (字典序), 保证遍历的稳定性.
    pub fn offsets(&self) -> Vec<Offset3d> {
        let max_moved = match self {
            Connectivity::Face6 => 1,
            Connectivity::Edge18 => 2,
            Connectivity::Vertex26 => 3,
        };
        iproduct!(-1isize..=1, -1isize..=1, -1isize..=1)
            .filter(|&(z, h, w)| {
                let moved = (z != 0) as u8 + (h != 0) as u8 + (w != 0) as u8;
                (1..=max_moved).contains(&moved)
            })
            .collect()
    }

    /// 邻居个数.
    #[inline]
    pub fn neighbour_count(&self) -> usize {
        match self {
            Connectivity::Face6 => 6,
            Connectivity::Edge18 => 18,
            Connectivity::Vertex26 => 26,
        }
    }
}

/// 行优先扁平索引 -> `(z, h, w)`.
#[inline]
pub(crate) const fn unravel(index: usize, (_, h, w): Idx3d) -> Idx3d {
    (index / (h * w), index / w % h, index % w)
}

/// `(z, h, w)` -> 行优先扁平索引.
#[inline]
pub(crate) const fn ravel((z, h, w): Idx3d, (_, sh, sw): Idx3d) -> usize {
    (z * sh + h) * sw + w
}

/// 计算 `pos + offset`. 结果越界 (包括下溢) 时返回 `None`.
#[inline]
pub(crate) fn shift(pos: Idx3d, offset: Offset3d, shape: Idx3d) -> Option<Idx3d> {
    let z = pos.0.checked_add_signed(offset.0).filter(|v| *v < shape.0)?;
    let h = pos.1.checked_add_signed(offset.1).filter(|v| *v < shape.1)?;
    let w = pos.2.checked_add_signed(offset.2).filter(|v| *v < shape.2)?;
    Some((z, h, w))
}

/// 索引是否位于长方体的六个表面之一.
#[inline]
pub(crate) fn is_at_border((z, h, w): Idx3d, (sz, sh, sw): Idx3d) -> bool {
    z == 0 || h == 0 || w == 0 || z + 1 == sz || h + 1 == sh || w + 1 == sw
}
