use super::{is_at_border, ravel, shift, unravel, Connectivity};
use crate::consts::{ElemType, MAX_COMPONENTS};
use crate::{BinaryMask, Idx3d};
use itertools::Itertools;
use log::warn;
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::ops::Deref;

/// 一个连通分量: 在给定邻接规则下极大连通的同类体素集合.
///
/// 分量由每次分析调用新鲜生成, 不在多次调用之间共享.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    shape: Idx3d,
    /// 行优先扁平索引, 升序.
    voxels: Vec<usize>,
}

impl Component {
    fn new(shape: Idx3d, mut voxels: Vec<usize>) -> Self {
        debug_assert!(!voxels.is_empty());
        voxels.sort_unstable();
        Self { shape, voxels }
    }

    /// 体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// 分量总是非空的.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// 所属体积的形状.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 行优先扁平索引, 升序.
    #[inline]
    pub fn voxels(&self) -> &[usize] {
        &self.voxels
    }

    /// 按行优先序迭代所有体素的三维索引.
    pub fn positions(&self) -> impl Iterator<Item = Idx3d> + '_ {
        self.voxels.iter().map(|i| unravel(*i, self.shape))
    }

    /// 将分量还原为与原体积同形状的二值掩膜.
    pub fn to_mask(&self) -> BinaryMask {
        BinaryMask::from_flat(self.shape, self.voxels.iter().copied())
    }

    /// 分量是否接触体积的六个表面之一.
    pub fn touches_border(&self) -> bool {
        self.positions().any(|pos| is_at_border(pos, self.shape))
    }
}

/// 一次连通分量分析的结果.
///
/// 分量按体素个数降序排列; 体素个数相同时, 按各分量首个体素
/// (行优先序) 的先后排列. 因此对相同输入多次分析, 结果完全一致.
#[derive(Debug, Clone)]
pub struct Analysis {
    components: Vec<Component>,
    total: usize,
}

impl Deref for Analysis {
    type Target = [Component];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.components
    }
}

impl Analysis {
    /// 截断前实际找到的分量个数.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// 是否因容量限制丢弃了部分分量.
    #[inline]
    pub fn overflowed(&self) -> bool {
        self.total > self.components.len()
    }

    /// 最大的分量 (若有).
    #[inline]
    pub fn largest(&self) -> Option<&Component> {
        self.components.first()
    }

    /// 消费自我, 获得分量列表.
    #[inline]
    pub fn into_components(self) -> Vec<Component> {
        self.components
    }
}

/// 连通分量分析器.
///
/// 只保留体素数最多的 `capacity` 个分量 (默认 [`MAX_COMPONENTS`]),
/// 其余分量被视为不存在. 这是为了限制计算量而设定的约束,
/// 发生截断时会记录一条警告.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ComponentAnalyzer {
    connectivity: Connectivity,
    capacity: usize,
}

impl Default for ComponentAnalyzer {
    fn default() -> Self {
        Self::new(Connectivity::Face6, MAX_COMPONENTS)
    }
}

impl ComponentAnalyzer {
    /// 初始化. `capacity` 为 0 时 panic.
    pub fn new(connectivity: Connectivity, capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            connectivity,
            capacity,
        }
    }

    /// 邻接规则.
    #[inline]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// 获取前景连通分量.
    #[inline]
    pub fn analyze(&self, mask: &BinaryMask) -> Analysis {
        self.areas(mask, ElemType::Foreground)
    }

    /// 获取背景连通分量, 等价于对 `mask.complement()` 做前景分析.
    #[inline]
    pub fn analyze_background(&self, mask: &BinaryMask) -> Analysis {
        self.areas(mask, ElemType::Background)
    }

    /// 按照邻接规则获取所有类型为 `target` 的区域. 两个体素 `p1` 和 `p2`
    /// 属于同一个区域, 当且仅当存在一条从 `p1` 到 `p2` 的相邻路径,
    /// 且路径上的所有体素 (包括 `p1` 和 `p2`) 都属于 `target`.
    fn areas(&self, mask: &BinaryMask, target: ElemType) -> Analysis {
        let shape = mask.shape();
        let data = mask.as_slice();
        let offsets = self.connectivity.offsets();
        let wanted = |p: u8| ElemType::of(p) == target;

        let mut visited = vec![false; data.len()];
        let mut bfs_q = VecDeque::with_capacity(64);
        let mut found = Vec::new();

        for start in 0..data.len() {
            if visited[start] || !wanted(data[start]) {
                continue;
            }
            visited[start] = true;
            bfs_q.push_back(start);

            let mut this_area = Vec::with_capacity(1);
            while let Some(cur) = bfs_q.pop_front() {
                this_area.push(cur);
                let cur_pos = unravel(cur, shape);
                for offset in offsets.iter() {
                    let Some(next_pos) = shift(cur_pos, *offset, shape) else {
                        continue;
                    };
                    let next = ravel(next_pos, shape);
                    if !visited[next] && wanted(data[next]) {
                        visited[next] = true;
                        bfs_q.push_back(next);
                    }
                }
            }
            found.push(Component::new(shape, this_area));
        }

        let total = found.len();
        // 稳定排序: 等大的分量保持发现顺序.
        let mut components = found
            .into_iter()
            .sorted_by_key(|c| Reverse(c.len()))
            .collect_vec();
        if total > self.capacity {
            warn!(
                "{total} {target:?} components found, only the largest {} are kept",
                self.capacity
            );
            components.truncate(self.capacity);
        }
        Analysis { components, total }
    }
}
