//! 单一掩膜的修正流程: 先过滤碎片, 再修补空洞.

use crate::data::morph_3d::{ComponentFilter, HoleRepairer};
use crate::BinaryMask;
use log::debug;
use ndarray::ArrayView3;

/// 一次修正的完整结果. 修正信息以返回值显式携带, 不附加在掩膜上.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionResult {
    /// 修正后的二值掩膜.
    pub mask: BinaryMask,

    /// 过滤阶段检测到碎片化 (至少两个前景分量). 未执行过滤时为 `false`.
    pub filtered: bool,

    /// 修补阶段检测到多个背景分量. 未执行修补时为 `false`.
    pub patched: bool,

    /// 过滤阶段实际删除的体素数.
    pub removed: usize,

    /// 修补阶段实际填充的体素数.
    pub filled: usize,
}

impl CorrectionResult {
    /// 任一兼容性标志为真. 保存策略和变更日志以此为准.
    #[inline]
    pub fn flagged(&self) -> bool {
        self.filtered || self.patched
    }

    /// 体素是否真的发生了变化.
    #[inline]
    pub fn voxels_changed(&self) -> bool {
        self.removed > 0 || self.filled > 0
    }
}

/// 单一掩膜修正器, 组合了 [`ComponentFilter`] 和 [`HoleRepairer`].
///
/// 顺序固定为先过滤后修补: 小碎片先被删除, 剩余主体内部的空洞再被填充.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SingleMaskProcessor {
    filter: ComponentFilter,
    repairer: HoleRepairer,
}

impl SingleMaskProcessor {
    /// 以给定的过滤器和修补器初始化.
    pub fn new(filter: ComponentFilter, repairer: HoleRepairer) -> Self {
        Self { filter, repairer }
    }

    /// 过滤并修补 `mask`.
    #[inline]
    pub fn process(&self, mask: &BinaryMask) -> CorrectionResult {
        self.process_with(mask, true, true)
    }

    /// 将 `labels` 二值化 (非零即前景) 后修正.
    pub fn process_labels(
        &self,
        labels: ArrayView3<u8>,
        do_filter: bool,
        do_patch: bool,
    ) -> CorrectionResult {
        self.process_with(&BinaryMask::from_labels(labels), do_filter, do_patch)
    }

    /// 按开关执行过滤和修补. 关闭的阶段原样传递, 对应标志为 `false`.
    pub fn process_with(
        &self,
        mask: &BinaryMask,
        do_filter: bool,
        do_patch: bool,
    ) -> CorrectionResult {
        let (mask, filtered, removed) = if do_filter {
            let out = self.filter.filter(mask);
            (out.mask, out.fragmented, out.removed)
        } else {
            (mask.clone(), false, 0)
        };

        let (mask, patched, filled) = if do_patch {
            let out = self.repairer.patch(&mask);
            (out.mask, out.cavities, out.filled)
        } else {
            (mask, false, 0)
        };

        debug!("corrected mask: {removed} voxels removed, {filled} voxels filled");
        CorrectionResult {
            mask,
            filtered,
            patched,
            removed,
            filled,
        }
    }
}
