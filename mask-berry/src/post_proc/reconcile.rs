//! 分区掩膜 (外周带 / 中央带) 的一致性修正.

use super::{CorrectionResult, SingleMaskProcessor};
use crate::data::morph_3d::ComponentFilter;
use crate::error::ShapeMismatch;
use crate::BinaryMask;
use log::debug;

/// 外部整体掩膜与 `外周带 ∪ 中央带` 的比对结果. 仅用于诊断, 不影响修正.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WholeCheck {
    /// 未提供外部整体掩膜.
    Skipped,

    /// 逐体素完全一致.
    Match,

    /// 存在 `voxels` 个不一致的体素.
    Mismatch {
        /// 不一致的体素数.
        voxels: usize,
    },

    /// 形状不一致, 无法比较. 作为警告处理, 不视为不一致.
    ShapeMismatch(ShapeMismatch),
}

impl WholeCheck {
    /// 比较 `union` 与外部整体掩膜 `external`.
    pub fn compare(union: &BinaryMask, external: Option<&BinaryMask>) -> Self {
        let Some(external) = external else {
            return Self::Skipped;
        };
        if let Err(e) = union.check_shape(external) {
            return Self::ShapeMismatch(e);
        }
        match union.diff_count(external) {
            0 => Self::Match,
            voxels => Self::Mismatch { voxels },
        }
    }

    /// 是否发现了逐体素的不一致.
    #[inline]
    pub fn mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }

    /// 是否实际进行了比较 (提供了外部掩膜且形状一致).
    #[inline]
    pub fn compared(&self) -> bool {
        matches!(self, Self::Match | Self::Mismatch { .. })
    }
}

/// 一个病例的分区修正结果.
#[derive(Debug, Clone)]
pub struct ZoneOutcome {
    /// 对 `外周带 ∪ 中央带` 的修正.
    pub whole: CorrectionResult,

    /// 对原始中央带的修正. 中央带输出即为该结果的掩膜.
    pub central: CorrectionResult,

    /// 对原始外周带的修正 (尚未并入游离体素).
    pub peripheral: CorrectionResult,

    /// 并入游离体素后的外周带, 即外周带输出.
    pub final_peripheral: BinaryMask,

    /// 从中央带中剔除, 改判为外周带的游离体素.
    pub strays: BinaryMask,

    /// 对整体掩膜约束后的中央带进行过滤时检测到碎片化.
    pub strays_converted: bool,

    /// 外部整体掩膜的比对结果.
    pub whole_check: WholeCheck,
}

impl ZoneOutcome {
    /// 修正后的整体掩膜.
    #[inline]
    pub fn corrected_whole(&self) -> &BinaryMask {
        &self.whole.mask
    }

    /// 修正后的中央带.
    #[inline]
    pub fn corrected_central(&self) -> &BinaryMask {
        &self.central.mask
    }

    /// 外部整体掩膜是否与分区并集不一致.
    #[inline]
    pub fn mismatch(&self) -> bool {
        self.whole_check.mismatch()
    }

    /// `修正后整体 != 修正后中央带 ∪ 最终外周带` 的体素数.
    ///
    /// 对于常见输入该值为 0. 但中央带独立修正时保留了被整体修正删除的分量
    /// (或反之) 时, 该值可能为正.
    pub fn union_violations(&self) -> usize {
        let union = self.central.mask.union(&self.final_peripheral);
        self.whole.mask.diff_count(&union)
    }
}

/// 分区一致性修正器.
///
/// 算法:
///
/// 1. `whole = 外周带 ∪ 中央带`. 它是修正所用的唯一整体掩膜,
///   外部整体掩膜只参与比对.
/// 2. 若提供了外部整体掩膜, 与 `whole` 逐体素比对.
/// 3. 独立修正 `whole`, 原始中央带和原始外周带.
/// 4. 用修正后的整体约束原始中央带, 再过滤. 被过滤掉的体素即游离体素.
/// 5. 游离体素并入修正后的外周带.
///
/// 中央带输出为第 3 步对原始中央带的修正, **不** 扣除游离体素.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ZoneReconciler {
    processor: SingleMaskProcessor,
    filter: ComponentFilter,
}

impl ZoneReconciler {
    /// 以给定的修正器和 (游离体素检测所用的) 过滤器初始化.
    pub fn new(processor: SingleMaskProcessor, filter: ComponentFilter) -> Self {
        Self { processor, filter }
    }

    /// 修正一个病例的分区掩膜.
    ///
    /// 外周带与中央带形状不一致时返回 `Err`, 因为此时无法构造整体掩膜.
    /// 外部整体掩膜形状不一致只记录在 [`ZoneOutcome::whole_check`] 中.
    pub fn reconcile(
        &self,
        peripheral: &BinaryMask,
        central: &BinaryMask,
        external_whole: Option<&BinaryMask>,
    ) -> Result<ZoneOutcome, ShapeMismatch> {
        peripheral.check_shape(central)?;

        let union = peripheral.union(central);
        let whole_check = WholeCheck::compare(&union, external_whole);
        let whole = self.processor.process(&union);
        let central_corrected = self.processor.process(central);

        let masked_central = central.intersection(&whole.mask);
        let filtered = self.filter.filter(&masked_central);
        let strays = masked_central.difference(&filtered.mask);

        let peripheral_corrected = self.processor.process(peripheral);
        let final_peripheral = peripheral_corrected.mask.union(&strays);
        debug!(
            "reconciled zones: {} stray voxels moved to peripheral",
            strays.count()
        );

        Ok(ZoneOutcome {
            whole,
            central: central_corrected,
            peripheral: peripheral_corrected,
            final_peripheral,
            strays,
            strays_converted: filtered.fragmented,
            whole_check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{WholeCheck, ZoneReconciler};
    use crate::BinaryMask;

    const SHAPE: (usize, usize, usize) = (10, 10, 10);

    /// `z` 范围内, h 和 w 都在 `1..=8` 的长方体.
    fn slab(z: std::ops::RangeInclusive<usize>) -> BinaryMask {
        let pos = z.flat_map(|z| (1..=8).flat_map(move |h| (1..=8).map(move |w| (z, h, w))));
        BinaryMask::from_positions(SHAPE, pos)
    }

    fn voxel(pos: (usize, usize, usize)) -> BinaryMask {
        BinaryMask::from_positions(SHAPE, [pos])
    }

    /// 外周带缺一个角, 该体素被错误地标为了中央带 (且与中央带主体不相连).
    #[test]
    fn test_stray_moves_to_peripheral() {
        let corner = voxel((1, 1, 1));
        let p = slab(1..=4).difference(&corner);
        let c = slab(5..=8).union(&corner);

        let out = ZoneReconciler::default().reconcile(&p, &c, None).unwrap();
        assert_eq!(out.whole_check, WholeCheck::Skipped);
        assert_eq!(out.corrected_whole(), &slab(1..=8));
        assert_eq!(out.strays, corner);
        assert!(out.strays_converted);
        assert_eq!(out.final_peripheral, slab(1..=4));
        assert_eq!(out.corrected_central(), &slab(5..=8));
        assert!(out.central.filtered);
        assert!(!out.peripheral.filtered);
        assert_eq!(out.union_violations(), 0);
    }

    /// 一致的分区不产生游离体素.
    #[test]
    fn test_clean_zones() {
        let p = slab(1..=4);
        let c = slab(5..=8);
        let out = ZoneReconciler::default().reconcile(&p, &c, None).unwrap();
        assert!(out.strays.is_empty());
        assert!(!out.strays_converted);
        assert_eq!(out.final_peripheral, p);
        assert_eq!(out.corrected_central(), &c);
        assert!(!out.whole.flagged());
        assert_eq!(out.union_violations(), 0);
    }

    /// 外部整体掩膜多一个体素: 报告不一致, 但修正后的整体不受影响.
    #[test]
    fn test_external_whole_mismatch() {
        let p = slab(1..=4);
        let c = slab(5..=8);
        let external = slab(1..=8).union(&voxel((9, 9, 9)));

        let r = ZoneReconciler::default();
        let checked = r.reconcile(&p, &c, Some(&external)).unwrap();
        assert!(checked.mismatch());
        assert_eq!(checked.whole_check, WholeCheck::Mismatch { voxels: 1 });
        assert!(checked.whole_check.compared());

        let unchecked = r.reconcile(&p, &c, None).unwrap();
        assert!(!unchecked.mismatch());
        assert_eq!(checked.corrected_whole(), unchecked.corrected_whole());
        assert_eq!(checked.corrected_whole(), &slab(1..=8));

        let same = r.reconcile(&p, &c, Some(&slab(1..=8))).unwrap();
        assert_eq!(same.whole_check, WholeCheck::Match);
    }

    /// 外部整体掩膜形状不一致只是警告.
    #[test]
    fn test_external_whole_shape_mismatch() {
        let p = slab(1..=4);
        let c = slab(5..=8);
        let external = BinaryMask::zeros((10, 10, 11));
        let out = ZoneReconciler::default()
            .reconcile(&p, &c, Some(&external))
            .unwrap();
        assert!(matches!(out.whole_check, WholeCheck::ShapeMismatch(_)));
        assert!(!out.mismatch());
        assert!(!out.whole_check.compared());
    }

    /// 外周带与中央带形状不一致时无法修正.
    #[test]
    fn test_zone_shape_mismatch_is_error() {
        let p = BinaryMask::zeros((2, 2, 2));
        let c = BinaryMask::zeros((2, 2, 3));
        let err = ZoneReconciler::default().reconcile(&p, &c, None).unwrap_err();
        assert_eq!(err.left, (2, 2, 2));
        assert_eq!(err.right, (2, 2, 3));
    }

    /// 中央带输出直接取自原始中央带的修正, 不扣除游离体素.
    ///
    /// 孤立的 8 体素中央带分量相对整体 (320) 足够小, 被整体修正删除;
    /// 但相对中央带主体 (64) 不够小, 在中央带修正中被保留.
    /// 因此它出现在中央带输出中, 却不在修正后的整体中.
    #[test]
    fn test_central_output_keeps_own_correction() {
        let p = slab(1..=4);
        let body = BinaryMask::from_positions(
            SHAPE,
            (1..=8).flat_map(|h| (1..=8).map(move |w| (5, h, w))),
        );
        let islet = BinaryMask::from_positions(
            SHAPE,
            [
                (7, 1, 1),
                (7, 1, 2),
                (7, 2, 1),
                (7, 2, 2),
                (8, 1, 1),
                (8, 1, 2),
                (8, 2, 1),
                (8, 2, 2),
            ],
        );
        let c = body.union(&islet);

        let out = ZoneReconciler::default().reconcile(&p, &c, None).unwrap();
        assert!(out.whole.filtered);
        assert_eq!(out.whole.removed, 8);
        assert!(islet.is_subset_of(out.corrected_central()));
        assert!(out.central.filtered);
        assert_eq!(out.central.removed, 0);

        // 约束后的中央带只剩主体, 没有游离体素.
        assert!(out.strays.is_empty());
        assert!(!out.strays_converted);
        assert_eq!(out.union_violations(), 8);
    }
}
