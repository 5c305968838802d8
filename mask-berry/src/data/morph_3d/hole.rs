use super::ComponentAnalyzer;
use crate::consts::HOLE_RATIO;
use crate::BinaryMask;
use log::warn;

/// 空洞修补的结果.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    /// 修补后的掩膜. 总是输入掩膜的超集.
    pub mask: BinaryMask,

    /// 背景是否被分割为至少两个分量.
    ///
    /// 与 [`super::Filtered::fragmented`] 一样, 它不表示有体素被填充.
    /// 实际填充的体素数见 `filled`.
    pub cavities: bool,

    /// 实际被填充的体素个数.
    pub filled: usize,
}

/// 空洞修补器: 将被前景包围的小背景区域填充为前景.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct HoleRepairer {
    analyzer: ComponentAnalyzer,
    ratio: usize,
}

impl Default for HoleRepairer {
    fn default() -> Self {
        Self::new(ComponentAnalyzer::default(), HOLE_RATIO)
    }
}

impl HoleRepairer {
    /// 初始化. 体素数严格小于最大背景分量 `1 / ratio` 的背景分量将被填充.
    pub fn new(analyzer: ComponentAnalyzer, ratio: usize) -> Self {
        assert!(ratio > 0);
        Self { analyzer, ratio }
    }

    /// 修补 `mask` 中的背景空洞.
    ///
    /// 对背景做连通分量分析. 若背景分量少于两个, 原样返回.
    /// 否则将最大的背景分量视为外部背景, 其余分量中体素数严格小于
    /// `外部背景体素数 / ratio` 的都被视为空洞并填充为前景.
    ///
    /// # 注意
    ///
    /// 最大背景分量被 **假定** 接触体积边界. 若实际并非如此
    /// (例如前景包裹了体积的全部表面), 真正的外部背景可能被当作空洞.
    /// 这种情况下会记录一条警告, 但行为不变.
    pub fn patch(&self, mask: &BinaryMask) -> Patched {
        let analysis = self.analyzer.analyze_background(mask);
        if analysis.len() < 2 {
            return Patched {
                mask: mask.clone(),
                cavities: false,
                filled: 0,
            };
        }

        let exterior = &analysis[0];
        if !exterior.touches_border() {
            warn!(
                "largest background region ({} voxels) does not touch the volume border",
                exterior.len()
            );
        }

        // size < exterior / ratio, 以整数形式比较.
        let holes = analysis[1..]
            .iter()
            .filter(|c| c.len() * self.ratio < exterior.len());
        let filled = holes.clone().map(|c| c.len()).sum();
        let hole_mask =
            BinaryMask::from_flat(mask.shape(), holes.flat_map(|c| c.voxels().iter().copied()));

        Patched {
            mask: mask.union(&hole_mask),
            cavities: true,
            filled,
        }
    }
}
