use super::ComponentAnalyzer;
use crate::consts::FILTER_RATIO;
use crate::BinaryMask;

/// 碎片过滤的结果.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// 过滤后的掩膜. 总是输入掩膜的子集.
    pub mask: BinaryMask,

    /// 输入是否存在至少两个前景分量 (碎片化).
    ///
    /// 注意它 **不** 表示有体素被删除: 所有分量都通过阈值时它同样为 `true`.
    /// 实际删除的体素数见 `removed`.
    pub fragmented: bool,

    /// 实际被删除的体素个数.
    pub removed: usize,
}

/// 碎片过滤器: 丢弃相对最大分量过小的前景分量.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ComponentFilter {
    analyzer: ComponentAnalyzer,
    ratio: usize,
}

impl Default for ComponentFilter {
    fn default() -> Self {
        Self::new(ComponentAnalyzer::default(), FILTER_RATIO)
    }
}

impl ComponentFilter {
    /// 初始化. 体素数不超过最大分量 `1 / ratio` 的分量将被丢弃.
    pub fn new(analyzer: ComponentAnalyzer, ratio: usize) -> Self {
        assert!(ratio > 0);
        Self { analyzer, ratio }
    }

    /// 过滤 `mask` 中的小分量.
    ///
    /// 若前景分量少于两个, 原样返回. 否则只保留体素数 **严格大于**
    /// `最大分量体素数 / ratio` 的分量, 并将它们重新合并.
    ///
    /// 超出分析器容量的分量不参与合并, 相当于被删除.
    pub fn filter(&self, mask: &BinaryMask) -> Filtered {
        let analysis = self.analyzer.analyze(mask);
        if analysis.len() < 2 {
            return Filtered {
                mask: mask.clone(),
                fragmented: false,
                removed: 0,
            };
        }

        let biggest = analysis[0].len();
        // size > biggest / ratio, 以整数形式比较.
        let kept = analysis
            .iter()
            .filter(|c| c.len() * self.ratio > biggest)
            .flat_map(|c| c.voxels().iter().copied());
        let out = BinaryMask::from_flat(mask.shape(), kept);
        let removed = mask.count() - out.count();

        Filtered {
            mask: out,
            fragmented: true,
            removed,
        }
    }
}
