//! 通用常量.

/// 单通道标签值.
pub mod gray {
    /// 二值掩膜中, 背景的体素值.
    pub const BACKGROUND: u8 = 0;

    /// 二值掩膜中, 前景的体素值.
    pub const FOREGROUND: u8 = 1;

    /// 合并分区掩膜中, 外周带 (peripheral zone) 的体素值.
    pub const COMBINED_PERIPHERAL: u8 = 1;

    /// 合并分区掩膜中, 中央带 (central zone) 的体素值.
    pub const COMBINED_CENTRAL: u8 = 2;

    /// 非整数或超出 `1..=254` 的正值体素被归入该标签: 它是前景,
    /// 但不对应任何分区.
    pub const OTHER_FOREGROUND: u8 = u8::MAX;

    /// 体素是否是前景? 任意非零标签都被视为前景.
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p > BACKGROUND
    }

    /// 体素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, BACKGROUND)
    }
}

/// 连通分量分析最多保留的分量个数. 超出部分 (体素数更少的那些) 被视为不存在.
pub const MAX_COMPONENTS: usize = 100;

/// 碎片过滤比例. 体素数不超过最大分量 `1 / FILTER_RATIO` 的分量被丢弃.
pub const FILTER_RATIO: usize = 10;

/// 空洞修补比例. 体素数严格小于最大背景分量 `1 / HOLE_RATIO` 的背景分量被填充.
pub const HOLE_RATIO: usize = 100;

/// 可以识别的掩膜文件后缀.
pub const MASK_SUFFIXES: [&str; 3] = [".nii.gz", ".nii", ".mhd"];

/// 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElemType {
    /// `BACKGROUND`, 代表背景.
    Background,

    /// 非零标签, 代表前景.
    Foreground,
}

impl ElemType {
    /// 由标签值获得体素类型.
    #[inline]
    pub const fn of(p: u8) -> Self {
        if gray::is_foreground(p) {
            Self::Foreground
        } else {
            Self::Background
        }
    }

    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }
}
