//! 质量控制命令行程序依赖的通用组件.

use std::num::NonZeroUsize;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 未指定时最多同时处理的病例数.
///
/// 每个病例同时持有多个完整体积以及逐分量的体素索引 (外部背景分量约为
/// 8 字节 x 体素数), 因此并行度不随核心数无限增长.
pub const MAX_DEFAULT_WORKERS: usize = 4;

/// 默认并行病例数: `min(核心数, MAX_DEFAULT_WORKERS)`.
pub fn default_workers() -> NonZeroUsize {
    NonZeroUsize::new(cpus().min(MAX_DEFAULT_WORKERS)).unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        super::sep_to(&mut buf).unwrap();
        assert!(buf.ends_with(b"-\n"));
        assert!(super::cpus() >= 1);
    }

    #[test]
    fn test_default_workers() {
        let n = super::default_workers().get();
        assert!(n <= super::MAX_DEFAULT_WORKERS);
        assert_eq!(n, super::cpus().min(super::MAX_DEFAULT_WORKERS));
    }
}
