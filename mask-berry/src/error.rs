//! 运行时错误.

use crate::Idx3d;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 质量控制流程的运行时结果类型.
pub type Result<T> = std::result::Result<T, QcError>;

/// 两个体积数据形状不一致.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShapeMismatch {
    /// 左侧 (被比较方) 形状, `(z, h, w)`.
    pub left: Idx3d,

    /// 右侧 (参照方) 形状, `(z, h, w)`.
    pub right: Idx3d,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shape {:?} does not match {:?}", self.left, self.right)
    }
}

impl std::error::Error for ShapeMismatch {}

/// 质量控制流程的错误.
///
/// 除 `InvalidConfig` 外, 其它错误都只影响单个病例, 批处理会记录后继续.
#[derive(Error, Debug)]
pub enum QcError {
    /// nifti 读写错误.
    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 底层 I/O 错误.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 变更日志写入错误.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// 数组构造错误.
    #[error("array shape error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// 两个分区掩膜形状不一致, 无法构造整体掩膜.
    #[error("zone masks disagree: {0}")]
    ShapeMismatch(#[from] ShapeMismatch),

    /// 文件名中找不到病例编号.
    #[error("no case identifier found in `{0}`")]
    NoIdentifier(String),

    /// 文件名中存在多个可能的病例编号.
    #[error("multiple case identifiers found in `{0}`")]
    AmbiguousIdentifier(String),

    /// 在目录中为某病例找到的文件数不是 1.
    #[error("{found} masks found for case {case} in `{}`", .dir.display())]
    MatchCount {
        /// 病例编号 (展示形式).
        case: String,
        /// 被搜索的目录.
        dir: PathBuf,
        /// 实际匹配到的文件个数.
        found: usize,
    },

    /// 可以识别但无法读取的文件格式.
    #[error("unsupported mask format: `{}`", .0.display())]
    UnsupportedFormat(PathBuf),

    /// 配置不合法. 该错误会终止整个批处理.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
