#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 3D 分区分割掩膜 (整体, 外周带, 中央带, 病灶) 的质量控制:
//! 碎片过滤, 空洞修补, 以及分区之间的一致性校正.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 掩膜以 nifti (`.nii`, `.nii.gz`) 格式读写, 内部统一按 `(z, h, w)` 访问.
//! 2. 体素级集合运算要求两个掩膜形状一致, 否则程序 panic. 来自外部输入的掩膜
//!   总会先经过形状检查, 不一致时以 [`QcError::ShapeMismatch`] 报告.
//! 3. 单个病例的失败不会中断整个批处理.
//!
//! # 开发计划
//!
//! ### 三维连通分量分析 ✅
//!
//! 6-邻接 (默认), 18-邻接与 26-邻接. 只保留最大的 100 个分量.
//!
//! 实现位于 `mask-berry/src/data/morph_3d/component.rs`.
//!
//! ### 碎片过滤与空洞修补 ✅
//!
//! 1. 体素数不超过最大分量 1/10 的前景分量被删除. ✅
//! 2. 体素数小于最大背景分量 1/100 的背景分量被填充. ✅
//! 3. 最大背景分量没有接触体积边界时给出警告. ✅
//!
//! 实现位于 `mask-berry/src/data/morph_3d`.
//!
//! ### 分区一致性校正 ✅
//!
//! 由外周带与中央带的并集得到整体掩膜, 并将中央带中的游离体素改判为外周带.
//! 中央带输出不扣除游离体素, 因此修正后的整体与两个分区的并集不一定相等;
//! 不相等时给出警告, 并记录在报告中.
//!
//! 实现位于 `mask-berry/src/post_proc/reconcile.rs`.
//!
//! ### 病例匹配 ✅
//!
//! 按 4 位, 3 位, 2 位数字串依次尝试, 从文件名中提取病例编号.
//!
//! 实现位于 `mask-berry/src/dataset/matching.rs`.
//!
//! ### 批处理与变更日志 ✅
//!
//! 实现位于 `mask-berry/src/pipeline` 和 `mask-berry/src/report`.
//!
//! ### `.mhd` 格式读取 ⌛️
//!
//! 目前只能识别, 读取时报告 [`QcError::UnsupportedFormat`].

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D nii 掩膜基础数据结构.
mod data;

pub use data::{
    check_shape, join_zones, split_combined, BinaryMask, MaskVolume, NiftiHeaderAttr,
};

pub use data::morph_3d;

pub mod consts;

mod error;

pub use error::{QcError, Result, ShapeMismatch};

pub mod post_proc;

pub mod dataset;
pub mod pipeline;
pub mod prelude;
pub mod report;
