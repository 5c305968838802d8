//! 对 `mask-berry::pipeline` 配置的更一层封装. 提供从环境变量决定的默认路径.

use mask_berry::pipeline::{ZoneOutputs, DEFAULT_CHANGE_LOG, DEFAULT_OUT_ROOT};
use std::env;
use std::path::{Path, PathBuf};

/// 获取输出根目录.
///
/// 1. 若环境变量 `$MASK_QC_OUT` 非空, 则返回其值;
/// 2. 否则, 返回 `out`.
pub fn out_root_from_env_or_default() -> PathBuf {
    match env::var("MASK_QC_OUT") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => PathBuf::from(DEFAULT_OUT_ROOT),
    }
}

/// 获取变更日志目录.
///
/// 1. 若环境变量 `$MASK_QC_CHANGE_LOG` 非空, 则返回其值;
/// 2. 否则, 返回 `change_log`.
pub fn change_log_from_env_or_default() -> PathBuf {
    match env::var("MASK_QC_CHANGE_LOG") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => PathBuf::from(DEFAULT_CHANGE_LOG),
    }
}

/// 以 `root` 为根的分区输出目录.
#[inline]
pub fn zone_outputs<P: AsRef<Path>>(root: P) -> ZoneOutputs {
    ZoneOutputs::under(root)
}

/// 以 `root` 为根的病灶输出目录.
#[inline]
pub fn lesion_output<P: AsRef<Path>>(root: P) -> PathBuf {
    root.as_ref().join("lesions")
}
