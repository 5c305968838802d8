//! 数据集操作.
//!
//! 每个分区 (整体, 外周带, 中央带, 病灶) 的掩膜各自存放在一个目录中,
//! 不同目录中的同一病例通过文件名中的编号对应.

use crate::error::Result;
use crate::MaskVolume;
use std::path::{Path, PathBuf};

pub mod matching;

pub use matching::{case_id, find_case_file, list_mask_files, CaseId};

/// 存放某一分区掩膜的目录.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MaskDir {
    path: PathBuf,
}

impl MaskDir {
    /// 以目录路径初始化. 此时不检查目录是否存在.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    /// 目录路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 目录下的所有掩膜文件, 按文件名排序.
    #[inline]
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        list_mask_files(&self.path)
    }

    /// 寻找病例 `case` 的掩膜文件.
    #[inline]
    pub fn find(&self, case: CaseId) -> Result<PathBuf> {
        find_case_file(case, &self.path)
    }

    /// 寻找并打开病例 `case` 的掩膜, 同时返回其路径.
    pub fn open(&self, case: CaseId) -> Result<(PathBuf, MaskVolume)> {
        let path = self.find(case)?;
        let mask = MaskVolume::open(&path)?;
        Ok((path, mask))
    }
}
