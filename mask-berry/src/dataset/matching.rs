//! 根据文件名中的数字串匹配病例.
//!
//! 编号按数字串宽度 4, 3, 2 依次尝试. 同一宽度下, 文件名中
//!
//! - 恰好有一个数字串时, 它就是编号;
//! - 恰好有两个数字串, 且第二个是 `0000` 或与第一个相同时, 第一个是编号;
//! - 其它多于一个数字串的情况视为有歧义.

use crate::consts::MASK_SUFFIXES;
use crate::error::{QcError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

/// 依次尝试的数字串最小宽度.
pub const ID_WIDTHS: [usize; 3] = [4, 3, 2];

static DIGIT_RUNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    ID_WIDTHS.map(|w| Regex::new(&format!(r"\d{{{w},}}")).expect("constant pattern"))
});

/// 病例编号. 按数值比较, 展示时补零至 4 位.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseId(u32);

impl CaseId {
    /// 由数值创建.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// 数值.
    #[inline]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// 按第 `slot` 个宽度提取编号. 没有数字串时返回 `Ok(None)`.
fn case_id_by(name: &str, slot: usize) -> Result<Option<CaseId>> {
    let runs: Vec<&str> = DIGIT_RUNS[slot].find_iter(name).map(|m| m.as_str()).collect();
    let picked = match runs.as_slice() {
        [] => return Ok(None),
        [only] => only,
        [first, second] if *second == "0000" || first == second => first,
        _ => return Err(QcError::AmbiguousIdentifier(name.to_owned())),
    };
    // 超出 u32 的数字串不可能是编号.
    picked
        .parse()
        .map(|id| Some(CaseId(id)))
        .map_err(|_| QcError::NoIdentifier(name.to_owned()))
}

/// 按最小宽度 `width` (2, 3 或 4) 提取编号.
///
/// # 注意
///
/// `width` 不在 [`ID_WIDTHS`] 中时 panic.
pub fn case_id_at(name: &str, width: usize) -> Result<Option<CaseId>> {
    let slot = ID_WIDTHS
        .iter()
        .position(|w| *w == width)
        .unwrap_or_else(|| panic!("unsupported identifier width {width}"));
    case_id_by(name, slot)
}

/// 从文件名中提取病例编号, 宽度由宽到窄尝试.
///
/// 某一宽度下有歧义时立即返回错误, 因为更窄的宽度只会找到更多的数字串.
pub fn case_id(name: &str) -> Result<CaseId> {
    for slot in 0..ID_WIDTHS.len() {
        if let Some(id) = case_id_by(name, slot)? {
            return Ok(id);
        }
    }
    Err(QcError::NoIdentifier(name.to_owned()))
}

/// 路径中的文件名部分 (若为合法 UTF-8).
#[inline]
pub fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// 文件名是否带有掩膜后缀.
pub fn is_mask_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    MASK_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// 列出 `dir` 下所有掩膜文件, 按文件名排序.
pub fn list_mask_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file() && file_name(&path).is_some_and(is_mask_file) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// 在 `dir` 中寻找编号为 `case` 的唯一掩膜.
///
/// 宽度由宽到窄尝试, 采用第一个恰好匹配到一个文件的宽度.
/// 在某一宽度下编号有歧义的文件被视为不匹配.
pub fn find_case_file<P: AsRef<Path>>(case: CaseId, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let files = list_mask_files(dir)?;

    let mut found = 0;
    for slot in 0..ID_WIDTHS.len() {
        let mut hits = files.iter().filter(|p| {
            file_name(p).is_some_and(|n| matches!(case_id_by(n, slot), Ok(Some(id)) if id == case))
        });
        match (hits.next(), hits.next()) {
            (Some(only), None) => return Ok(only.clone()),
            (first, second) => {
                found = usize::from(first.is_some()) + usize::from(second.is_some()) + hits.count()
            }
        }
    }
    Err(QcError::MatchCount {
        case: case.to_string(),
        dir: dir.to_owned(),
        found,
    })
}
