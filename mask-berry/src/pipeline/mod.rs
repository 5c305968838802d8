//! 批处理流程: 分区质量控制与病灶质量控制.
//!
//! 病例之间完全独立. 开启 `rayon` 特性时病例被并行处理,
//! 单个病例的失败只记录在结果中, 不会中断整个批处理.

use crate::error::{QcError, Result};
use crate::report::{CaseFailure, CaseOutcome, CaseRow, FlagTotals};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

mod lesion;
mod zone;

pub use lesion::run_lesion_qc;
pub use zone::run_zone_qc;

/// 修正后掩膜的保存策略.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SavePolicy {
    /// 不保存任何掩膜, 只生成变更日志.
    Nothing,

    /// 只保存有标志为真的病例.
    #[default]
    ChangedOnly,

    /// 保存所有病例.
    All,
}

impl SavePolicy {
    /// 是否应该保存 `changed` 所描述的病例.
    #[inline]
    pub fn should_save(&self, changed: bool) -> bool {
        match self {
            SavePolicy::Nothing => false,
            SavePolicy::ChangedOnly => changed,
            SavePolicy::All => true,
        }
    }
}

/// 分区掩膜的输入方式. 两种方式互斥.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ZoneInput {
    /// 每个分区一个目录. 整体掩膜目录只在开启整体比对时需要.
    Separate {
        /// 整体掩膜目录.
        whole: Option<PathBuf>,
        /// 外周带掩膜目录. 病例以该目录中的文件为准.
        peripheral: PathBuf,
        /// 中央带掩膜目录.
        central: PathBuf,
    },

    /// 合并分区掩膜目录. 标签 1 为外周带, 2 为中央带.
    Combined(PathBuf),
}

impl ZoneInput {
    /// 决定病例集合的目录.
    #[inline]
    pub fn anchor_dir(&self) -> &Path {
        match self {
            ZoneInput::Separate { peripheral, .. } => peripheral,
            ZoneInput::Combined(dir) => dir,
        }
    }
}

/// 分区修正结果的输出目录.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneOutputs {
    /// 修正后的整体掩膜.
    pub whole: PathBuf,
    /// 最终外周带.
    pub peripheral: PathBuf,
    /// 修正后的中央带.
    pub central: PathBuf,
    /// 重新合并的分区掩膜.
    pub combined: PathBuf,
}

impl ZoneOutputs {
    /// `root/{whole, peripheral, central, combined}`.
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            whole: root.join("whole"),
            peripheral: root.join("peripheral"),
            central: root.join("central"),
            combined: root.join("combined"),
        }
    }
}

impl Default for ZoneOutputs {
    fn default() -> Self {
        Self::under(DEFAULT_OUT_ROOT)
    }
}

/// 默认输出根目录.
pub const DEFAULT_OUT_ROOT: &str = "out";

/// 默认变更日志目录.
pub const DEFAULT_CHANGE_LOG: &str = "change_log";

/// 分区质量控制的配置.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneQcConfig {
    /// 输入方式.
    pub input: ZoneInput,
    /// 输出目录.
    pub output: ZoneOutputs,
    /// 变更日志目录.
    pub change_log: PathBuf,
    /// 保存策略.
    pub save: SavePolicy,
    /// 是否与外部整体掩膜比对.
    pub check_whole: bool,
    /// 是否额外输出重新合并的分区掩膜.
    pub combine_output: bool,
    /// 并行病例数上限. `None` 表示由运行时决定.
    pub workers: Option<NonZeroUsize>,
}

impl ZoneQcConfig {
    /// 以默认选项创建配置.
    pub fn new(input: ZoneInput) -> Self {
        Self {
            input,
            output: ZoneOutputs::default(),
            change_log: PathBuf::from(DEFAULT_CHANGE_LOG),
            save: SavePolicy::default(),
            check_whole: false,
            combine_output: false,
            workers: None,
        }
    }

    /// 检查配置是否自洽, 以及输入目录是否存在.
    pub fn validate(&self) -> Result<()> {
        let whole = match &self.input {
            ZoneInput::Separate {
                whole,
                peripheral,
                central,
            } => {
                require_dir("peripheral", peripheral)?;
                require_dir("central", central)?;
                whole.as_deref()
            }
            ZoneInput::Combined(dir) => {
                require_dir("combined", dir)?;
                None
            }
        };
        match (self.check_whole, whole) {
            (true, None) => Err(QcError::InvalidConfig(
                "checking the whole mask requires a whole-mask directory".to_owned(),
            )),
            (true, Some(dir)) => require_dir("whole", dir),
            (false, _) => Ok(()),
        }
    }
}

/// 病灶质量控制的配置.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LesionQcConfig {
    /// 病灶掩膜目录.
    pub lesions: PathBuf,
    /// 输出目录.
    pub output: PathBuf,
    /// 变更日志目录.
    pub change_log: PathBuf,
    /// 保存策略.
    pub save: SavePolicy,
    /// 并行病例数上限. `None` 表示由运行时决定.
    pub workers: Option<NonZeroUsize>,
}

impl LesionQcConfig {
    /// 以默认选项创建配置.
    pub fn new<P: AsRef<Path>>(lesions: P) -> Self {
        Self {
            lesions: lesions.as_ref().to_owned(),
            output: Path::new(DEFAULT_OUT_ROOT).join("lesions"),
            change_log: PathBuf::from(DEFAULT_CHANGE_LOG),
            save: SavePolicy::default(),
            workers: None,
        }
    }

    /// 检查输入目录是否存在.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        require_dir("lesion", &self.lesions)
    }
}

fn require_dir(what: &str, dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(QcError::InvalidConfig(format!(
            "{what} directory `{}` does not exist",
            dir.display()
        )))
    }
}

/// 一次批处理的结果.
#[derive(Debug, Clone)]
pub struct QcRun<R> {
    /// 处理成功的病例, 按编号排序.
    pub reports: Vec<R>,
    /// 处理失败的病例.
    pub failures: Vec<CaseFailure>,
    /// 各标志为真的病例数.
    pub totals: FlagTotals,
}

impl<R: CaseRow> QcRun<R> {
    /// 有标志为真的病例数.
    pub fn corrected(&self) -> usize {
        self.reports.iter().filter(|r| r.changed()).count()
    }

    /// 没有任何标志为真的病例数.
    pub fn unchanged(&self) -> usize {
        self.reports.len() - self.corrected()
    }

    /// 所有病例 (包括失败的) 的处理结果, 以文件名标识.
    pub fn outcomes(&self) -> Vec<(&str, CaseOutcome)> {
        let ok = self.reports.iter().map(|r| (r.scan_name(), r.outcome()));
        let failed = self
            .failures
            .iter()
            .map(|f| (f.scan_name.as_str(), f.outcome()));
        let mut all: Vec<_> = ok.chain(failed).collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }
}

/// 文件名. 非 UTF-8 时退化为完整路径的展示形式.
fn name_of(path: &Path) -> String {
    crate::dataset::matching::file_name(path)
        .map(str::to_owned)
        .unwrap_or_else(|| path.display().to_string())
}

/// 将成功与失败的病例分开, 成功病例按编号排序.
fn split_results<R: CaseRow>(
    results: Vec<std::result::Result<R, CaseFailure>>,
) -> (Vec<R>, Vec<CaseFailure>) {
    let mut reports = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for r in results {
        match r {
            Ok(report) => reports.push(report),
            Err(failure) => failures.push(failure),
        }
    }
    reports.sort_by_key(|r| r.case());
    (reports, failures)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        /// 借助 `rayon` 并行处理每个病例. 指定了 `workers` 时使用独立的线程池.
        fn for_each_case<T, R, F>(cases: Vec<T>, workers: Option<NonZeroUsize>, op: F) -> Vec<R>
        where
            T: Send,
            R: Send,
            F: Fn(T) -> R + Sync + Send,
        {
            let run = || cases.into_par_iter().map(&op).collect();
            let Some(n) = workers else {
                return run();
            };
            match rayon::ThreadPoolBuilder::new().num_threads(n.get()).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    log::warn!("cannot build a pool of {n} workers ({e}), using the global pool");
                    run()
                }
            }
        }
    } else {
        /// 依次处理每个病例.
        fn for_each_case<T, R, F>(cases: Vec<T>, _workers: Option<NonZeroUsize>, op: F) -> Vec<R>
        where
            F: Fn(T) -> R,
        {
            cases.into_iter().map(op).collect()
        }
    }
}
