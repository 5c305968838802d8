//! 命令行参数.

use clap::{Args, Parser, Subcommand, ValueEnum};
use mask_berry::pipeline::{SavePolicy, ZoneInput};
use mask_berry::QcError;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// 3D 分区分割掩膜质量控制.
#[derive(Parser, Debug)]
#[command(name = "mask-qc", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 输出根目录. 缺省时取 `$MASK_QC_OUT`, 再缺省时为 `out`.
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// 变更日志目录. 缺省时取 `$MASK_QC_CHANGE_LOG`, 再缺省时为 `change_log`.
    #[arg(long, global = true)]
    pub change_log: Option<PathBuf>,

    /// 保存策略.
    #[arg(long, value_enum, default_value_t = SaveMode::Changed, global = true)]
    pub save: SaveMode,

    /// 并行病例数上限. 缺省时为 `min(核心数, 4)`.
    ///
    /// 每个并行病例都持有数个完整体积和连通分量索引, 内存占用约为体素数的数十倍字节;
    /// 大体积数据请按可用内存调小该值.
    #[arg(short = 'j', long, env = "MASK_QC_WORKERS", global = true)]
    pub workers: Option<NonZeroUsize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 分区 (外周带 / 中央带) 质量控制.
    Zone(ZoneArgs),

    /// 病灶质量控制.
    Lesion(LesionArgs),
}

#[derive(Args, Debug)]
pub struct ZoneArgs {
    /// 外周带掩膜目录.
    #[arg(long, required_unless_present = "combined", conflicts_with = "combined")]
    pub peripheral: Option<PathBuf>,

    /// 中央带掩膜目录.
    #[arg(long, required_unless_present = "combined", conflicts_with = "combined")]
    pub central: Option<PathBuf>,

    /// 整体掩膜目录. 只在 `--check-whole` 时使用.
    #[arg(long, conflicts_with = "combined")]
    pub whole: Option<PathBuf>,

    /// 合并分区掩膜目录 (标签 1 为外周带, 2 为中央带).
    #[arg(long)]
    pub combined: Option<PathBuf>,

    /// 与整体掩膜逐体素比对.
    #[arg(long, requires = "whole")]
    pub check_whole: bool,

    /// 额外输出重新合并的分区掩膜.
    #[arg(long)]
    pub combine_output: bool,
}

impl ZoneArgs {
    /// 输入方式.
    pub fn input(&self) -> Result<ZoneInput, QcError> {
        match (&self.combined, &self.peripheral, &self.central) {
            (Some(dir), _, _) => Ok(ZoneInput::Combined(dir.clone())),
            (None, Some(peripheral), Some(central)) => Ok(ZoneInput::Separate {
                whole: self.whole.clone(),
                peripheral: peripheral.clone(),
                central: central.clone(),
            }),
            _ => Err(QcError::InvalidConfig(
                "either --combined or both --peripheral and --central are required".to_owned(),
            )),
        }
    }
}

#[derive(Args, Debug)]
pub struct LesionArgs {
    /// 病灶掩膜目录.
    #[arg(long)]
    pub lesions: PathBuf,
}

/// 保存策略.
#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum SaveMode {
    /// 不保存掩膜.
    Nothing,
    /// 只保存有变化的病例.
    Changed,
    /// 保存所有病例.
    All,
}

impl From<SaveMode> for SavePolicy {
    fn from(m: SaveMode) -> Self {
        match m {
            SaveMode::Nothing => SavePolicy::Nothing,
            SaveMode::Changed => SavePolicy::ChangedOnly,
            SaveMode::All => SavePolicy::All,
        }
    }
}
