//! 病例级别的修正报告.
//!
//! 报告只用于两件事: 在 "仅保存变化病例" 策略下决定是否保存修正后的掩膜,
//! 以及生成按分区划分的变更日志.

use crate::dataset::CaseId;
use crate::post_proc::{CorrectionResult, ZoneOutcome};
use std::fmt;

mod change_log;

pub use change_log::{ChangeLog, LESION_FAILURES, ZONE_FAILURES};

/// 一个病例最终的处理结果.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CaseOutcome {
    /// 处理成功, 且至少一个标志为真.
    Corrected,

    /// 处理成功, 没有任何标志为真.
    Unchanged,

    /// 处理失败.
    Failed {
        /// 失败原因.
        reason: String,
    },
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseOutcome::Corrected => write!(f, "corrected"),
            CaseOutcome::Unchanged => write!(f, "unchanged"),
            CaseOutcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// 可以写入变更日志的一行.
pub trait CaseRow {
    /// 病例编号.
    fn case(&self) -> CaseId;

    /// 病例所依据的文件名.
    fn scan_name(&self) -> &str;

    /// 是否有任一标志为真.
    fn changed(&self) -> bool;

    /// 处理结果. 报告只为处理成功的病例生成.
    #[inline]
    fn outcome(&self) -> CaseOutcome {
        if self.changed() {
            CaseOutcome::Corrected
        } else {
            CaseOutcome::Unchanged
        }
    }
}

/// 分区修正的报告.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneCaseReport {
    /// 病例编号.
    pub case: CaseId,
    /// 病例所依据的文件名 (外周带或合并掩膜).
    pub scan_name: String,
    /// 整体掩膜存在碎片.
    pub whole_filtered: bool,
    /// 整体掩膜存在多个背景分量.
    pub whole_patched: bool,
    /// 外部整体掩膜与分区并集不一致. 未开启比对时为 `None`.
    pub whole_mismatch: Option<bool>,
    /// 外周带存在碎片.
    pub peripheral_filtered: bool,
    /// 外周带存在多个背景分量.
    pub peripheral_patched: bool,
    /// 中央带存在碎片.
    pub central_filtered: bool,
    /// 中央带存在多个背景分量.
    pub central_patched: bool,
    /// 中央带中检测到了游离体素.
    pub strays_converted: bool,
    /// 修正后的整体是否恰为修正后两个分区的并集.
    pub union_consistent: bool,
}

impl ZoneCaseReport {
    /// 根据修正结果生成报告. `check_whole` 表示是否开启了外部整体比对.
    pub fn new(
        case: CaseId,
        scan_name: String,
        outcome: &ZoneOutcome,
        check_whole: bool,
    ) -> Self {
        Self {
            case,
            scan_name,
            whole_filtered: outcome.whole.filtered,
            whole_patched: outcome.whole.patched,
            whole_mismatch: check_whole.then(|| outcome.mismatch()),
            peripheral_filtered: outcome.peripheral.filtered,
            peripheral_patched: outcome.peripheral.patched,
            central_filtered: outcome.central.filtered,
            central_patched: outcome.central.patched,
            strays_converted: outcome.strays_converted,
            union_consistent: outcome.union_violations() == 0,
        }
    }

    /// 整体掩膜相关的标志.
    #[inline]
    pub fn whole_changed(&self) -> bool {
        self.whole_filtered || self.whole_patched || self.whole_mismatch == Some(true)
    }

    /// 外周带相关的标志 (含游离体素).
    #[inline]
    pub fn peripheral_changed(&self) -> bool {
        self.peripheral_filtered || self.peripheral_patched || self.strays_converted
    }

    /// 中央带相关的标志 (含游离体素).
    #[inline]
    pub fn central_changed(&self) -> bool {
        self.central_filtered || self.central_patched || self.strays_converted
    }
}

impl CaseRow for ZoneCaseReport {
    #[inline]
    fn case(&self) -> CaseId {
        self.case
    }

    #[inline]
    fn scan_name(&self) -> &str {
        &self.scan_name
    }

    #[inline]
    fn changed(&self) -> bool {
        self.whole_changed() || self.peripheral_changed() || self.central_changed()
    }
}

/// 病灶修正的报告.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LesionCaseReport {
    /// 病例编号.
    pub case: CaseId,
    /// 病灶掩膜文件名.
    pub scan_name: String,
    /// 病灶掩膜存在碎片.
    pub lesion_filtered: bool,
    /// 病灶掩膜存在多个背景分量.
    pub lesion_patched: bool,
}

impl LesionCaseReport {
    /// 根据修正结果生成报告.
    pub fn new(case: CaseId, scan_name: String, result: &CorrectionResult) -> Self {
        Self {
            case,
            scan_name,
            lesion_filtered: result.filtered,
            lesion_patched: result.patched,
        }
    }
}

impl CaseRow for LesionCaseReport {
    #[inline]
    fn case(&self) -> CaseId {
        self.case
    }

    #[inline]
    fn scan_name(&self) -> &str {
        &self.scan_name
    }

    #[inline]
    fn changed(&self) -> bool {
        self.lesion_filtered || self.lesion_patched
    }
}

/// 处理失败的病例.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaseFailure {
    /// 病例编号. 无法从文件名中提取编号时为 `None`.
    pub case: Option<CaseId>,
    /// 病例所依据的文件名.
    pub scan_name: String,
    /// 失败原因.
    pub reason: String,
}

impl CaseFailure {
    /// 处理结果.
    #[inline]
    pub fn outcome(&self) -> CaseOutcome {
        CaseOutcome::Failed {
            reason: self.reason.clone(),
        }
    }
}

/// 变更日志中的一列标志: 列名与取值方式.
pub(crate) type FlagColumn<R> = (&'static str, fn(&R) -> bool);

/// 分区修正报告的所有标志列.
const ZONE_COLUMNS: [FlagColumn<ZoneCaseReport>; 8] = [
    ("whole_filtered", |r| r.whole_filtered),
    ("whole_patched", |r| r.whole_patched),
    ("whole_mismatch", |r| r.whole_mismatch == Some(true)),
    ("peripheral_filtered", |r| r.peripheral_filtered),
    ("peripheral_patched", |r| r.peripheral_patched),
    ("central_filtered", |r| r.central_filtered),
    ("central_patched", |r| r.central_patched),
    ("strays_converted", |r| r.strays_converted),
];

/// 病灶修正报告的所有标志列.
pub(crate) const LESION_COLUMNS: [FlagColumn<LesionCaseReport>; 2] = [
    ("lesion_filtered", |r| r.lesion_filtered),
    ("lesion_patched", |r| r.lesion_patched),
];

/// 分区修正报告的标志列. `whole_mismatch` 列仅在开启比对时存在.
pub(crate) fn zone_columns(check_whole: bool) -> Vec<FlagColumn<ZoneCaseReport>> {
    ZONE_COLUMNS
        .iter()
        .copied()
        .filter(|(name, _)| check_whole || *name != "whole_mismatch")
        .collect()
}

/// 每个标志为真的病例数.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FlagTotals {
    totals: Vec<(&'static str, usize)>,
}

impl FlagTotals {
    pub(crate) fn count<R>(rows: &[R], columns: &[FlagColumn<R>]) -> Self {
        let totals = columns
            .iter()
            .map(|(name, get)| (*name, rows.iter().filter(|r| get(r)).count()))
            .collect();
        Self { totals }
    }

    /// 分区修正报告的统计. `whole_mismatch` 仅在开启比对时统计.
    pub fn of_zones(rows: &[ZoneCaseReport], check_whole: bool) -> Self {
        Self::count(rows, &zone_columns(check_whole))
    }

    /// 病灶修正报告的统计.
    pub fn of_lesions(rows: &[LesionCaseReport]) -> Self {
        Self::count(rows, &LESION_COLUMNS)
    }

    /// 标志 `name` 的计数.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.totals.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
    }

    /// 按列顺序迭代 `(标志, 计数)`.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.totals.iter().copied()
    }
}

impl fmt::Display for FlagTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, count) in self.totals.iter() {
            writeln!(f, "{name} {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseOutcome, CaseRow, FlagTotals, LesionCaseReport, ZoneCaseReport};
    use crate::dataset::CaseId;

    pub(crate) fn zone_report(id: u32) -> ZoneCaseReport {
        ZoneCaseReport {
            case: CaseId::new(id),
            scan_name: format!("case_{id:04}.nii.gz"),
            whole_filtered: false,
            whole_patched: false,
            whole_mismatch: None,
            peripheral_filtered: false,
            peripheral_patched: false,
            central_filtered: false,
            central_patched: false,
            strays_converted: false,
            union_consistent: true,
        }
    }

    #[test]
    fn test_zone_changed() {
        let mut r = zone_report(1);
        assert_eq!(r.outcome(), CaseOutcome::Unchanged);

        r.whole_mismatch = Some(false);
        assert!(!r.changed());
        r.whole_mismatch = Some(true);
        assert!(r.whole_changed() && !r.peripheral_changed());
        assert_eq!(r.outcome(), CaseOutcome::Corrected);

        let mut r = zone_report(2);
        r.strays_converted = true;
        assert!(r.peripheral_changed() && r.central_changed() && !r.whole_changed());
    }

    #[test]
    fn test_totals() {
        let mut a = zone_report(1);
        a.whole_filtered = true;
        a.strays_converted = true;
        a.whole_mismatch = Some(true);
        let mut b = zone_report(2);
        b.whole_filtered = true;

        let t = FlagTotals::of_zones(&[a.clone(), b.clone()], false);
        assert_eq!(t.get("whole_filtered"), Some(2));
        assert_eq!(t.get("strays_converted"), Some(1));
        assert_eq!(t.get("whole_mismatch"), None);
        assert_eq!(t.iter().count(), 7);

        let t = FlagTotals::of_zones(&[a, b], true);
        assert_eq!(t.get("whole_mismatch"), Some(1));
        assert!(t.to_string().starts_with("whole_filtered 2\nwhole_patched 0\n"));

        let l = LesionCaseReport {
            case: CaseId::new(3),
            scan_name: "lesion_0003.nii".into(),
            lesion_filtered: false,
            lesion_patched: true,
        };
        assert!(l.changed());
        assert_eq!(FlagTotals::of_lesions(&[l]).get("lesion_patched"), Some(1));
    }
}
