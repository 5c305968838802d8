//! csv 格式的变更日志.

use super::{
    zone_columns, CaseFailure, CaseRow, FlagColumn, LesionCaseReport, ZoneCaseReport,
    LESION_COLUMNS,
};
use crate::error::Result;
use log::debug;
use std::path::{Path, PathBuf};

/// 分区运行的失败表.
pub const ZONE_FAILURES: &str = "failures.csv";

/// 病灶运行的失败表. 与分区运行共用日志目录时不会互相覆盖.
pub const LESION_FAILURES: &str = "lesion_failures.csv";

const YES: &str = "true";
const NO: &str = "false";

#[inline]
fn flag(b: bool) -> &'static str {
    if b {
        YES
    } else {
        NO
    }
}

/// 变更日志目录.
///
/// 每张表的首列为病例编号, 次列为文件名, 其后为标志列. 行按病例编号排序.
/// 每次运行都会重写自己的全部表格, 包括空的失败表, 因此目录中不会残留上一次运行的结果.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChangeLog {
    dir: PathBuf,
}

impl ChangeLog {
    /// 在 `dir` 下创建变更日志 (目录不存在时一并创建).
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_owned();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// 日志目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 写入分区修正的日志.
    ///
    /// - `all_mods.csv`: 全部病例, 全部标志, 以及 `union_consistent` 列;
    /// - `whole_mods.csv`, `perif_mods.csv`, `central_mods.csv`:
    ///   只包含该分区至少一个相关标志为真的病例;
    /// - `failures.csv`: 失败的病例, 没有失败时只有表头.
    pub fn write_zones(
        &self,
        reports: &[ZoneCaseReport],
        failures: &[CaseFailure],
        check_whole: bool,
    ) -> Result<()> {
        let mut rows: Vec<&ZoneCaseReport> = reports.iter().collect();
        rows.sort_by_key(|r| r.case);

        let columns = zone_columns(check_whole);
        let pick = |names: &[&str]| -> Vec<FlagColumn<ZoneCaseReport>> {
            columns
                .iter()
                .filter(|(n, _)| names.contains(n))
                .copied()
                .collect()
        };

        let mut all = columns.clone();
        all.push(("union_consistent", |r| r.union_consistent));
        self.write_table("all_mods.csv", &rows, &all, |_| true)?;
        self.write_table(
            "whole_mods.csv",
            &rows,
            &pick(&["whole_filtered", "whole_patched", "whole_mismatch"]),
            ZoneCaseReport::whole_changed,
        )?;
        self.write_table(
            "perif_mods.csv",
            &rows,
            &pick(&["peripheral_filtered", "peripheral_patched", "strays_converted"]),
            ZoneCaseReport::peripheral_changed,
        )?;
        self.write_table(
            "central_mods.csv",
            &rows,
            &pick(&["central_filtered", "central_patched", "strays_converted"]),
            ZoneCaseReport::central_changed,
        )?;
        self.write_failures(ZONE_FAILURES, failures)
    }

    /// 写入病灶修正的日志: `all_lesion_mods.csv`, `lesion_mods.csv`
    /// (只包含有标志为真的病例) 和 `lesion_failures.csv`.
    pub fn write_lesions(
        &self,
        reports: &[LesionCaseReport],
        failures: &[CaseFailure],
    ) -> Result<()> {
        let mut rows: Vec<&LesionCaseReport> = reports.iter().collect();
        rows.sort_by_key(|r| r.case);

        self.write_table("all_lesion_mods.csv", &rows, &LESION_COLUMNS, |_| true)?;
        self.write_table(
            "lesion_mods.csv",
            &rows,
            &LESION_COLUMNS,
            LesionCaseReport::changed,
        )?;
        self.write_failures(LESION_FAILURES, failures)
    }

    /// 写入一张标志表, 只保留 `keep` 为真的行.
    fn write_table<R: CaseRow>(
        &self,
        name: &str,
        rows: &[&R],
        columns: &[FlagColumn<R>],
        keep: fn(&R) -> bool,
    ) -> Result<()> {
        let path = self.dir.join(name);
        let mut w = csv::Writer::from_path(&path)?;

        let header = ["case", "scan_name"]
            .into_iter()
            .chain(columns.iter().map(|(n, _)| *n));
        w.write_record(header)?;

        let mut written = 0;
        for r in rows.iter().copied().filter(|r| keep(r)) {
            let case = r.case().to_string();
            let record = [case.as_str(), r.scan_name()]
                .into_iter()
                .chain(columns.iter().map(|(_, get)| flag(get(r))));
            w.write_record(record)?;
            written += 1;
        }
        w.flush()?;
        debug!("{written} rows written to `{}`", path.display());
        Ok(())
    }

    /// 写入失败病例表. 没有失败时只写表头.
    fn write_failures(&self, name: &str, failures: &[CaseFailure]) -> Result<()> {
        let mut failures: Vec<&CaseFailure> = failures.iter().collect();
        failures.sort_by(|a, b| (a.case, &a.scan_name).cmp(&(b.case, &b.scan_name)));

        let mut w = csv::Writer::from_path(self.dir.join(name))?;
        w.write_record(["case", "scan_name", "reason"])?;
        for f in failures {
            let case = f.case.map(|c| c.to_string()).unwrap_or_default();
            w.write_record([case.as_str(), f.scan_name.as_str(), f.reason.as_str()])?;
        }
        w.flush()?;
        Ok(())
    }
}
