//! 批处理结果汇总.

use mask_berry::pipeline::QcRun;
use mask_berry::report::{CaseRow, FlagTotals};
use std::io::{self, Write};

/// 将 `s` 的内容写进 `w` 中.
fn describe_into<W: Write>(s: &Summary, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Summary of `{}` QC:", s.name)?;
    writeln!(w, "{S4}Corrected cases: {}", s.corrected)?;
    writeln!(w, "{S4}Unchanged cases: {}", s.unchanged)?;
    writeln!(w, "{S4}Failed cases: {}", s.failures.len())?;
    for (name, reason) in s.failures.iter() {
        writeln!(w, "{S4}{S4}{name}: {reason}")?;
    }
    writeln!(w, "Flag totals:")?;
    for (flag, count) in s.totals.iter() {
        writeln!(w, "{S4}{flag} {count}")?;
    }
    Ok(())
}

/// 一次批处理的最终结果.
pub struct Summary {
    name: &'static str,
    corrected: usize,
    unchanged: usize,
    failures: Vec<(String, String)>,
    totals: FlagTotals,
}

impl Summary {
    /// 从批处理结果中提取汇总信息.
    pub fn from_run<R: CaseRow>(name: &'static str, run: &QcRun<R>) -> Self {
        Self {
            name,
            corrected: run.corrected(),
            unchanged: run.unchanged(),
            failures: run
                .failures
                .iter()
                .map(|f| (f.scan_name.clone(), f.reason.clone()))
                .collect(),
            totals: run.totals.clone(),
        }
    }

    /// 是否有病例处理失败.
    #[inline]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// 打印汇总信息.
    pub fn print(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut w = stdout.lock();
        utils::sep_to(&mut w)?;
        describe_into(self, &mut w)?;
        utils::sep_to(&mut w)
    }
}
