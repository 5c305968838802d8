//! 病灶质量控制. 每个病灶掩膜独立修正, 不涉及分区一致性.

use super::{for_each_case, name_of, split_results, LesionQcConfig, QcRun};
use crate::dataset::{case_id, MaskDir};
use crate::error::Result;
use crate::post_proc::SingleMaskProcessor;
use crate::report::{CaseFailure, CaseRow, ChangeLog, FlagTotals, LesionCaseReport};
use crate::MaskVolume;
use log::{error, info};
use std::fs;
use std::path::Path;

/// 运行病灶质量控制.
///
/// 配置不合法或无法列出目录时返回 `Err`; 单个病例的失败记录在
/// [`QcRun::failures`] 中.
pub fn run_lesion_qc(config: &LesionQcConfig) -> Result<QcRun<LesionCaseReport>> {
    config.validate()?;
    if config.save.should_save(true) {
        fs::create_dir_all(&config.output)?;
    }
    let log = ChangeLog::create(&config.change_log)?;

    let files = MaskDir::new(&config.lesions).list()?;
    info!(
        "{} lesion masks found in `{}`",
        files.len(),
        config.lesions.display()
    );

    let results = for_each_case(files, config.workers, |path| lesion_case(config, &path));
    let (reports, failures) = split_results(results);

    log.write_lesions(&reports, &failures)?;
    let totals = FlagTotals::of_lesions(&reports);
    info!(
        "lesion QC finished: {} succeeded, {} failed",
        reports.len(),
        failures.len()
    );
    Ok(QcRun {
        reports,
        failures,
        totals,
    })
}

fn lesion_case(
    config: &LesionQcConfig,
    path: &Path,
) -> std::result::Result<LesionCaseReport, CaseFailure> {
    let scan_name = name_of(path);
    let run = || -> Result<LesionCaseReport> {
        let case = case_id(&scan_name)?;
        let lesion = MaskVolume::open(path)?;
        let result = SingleMaskProcessor::default().process(&lesion.binarize());

        let report = LesionCaseReport::new(case, scan_name.clone(), &result);
        if config.save.should_save(report.changed()) {
            lesion
                .derive(&result.mask)
                .save(config.output.join(&scan_name))?;
        }
        info!("case {case} {}", report.outcome());
        Ok(report)
    };

    run().map_err(|e| {
        error!("lesion mask `{scan_name}` failed: {e}");
        CaseFailure {
            case: case_id(&scan_name).ok(),
            scan_name: scan_name.clone(),
            reason: e.to_string(),
        }
    })
}
