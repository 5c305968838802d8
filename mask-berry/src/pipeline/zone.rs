//! 分区质量控制.

use super::{for_each_case, name_of, split_results, QcRun, ZoneInput, ZoneQcConfig};
use crate::data::join_zones;
use crate::dataset::{case_id, CaseId, MaskDir};
use crate::error::Result;
use crate::post_proc::{WholeCheck, ZoneOutcome, ZoneReconciler};
use crate::report::{CaseFailure, CaseRow, ChangeLog, FlagTotals, ZoneCaseReport};
use crate::{BinaryMask, MaskVolume};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// 一个病例的全部输入.
struct ZoneCase {
    peripheral: BinaryMask,
    central: BinaryMask,
    whole: Option<BinaryMask>,
    /// 各分区输出所用的 (空间参考, 文件名).
    targets: Targets,
}

/// 每个输出掩膜的空间参考与文件名.
struct Targets {
    whole: (MaskVolume, String),
    peripheral: (MaskVolume, String),
    central: (MaskVolume, String),
}

/// 运行分区质量控制.
///
/// 病例由外周带 (或合并掩膜) 目录中的文件决定, 其它目录中的对应文件按编号寻找.
/// 配置不合法或无法列出目录时返回 `Err`; 单个病例的失败记录在
/// [`QcRun::failures`] 中.
pub fn run_zone_qc(config: &ZoneQcConfig) -> Result<QcRun<ZoneCaseReport>> {
    config.validate()?;
    if config.save.should_save(true) {
        let out = &config.output;
        for dir in [&out.whole, &out.peripheral, &out.central] {
            fs::create_dir_all(dir)?;
        }
        if config.combine_output {
            fs::create_dir_all(&out.combined)?;
        }
    }
    let log = ChangeLog::create(&config.change_log)?;

    let anchors = MaskDir::new(config.input.anchor_dir()).list()?;
    info!(
        "{} cases found in `{}`",
        anchors.len(),
        config.input.anchor_dir().display()
    );

    let results = for_each_case(anchors, config.workers, |anchor| zone_case(config, &anchor));
    let (reports, failures) = split_results(results);

    log.write_zones(&reports, &failures, config.check_whole)?;
    let totals = FlagTotals::of_zones(&reports, config.check_whole);
    info!(
        "zone QC finished: {} succeeded, {} failed",
        reports.len(),
        failures.len()
    );
    Ok(QcRun {
        reports,
        failures,
        totals,
    })
}

/// 处理一个病例, 并把错误转换为失败记录.
fn zone_case(
    config: &ZoneQcConfig,
    anchor: &Path,
) -> std::result::Result<ZoneCaseReport, CaseFailure> {
    let scan_name = name_of(anchor);
    let fail = |case: Option<CaseId>, reason: String| {
        error!("case `{scan_name}` failed: {reason}");
        CaseFailure {
            case,
            scan_name: scan_name.clone(),
            reason,
        }
    };

    let case = case_id(&scan_name).map_err(|e| fail(None, e.to_string()))?;
    process_case(config, case, anchor, &scan_name).map_err(|e| fail(Some(case), e.to_string()))
}

fn process_case(
    config: &ZoneQcConfig,
    case: CaseId,
    anchor: &Path,
    scan_name: &str,
) -> Result<ZoneCaseReport> {
    let input = load_case(config, case, anchor, scan_name)?;
    let outcome = ZoneReconciler::default().reconcile(
        &input.peripheral,
        &input.central,
        input.whole.as_ref(),
    )?;

    match outcome.whole_check {
        WholeCheck::ShapeMismatch(e) => {
            warn!("case {case}: whole mask not compared, {e}");
        }
        WholeCheck::Mismatch { voxels } => {
            warn!("case {case}: whole mask differs from the zone union in {voxels} voxels");
        }
        WholeCheck::Skipped | WholeCheck::Match => {}
    }
    let violations = outcome.union_violations();
    if violations > 0 {
        warn!("case {case}: corrected whole and corrected zones disagree in {violations} voxels");
    }

    let report = ZoneCaseReport::new(case, scan_name.to_owned(), &outcome, config.check_whole);
    if config.save.should_save(report.changed()) {
        save_case(config, &input.targets, &outcome)?;
    }
    info!("case {case} {}", report.outcome());
    Ok(report)
}

/// 读取一个病例的分区掩膜.
fn load_case(
    config: &ZoneQcConfig,
    case: CaseId,
    anchor: &Path,
    scan_name: &str,
) -> Result<ZoneCase> {
    match &config.input {
        ZoneInput::Separate { whole, central, .. } => {
            let peripheral_vol = MaskVolume::open(anchor)?;
            let (central_path, central_vol) = MaskDir::new(central).open(case)?;
            debug!("case {case}: central mask `{}`", central_path.display());

            let whole_vol = match whole {
                Some(dir) if config.check_whole => Some(MaskDir::new(dir).open(case)?),
                _ => None,
            };
            let whole_target = match &whole_vol {
                Some((path, vol)) => (vol.clone(), name_of(path)),
                None => (central_vol.clone(), scan_name.to_owned()),
            };

            Ok(ZoneCase {
                peripheral: peripheral_vol.binarize(),
                central: central_vol.binarize(),
                whole: whole_vol.map(|(_, vol)| vol.binarize()),
                targets: Targets {
                    whole: whole_target,
                    central: (central_vol, name_of(&central_path)),
                    peripheral: (peripheral_vol, scan_name.to_owned()),
                },
            })
        }
        ZoneInput::Combined(_) => {
            let combined = MaskVolume::open(anchor)?;
            let (peripheral, central) = combined.split_combined();
            let target = || (combined.clone(), scan_name.to_owned());
            Ok(ZoneCase {
                peripheral,
                central,
                whole: None,
                targets: Targets {
                    whole: target(),
                    peripheral: target(),
                    central: target(),
                },
            })
        }
    }
}

/// 保存修正结果. 每个输出都复制对应输入的空间参考信息.
fn save_case(config: &ZoneQcConfig, targets: &Targets, outcome: &ZoneOutcome) -> Result<()> {
    let out = &config.output;
    let save = |(reference, name): &(MaskVolume, String), mask: &BinaryMask, dir: &PathBuf| {
        reference.derive(mask).save(dir.join(name))
    };
    save(&targets.whole, outcome.corrected_whole(), &out.whole)?;
    save(&targets.peripheral, &outcome.final_peripheral, &out.peripheral)?;
    save(&targets.central, outcome.corrected_central(), &out.central)?;

    if config.combine_output {
        let (reference, name) = &targets.peripheral;
        let labels = join_zones(&outcome.final_peripheral, outcome.corrected_central())?;
        reference.derive_labels(labels).save(out.combined.join(name))?;
    }
    Ok(())
}
