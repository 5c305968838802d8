//! 分区与病灶批处理的端到端测试.

use mask_berry::consts::gray::{COMBINED_CENTRAL, COMBINED_PERIPHERAL};
use mask_berry::dataset::CaseId;
use mask_berry::pipeline::{
    run_lesion_qc, run_zone_qc, LesionQcConfig, SavePolicy, ZoneInput, ZoneOutputs, ZoneQcConfig,
};
use mask_berry::report::CaseOutcome;
use mask_berry::{join_zones, BinaryMask, MaskVolume, QcError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SHAPE: (usize, usize, usize) = (10, 10, 10);

fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

/// `z` 范围内, h 和 w 都在 `1..=8` 的长方体.
fn slab(z: std::ops::RangeInclusive<usize>) -> BinaryMask {
    let pos = z.flat_map(|z| (1..=8).flat_map(move |h| (1..=8).map(move |w| (z, h, w))));
    BinaryMask::from_positions(SHAPE, pos)
}

fn voxel(pos: (usize, usize, usize)) -> BinaryMask {
    BinaryMask::from_positions(SHAPE, [pos])
}

fn save(mask: &BinaryMask, path: &Path) {
    MaskVolume::from_raw(mask.data().to_owned())
        .save(path)
        .unwrap();
}

fn mkdir(root: &TempDir, name: &str) -> PathBuf {
    let dir = root.path().join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn files_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return vec![];
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn read_lines(path: PathBuf) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_owned)
        .collect()
}

/// 病例 1 无缺陷; 病例 2 外周带缺一个角, 该体素被标为中央带.
fn clean_zones() -> (BinaryMask, BinaryMask) {
    (slab(1..=4), slab(5..=8))
}

fn stray_zones() -> (BinaryMask, BinaryMask) {
    let corner = voxel((1, 1, 1));
    (slab(1..=4).difference(&corner), slab(5..=8).union(&corner))
}

fn separate_config(root: &TempDir) -> ZoneQcConfig {
    let p = mkdir(root, "peripheral");
    let c = mkdir(root, "central");
    for (id, (pz, cz)) in [(1, clean_zones()), (2, stray_zones())] {
        save(&pz, &p.join(format!("pz_{id:04}.nii.gz")));
        save(&cz, &c.join(format!("cz_{id:04}.nii.gz")));
    }

    let mut config = ZoneQcConfig::new(ZoneInput::Separate {
        whole: None,
        peripheral: p,
        central: c,
    });
    config.output = ZoneOutputs::under(root.path().join("out"));
    config.change_log = root.path().join("change_log");
    config.workers = std::num::NonZeroUsize::new(2);
    config
}

#[test]
fn test_zone_qc_separate() {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    let config = separate_config(&root);
    // 没有编号的文件与找不到中央带的病例都只是失败记录.
    let p = config.input.anchor_dir().to_owned();
    save(&slab(1..=4), &p.join("pz_notes.nii.gz"));
    save(&slab(1..=4), &p.join("pz_0009.nii.gz"));

    let run = run_zone_qc(&config).unwrap();
    assert_eq!(run.reports.len(), 2);
    assert_eq!(run.failures.len(), 2);
    assert_eq!(run.corrected(), 1);
    assert_eq!(run.unchanged(), 1);
    assert_eq!(run.totals.get("strays_converted"), Some(1));
    assert_eq!(run.totals.get("central_filtered"), Some(1));
    assert_eq!(run.totals.get("whole_mismatch"), None);

    let stray = &run.reports[1];
    assert_eq!(stray.case, CaseId::new(2));
    assert!(stray.strays_converted);
    assert!(stray.union_consistent);
    assert!(!run.reports[0].strays_converted);

    let missing = run
        .failures
        .iter()
        .find(|f| f.case == Some(CaseId::new(9)))
        .unwrap();
    assert!(missing.reason.contains("0 masks found"));
    let outcomes = run.outcomes();
    assert_eq!(outcomes[0], ("pz_0001.nii.gz", CaseOutcome::Unchanged));
    assert_eq!(outcomes[1], ("pz_0002.nii.gz", CaseOutcome::Corrected));
    assert!(matches!(outcomes[3].1, CaseOutcome::Failed { .. }));

    // 只保存有修改的病例, 且输出沿用各自来源的文件名.
    let out = &config.output;
    assert_eq!(files_in(&out.peripheral), ["pz_0002.nii.gz"]);
    assert_eq!(files_in(&out.central), ["cz_0002.nii.gz"]);
    assert_eq!(files_in(&out.whole), ["pz_0002.nii.gz"]);
    assert!(files_in(&out.combined).is_empty());

    let peripheral = MaskVolume::open(out.peripheral.join("pz_0002.nii.gz")).unwrap();
    assert_eq!(peripheral.binarize(), slab(1..=4));
    let whole = MaskVolume::open(out.whole.join("pz_0002.nii.gz")).unwrap();
    assert_eq!(whole.binarize(), slab(1..=8));

    let all = read_lines(config.change_log.join("all_mods.csv"));
    assert_eq!(all.len(), 3);
    assert!(!all[0].contains("whole_mismatch"));
    assert!(all[1].starts_with("0001,pz_0001.nii.gz,"));
    assert!(all[2].ends_with(",true,true"));
    assert_eq!(read_lines(config.change_log.join("whole_mods.csv")).len(), 1);
    assert_eq!(read_lines(config.change_log.join("central_mods.csv")).len(), 2);
    assert_eq!(read_lines(config.change_log.join("perif_mods.csv")).len(), 2);
    let failures = read_lines(config.change_log.join("failures.csv"));
    assert_eq!(failures.len(), 3);
    assert!(failures[1].starts_with(",pz_notes.nii.gz,"));
    assert!(failures[2].starts_with("0009,pz_0009.nii.gz,"));
}

#[test]
fn test_zone_qc_checks_whole() {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    let mut config = separate_config(&root);
    let w = mkdir(&root, "whole");
    save(&slab(1..=8), &w.join("wg_0001.nii.gz"));
    save(&slab(1..=8).union(&voxel((9, 9, 9))), &w.join("wg_0002.nii.gz"));
    if let ZoneInput::Separate { whole, .. } = &mut config.input {
        *whole = Some(w);
    }
    config.check_whole = true;
    config.save = SavePolicy::All;

    let run = run_zone_qc(&config).unwrap();
    assert!(run.failures.is_empty());
    assert_eq!(run.reports[0].whole_mismatch, Some(false));
    assert_eq!(run.reports[1].whole_mismatch, Some(true));
    assert_eq!(run.totals.get("whole_mismatch"), Some(1));

    // 整体输出沿用外部整体掩膜的文件名, 内容仍是分区并集的修正.
    let out = &config.output;
    assert_eq!(files_in(&out.whole), ["wg_0001.nii.gz", "wg_0002.nii.gz"]);
    let whole = MaskVolume::open(out.whole.join("wg_0002.nii.gz")).unwrap();
    assert_eq!(whole.binarize(), slab(1..=8));

    let whole_mods = read_lines(config.change_log.join("whole_mods.csv"));
    assert_eq!(
        whole_mods[0],
        "case,scan_name,whole_filtered,whole_patched,whole_mismatch"
    );
    assert_eq!(whole_mods.len(), 2);
    assert_eq!(whole_mods[1], "0002,pz_0002.nii.gz,false,false,true");
    assert_eq!(
        read_lines(config.change_log.join("failures.csv")),
        ["case,scan_name,reason"]
    );
}

#[test]
fn test_zone_qc_combined() {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    let dir = mkdir(&root, "combined_in");
    for (id, (pz, cz)) in [(1, clean_zones()), (2, stray_zones())] {
        let labels = join_zones(&pz, &cz).unwrap();
        MaskVolume::from_raw(labels)
            .save(dir.join(format!("case{id:03}_seg.nii")))
            .unwrap();
    }

    let mut config = ZoneQcConfig::new(ZoneInput::Combined(dir));
    config.output = ZoneOutputs::under(root.path().join("out"));
    config.change_log = root.path().join("change_log");
    config.combine_output = true;
    config.save = SavePolicy::All;

    let run = run_zone_qc(&config).unwrap();
    assert!(run.failures.is_empty());
    assert_eq!(run.reports.len(), 2);
    assert_eq!(run.reports[1].scan_name, "case002_seg.nii");
    assert!(run.reports[1].strays_converted);

    let out = &config.output;
    assert_eq!(files_in(&out.combined), ["case001_seg.nii", "case002_seg.nii"]);
    let joined = MaskVolume::open(out.combined.join("case002_seg.nii")).unwrap();
    assert_eq!(joined[(1, 1, 1)], COMBINED_PERIPHERAL);
    assert_eq!(joined[(6, 4, 4)], COMBINED_CENTRAL);
    let (p, c) = joined.split_combined();
    assert_eq!(p, slab(1..=4));
    assert_eq!(c, slab(5..=8));
}

#[test]
fn test_zone_qc_rejects_bad_config() {
    let root = tempfile::tempdir().unwrap();
    let mut config = ZoneQcConfig::new(ZoneInput::Combined(root.path().join("missing")));
    config.change_log = root.path().join("change_log");
    assert!(matches!(
        run_zone_qc(&config),
        Err(QcError::InvalidConfig(_))
    ));
    assert!(!config.change_log.exists());
}

#[test]
fn test_lesion_qc() {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    let dir = mkdir(&root, "lesions");
    // 病灶 1 带一个碎片, 病灶 2 中间有一个空洞, 病灶 3 无缺陷.
    save(&slab(2..=5).union(&voxel((8, 9, 9))), &dir.join("lesion_0001.nii.gz"));
    save(&slab(2..=5).difference(&voxel((3, 4, 4))), &dir.join("lesion_0002.nii.gz"));
    save(&slab(2..=5), &dir.join("lesion_0003.nii.gz"));
    fs::write(dir.join("lesion_0004.mhd"), "ObjectType = Image\n").unwrap();
    fs::write(dir.join("README.txt"), "not a mask\n").unwrap();

    let mut config = LesionQcConfig::new(&dir);
    config.output = root.path().join("out/lesions");
    config.change_log = root.path().join("change_log");

    let run = run_lesion_qc(&config).unwrap();
    assert_eq!(run.reports.len(), 3);
    assert_eq!(run.failures.len(), 1);
    assert_eq!(run.failures[0].case, Some(CaseId::new(4)));
    assert!(run.failures[0].reason.contains("unsupported"));

    assert!(run.reports[0].lesion_filtered);
    assert!(!run.reports[0].lesion_patched);
    assert!(run.reports[1].lesion_patched);
    assert!(!run.reports[2].lesion_filtered && !run.reports[2].lesion_patched);
    assert_eq!(run.corrected(), 2);

    assert_eq!(
        files_in(&config.output),
        ["lesion_0001.nii.gz", "lesion_0002.nii.gz"]
    );
    let patched = MaskVolume::open(config.output.join("lesion_0002.nii.gz")).unwrap();
    assert_eq!(patched.binarize(), slab(2..=5));

    let all = read_lines(config.change_log.join("all_lesion_mods.csv"));
    assert_eq!(all[0], "case,scan_name,lesion_filtered,lesion_patched");
    assert_eq!(all.len(), 4);
    let changed = read_lines(config.change_log.join("lesion_mods.csv"));
    assert_eq!(changed.len(), 3);
    assert_eq!(changed[2], "0002,lesion_0002.nii.gz,false,true");
    let failures = read_lines(config.change_log.join("lesion_failures.csv"));
    assert_eq!(failures.len(), 2);
    assert!(failures[1].starts_with("0004,lesion_0004.mhd,"));
    assert!(!config.change_log.join("failures.csv").exists());
}

/// 分区与病灶运行共用日志目录. 修好数据后重新运行, 旧的失败记录不应残留.
#[test]
fn test_rerun_replaces_failures() {
    init_logger();
    let root = tempfile::tempdir().unwrap();
    let config = separate_config(&root);
    let orphan = config.input.anchor_dir().join("pz_0009.nii.gz");
    save(&slab(1..=4), &orphan);

    let run = run_zone_qc(&config).unwrap();
    assert_eq!(run.failures.len(), 1);
    let failures = config.change_log.join("failures.csv");
    assert_eq!(read_lines(failures.clone()).len(), 2);

    let lesions = mkdir(&root, "lesions");
    save(&slab(2..=5), &lesions.join("lesion_0001.nii.gz"));
    let mut lesion_config = LesionQcConfig::new(&lesions);
    lesion_config.output = root.path().join("out/lesions");
    lesion_config.change_log = config.change_log.clone();
    assert!(run_lesion_qc(&lesion_config).unwrap().failures.is_empty());
    assert_eq!(read_lines(failures.clone()).len(), 2);
    assert_eq!(
        read_lines(config.change_log.join("lesion_failures.csv")),
        ["case,scan_name,reason"]
    );

    fs::remove_file(&orphan).unwrap();
    let run = run_zone_qc(&config).unwrap();
    assert!(run.failures.is_empty());
    assert_eq!(read_lines(failures), ["case,scan_name,reason"]);
}

#[test]
fn test_lesion_qc_saves_nothing() {
    let root = tempfile::tempdir().unwrap();
    let dir = mkdir(&root, "lesions");
    save(&slab(2..=5).union(&voxel((8, 9, 9))), &dir.join("lesion_0001.nii.gz"));

    let mut config = LesionQcConfig::new(&dir);
    config.output = root.path().join("out/lesions");
    config.change_log = root.path().join("change_log");
    config.save = SavePolicy::Nothing;

    let run = run_lesion_qc(&config).unwrap();
    assert_eq!(run.corrected(), 1);
    assert!(!config.output.exists());
    assert!(config.change_log.join("lesion_mods.csv").exists());
}
