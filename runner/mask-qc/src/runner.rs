//! 程序运行函数.

use crate::args::{Cli, Command};
use crate::summary::Summary;
use mask_berry::pipeline::{run_lesion_qc, run_zone_qc, LesionQcConfig, ZoneQcConfig};
use mask_berry::Result;
use utils::loader;

/// 实际运行.
pub fn run(cli: Cli) -> Result<Summary> {
    let out = cli.out.unwrap_or_else(loader::out_root_from_env_or_default);
    let change_log = cli
        .change_log
        .unwrap_or_else(loader::change_log_from_env_or_default);
    let workers = Some(cli.workers.unwrap_or_else(utils::default_workers));

    match cli.command {
        Command::Zone(args) => {
            let config = ZoneQcConfig {
                input: args.input()?,
                output: loader::zone_outputs(&out),
                change_log,
                save: cli.save.into(),
                check_whole: args.check_whole,
                combine_output: args.combine_output,
                workers,
            };
            log::info!("running zone QC with {config:?}");
            let run = run_zone_qc(&config)?;
            Ok(Summary::from_run("zone", &run))
        }
        Command::Lesion(args) => {
            let config = LesionQcConfig {
                lesions: args.lesions,
                output: loader::lesion_output(&out),
                change_log,
                save: cli.save.into(),
                workers,
            };
            log::info!("running lesion QC with {config:?}");
            let run = run_lesion_qc(&config)?;
            Ok(Summary::from_run("lesion", &run))
        }
    }
}
