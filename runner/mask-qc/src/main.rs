//! 3D 分区分割掩膜质量控制命令行程序.

mod args;
mod runner;
mod summary;

use args::Cli;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let summary = match runner::run(cli) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = summary.print() {
        log::error!("cannot print the summary: {e}");
    }
    if summary.has_failures() {
        log::warn!("some cases failed, see the change log for details");
    }
    ExitCode::SUCCESS
}
