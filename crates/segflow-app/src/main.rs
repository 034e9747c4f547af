//! Main application entry point.

use segflow_app::{App, AppConfig, ShortcutRegistry};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next().as_deref() {
        Some("--shortcuts") => {
            ShortcutRegistry::print_all();
            return ExitCode::SUCCESS;
        }
        Some(path) => match AppConfig::load(&PathBuf::from(path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("{}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };

    log::info!("Starting {}", config.title);
    match pollster::block_on(App::run(config)) {
        Ok(summary) => {
            log::info!(
                "{} commit(s), {} voxel(s) modified, {} discarded, {} cancelled, {} redraw(s), {} event(s)",
                summary.commits,
                summary.modified_voxels,
                summary.discarded,
                summary.cancelled,
                summary.redraws,
                summary.events
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
