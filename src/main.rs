use std::{env, panic, path::Path, process};

use backtrace::Backtrace;
use clap::Parser;
use tracing::level_filters::LevelFilter;

use liblayertools::cli::{resolve_project_dir, Options};
use liblayertools::logging;

/// Routes panics through the logger so they also land in the project's log
/// file. The backtrace always goes to the file; the terminal only gets it
/// when `RUST_BACKTRACE` is set.
fn install_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<no message>");
        let location = panic_info
            .location()
            .map(|location| format!("{}:{}", location.file(), location.line()))
            .unwrap_or_default();

        log::error!(
            "layertools {} aborted at {}: {}",
            env!("CARGO_PKG_VERSION"),
            location,
            message
        );

        let backtrace = Backtrace::new();
        log::debug!("{:?}", backtrace);
        if env::var_os("RUST_BACKTRACE").is_some_and(|var| var != "0") {
            eprintln!("{:?}", backtrace);
        }

        process::exit(1);
    }));
}

fn file_log_level(project_dir: &Path) -> Option<LevelFilter> {
    if env::var_os("LAYERTOOLS_NO_FILE_LOG").is_some() {
        return None;
    }

    logging::quick_read_file_log_level(project_dir).unwrap_or(Some(LevelFilter::TRACE))
}

fn main() {
    install_panic_hook();

    let options = Options::parse();
    let project_dir = resolve_project_dir(options.subcommand.project_path());

    let _log_guard = logging::init_logging(
        options.global.verbosity,
        options.global.color,
        Some(&project_dir),
        file_log_level(&project_dir),
        &format!("layertools-{}", options.subcommand.command_name()),
    );

    if let Err(err) = options.run() {
        log::error!("{:?}", err);
        process::exit(1);
    }
}
