use std::{
    io::{self, IsTerminal, Write},
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{cli::ColorChoice, settings::Settings};

/// Directory, relative to the project directory, that log files go into.
pub const LOG_DIR: &str = ".layertools/logs";

/// Compressed logs older than this are deleted.
const MAX_LOG_AGE_DAYS: u64 = 7;

const SECONDS_PER_DAY: u64 = 86_400;

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Installs the global subscriber: a console layer whose filter follows the
/// verbosity flag (or `RUST_LOG`) and, if a project directory is known, a
/// daily rolling log file below it.
pub fn init_logging(
    verbosity: u8,
    color: ColorChoice,
    project_dir: Option<&Path>,
    file_log_level: Option<LevelFilter>,
    command_name: &str,
) -> LogGuard {
    let console_filter = match verbosity {
        0 => "info",
        1 => "info,liblayertools=debug,gpkg_store=debug",
        2 => "info,liblayertools=trace,gpkg_store=trace",
        _ => "trace",
    };

    let console_env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(console_filter));

    let use_ansi = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stderr().is_terminal(),
    };

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(use_ansi)
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_filter(console_env_filter);

    let mut file_guard = None;

    let file_layer = match (project_dir, file_log_level) {
        (Some(dir), Some(level)) => {
            let log_dir = dir.join(LOG_DIR);

            let appender = fs_err::create_dir_all(&log_dir)
                .map_err(|err| err.to_string())
                .and_then(|()| {
                    compress_old_logs(&log_dir, command_name);

                    tracing_appender::rolling::Builder::new()
                        .rotation(tracing_appender::rolling::Rotation::DAILY)
                        .filename_prefix(command_name)
                        .filename_suffix("log")
                        .build(&log_dir)
                        .map_err(|err| err.to_string())
                });

            match appender {
                Ok(appender) => {
                    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                    file_guard = Some(guard);

                    Some(
                        fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false)
                            .with_timer(UtcTime::rfc_3339())
                            .with_target(true)
                            .with_level(true)
                            .with_filter(EnvFilter::new(level.to_string())),
                    )
                }
                Err(err) => {
                    eprintln!(
                        "Warning: could not set up logging in {}: {err}",
                        log_dir.display()
                    );
                    None
                }
            }
        }
        _ => None,
    };

    // `init` also routes `log` records from library code into tracing.
    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

/// Reads only the log level from the settings next to a project, before
/// logging is up. Returns `None` when there is no usable settings file
/// (callers default to trace) and `Some(None)` when file logging is off.
pub fn quick_read_file_log_level(project_dir: &Path) -> Option<Option<LevelFilter>> {
    let contents = std::fs::read_to_string(Settings::path_in(project_dir)).ok()?;
    let value: toml::Table = toml::from_str(&contents).ok()?;
    let level = value.get("file_log_level")?.as_str()?;

    Some(crate::settings::parse_level(level))
}

/// Gzips this command's logs from earlier days and deletes compressed logs
/// older than a week.
fn compress_old_logs(log_dir: &Path, command_name: &str) {
    let today = days_since_epoch(SystemTime::now()).unwrap_or_default();

    let Ok(entries) = fs_err::read_dir(log_dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let modified_day = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(days_since_epoch);

        if file_name.ends_with(".log.gz") {
            if modified_day.is_some_and(|day| today.saturating_sub(day) > MAX_LOG_AGE_DAYS) {
                let _ = fs_err::remove_file(&path);
            }
            continue;
        }

        if !file_name.ends_with(".log") || !file_name.starts_with(command_name) {
            continue;
        }

        if modified_day.is_none_or(|day| day >= today) {
            continue;
        }

        if let Err(err) = compress_file(&path) {
            eprintln!("Warning: could not compress {}: {err}", path.display());
        }
    }
}

fn compress_file(path: &Path) -> io::Result<()> {
    let gz_path = path.with_extension("log.gz");
    let input = fs_err::read(path)?;

    let result = fs_err::File::create(&gz_path).and_then(|file| {
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&input)?;
        encoder.finish()?;
        Ok(())
    });

    match result {
        Ok(()) => fs_err::remove_file(path),
        Err(err) => {
            let _ = fs_err::remove_file(&gz_path);
            Err(err)
        }
    }
}

fn days_since_epoch(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|since| since.as_secs() / SECONDS_PER_DAY)
}
