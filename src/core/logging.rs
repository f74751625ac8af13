use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

const DEFAULT_FILTER: &str = "info";
const KEEP_LOG_FILES: usize = 14;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Console plus daily `server.<date>.log` files; `RUST_LOG` overrides the level.
pub fn init(paths: &AppPaths) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let console = tracing_subscriber::fmt::layer().with_target(false);

    let file = match file_appender(paths) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        Err(err) => {
            eprintln!("file logging disabled ({}): {}", paths.log_dir.display(), err);
            None
        }
    };

    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
    {
        eprintln!("tracing already initialized: {}", err);
    }
}

fn file_appender(
    paths: &AppPaths,
) -> Result<RollingFileAppender, tracing_appender::rolling::InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("server")
        .filename_suffix("log")
        .max_log_files(KEEP_LOG_FILES)
        .build(&paths.log_dir)
}
