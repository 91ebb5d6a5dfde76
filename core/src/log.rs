//! Logger and logging macros
//!
//! Crates log through the re-exported `log` facade macros. Binaries and tests that want
//! output call [`init_logger`] once; the console appender is always installed and file
//! appenders are added when a log directory is given.

pub use log::{Level, LevelFilter, debug, error, info, trace, warn};

mod appender;
mod consts;
mod logger;

pub use consts::*;
pub use logger::LogError;

use appender::AppenderSpec;
use log4rs::{Config, config::Root};
use logger::Builder;

pub type LogResult<T> = std::result::Result<T, LogError>;

const CONSOLE_APPENDER: &str = "stdout";
const LOG_FILE_APPENDER: &str = "log_file";
const ERR_LOG_FILE_APPENDER: &str = "err_log_file";

/// Installs the global logger.
///
/// `filters` follows the `RUST_LOG` grammar (`info,pink_consensus=debug`) and is applied on
/// top of the environment variable. Fails if called more than once per process.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> LogResult<()> {
    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }

    let loggers = Builder::new()
        .root_level(LevelFilter::Info)
        .parse_env(DEFAULT_LOGGER_ENV)
        .parse_expression(filters)
        .build();

    let config = Config::builder()
        .appenders(appenders.iter_mut().map(|x| x.appender()).collect::<Result<Vec<_>, _>>()?)
        .loggers(loggers.items())
        .build(Root::builder().appenders(appenders.iter().map(|x| x.name)).build(loggers.root_level()))
        .map_err(|err| LogError::ConfigError(err.to_string()))?;

    log4rs::init_config(config).map_err(|err| LogError::AlreadyInitialized(err.to_string()))?;
    Ok(())
}

/// Tries to init the global logger, but does not panic if it was already setup.
/// Should be used for tests.
pub fn try_init_logger(filters: &str) {
    let _ = init_logger(None, filters);
}
