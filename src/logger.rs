use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

use crate::config::DbConfig;
use crate::utils::querylog;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: usize = 7;

/// Initializes logging from a log4rs YAML file.
///
/// # Errors
/// Returns an error if the file cannot be read or a logger is already installed.
pub fn init_path(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())?;
    Ok(())
}

/// Maps a level name onto a filter. Unknown names fall back to `info`.
#[must_use]
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.unwrap_or("info").to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let roller = FixedWindowRoller::builder().build(&format!("{}", base.join(format!("{stem}.{{}}.log")).display()), keep)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}

/// Routes application logs to `app.log` and generated-SQL lines to `query.log`
/// under `dir` (current directory if `None`). Both files roll at 10 MiB and
/// keep `retention` old files.
///
/// # Errors
/// Returns an error if the appenders cannot be built or a logger is already installed.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&base)?;
    let keep = u32::try_from(retention.unwrap_or(DEFAULT_RETENTION)).unwrap_or(u32::MAX);
    let lvl = parse_level(level);

    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("query", Box::new(rolling(&base, "query", keep)?)))
        .logger(Logger::builder().appender("query").additive(false).build(querylog::TARGET, LevelFilter::Trace))
        .build(Root::builder().appender("app").build(lvl))?;
    log4rs::init_config(config)?;
    Ok(())
}

/// Applies the logging section of a loaded [`DbConfig`].
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_config(cfg: &DbConfig) -> Result<(), Box<dyn std::error::Error>> {
    configure_logging(cfg.log_dir.as_deref(), cfg.log_level.as_deref(), cfg.log_retention)
}

/// Configure logging from `MONGOLITE_LOG_DIR`, `MONGOLITE_LOG_LEVEL` and `MONGOLITE_LOG_RETENTION`.
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::var("MONGOLITE_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("MONGOLITE_LOG_LEVEL").ok();
    let retention = std::env::var("MONGOLITE_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}
