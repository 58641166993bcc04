use std::env;

use chrono::Local;
use lazy_static::lazy_static;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// 日志级别从这个环境变量中读取, 例如 `FLATFS_LOG=debug`
pub const LOG_ENV: &str = "FLATFS_LOG";

struct Logger {
    level: LevelFilter,
}

lazy_static! {
    static ref LOGGER: Logger = Logger {
        level: env::var(LOG_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LevelFilter::Warn),
    };
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let color = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 90,
        };

        // 日志写到 stderr, stdout 留给命令的输出
        eprintln!(
            "\u{1B}[{}m{} [{:<5}] [{}] {}\u{1B}[0m",
            color,
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

pub fn init() {
    if log::set_logger(&*LOGGER).is_ok() {
        log::set_max_level(LOGGER.level);
    }
}
