//! Debug log for aws-sso-sync.
//!
//! Every `log::info!()` / `log::warn!()` record is appended to
//! /tmp/aws_sso_sync_debug.log on Unix/macOS, or
//! %TEMP%\aws_sso_sync_debug.log on Windows. Stdout stays reserved for the
//! progress lines the user reads.
//!
//! When RUST_LOG is set, records are mirrored to stderr as well.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use log::{LevelFilter, Log, Metadata, Record};

/// Log file name inside the temp directory
const LOG_FILE_NAME: &str = "aws_sso_sync_debug.log";

/// Default level when neither --log-level nor RUST_LOG is given
const DEFAULT_LEVEL: LevelFilter = LevelFilter::Info;

pub fn log_path() -> PathBuf {
    #[cfg(unix)]
    {
        PathBuf::from("/tmp").join(LOG_FILE_NAME)
    }
    #[cfg(not(unix))]
    {
        std::env::temp_dir().join(LOG_FILE_NAME)
    }
}

/// File sink shared by all records
struct DebugLogger {
    file: Option<std::fs::File>,
}

impl DebugLogger {
    fn new(level: LevelFilter) -> Self {
        match OpenOptions::new().create(true).append(true).open(log_path()) {
            Ok(f) => {
                let mut logger = DebugLogger { file: Some(f) };
                logger.write_raw(&format!(
                    "\n{}\naws-sso-sync session started at {} (level={})\n{}\n",
                    "=".repeat(80),
                    get_timestamp(),
                    level,
                    "=".repeat(80)
                ));
                logger
            }
            // Logging must never stop a sync run
            Err(_) => DebugLogger { file: None },
        }
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }
}

fn get_timestamp() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

/// `log::Log` implementation writing to the debug file (and stderr).
struct LogBridge {
    level: LevelFilter,
    mirror_stderr: bool,
    sink: Mutex<DebugLogger>,
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            get_timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        self.sink.lock().write_raw(&line);
        if self.mirror_stderr {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        if let Some(ref mut file) = self.sink.lock().file {
            let _ = file.flush();
        }
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Parse a level name (`off`, `error`, `warn`, `info`, `debug`, `trace`).
pub fn parse_level(raw: &str) -> Option<LevelFilter> {
    raw.trim().parse().ok()
}

/// Pick the effective level: CLI flag, then RUST_LOG, then info.
fn effective_level(cli_level: Option<LevelFilter>, rust_log: Option<&str>) -> LevelFilter {
    cli_level
        .or_else(|| rust_log.and_then(parse_level))
        .unwrap_or(DEFAULT_LEVEL)
}

/// Install the bridge as the global logger. Later calls are no-ops.
pub fn init_log_bridge(cli_level: Option<LevelFilter>) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let level = effective_level(cli_level, rust_log.as_deref());

    let bridge = BRIDGE.get_or_init(|| LogBridge {
        level,
        mirror_stderr: rust_log.is_some(),
        sink: Mutex::new(DebugLogger::new(level)),
    });

    if log::set_logger(bridge).is_ok() {
        log::set_max_level(bridge.level);
    }
}
