use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug)]
struct FileLogger {
    log_path: PathBuf,
    level: Level,
}

static LOGGER: OnceCell<FileLogger> = OnceCell::new();

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_entry = format!(
                "{} {} [{}] {}\n",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );
            let log_file = self.log_path.join("log.txt");

            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_file) {
                let _ = file.write_all(log_entry.as_bytes());
            }
        }
    }

    fn flush(&self) {}
}

// ~/vibecheck/data, or ./data when there is no home directory.
pub fn log_dir() -> PathBuf {
    dir::home_dir()
        .map(|home| home.join("vibecheck").join("data"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

pub fn init(debug: bool) -> Result<(), SetLoggerError> {
    let log_path = log_dir();
    // Logging is best effort; the logger silently drops lines it cannot write.
    let _ = create_dir_all(&log_path);

    let (level, filter) = if debug {
        (Level::Debug, LevelFilter::Debug)
    } else {
        (Level::Info, LevelFilter::Info)
    };

    let logger = LOGGER.get_or_init(|| FileLogger { log_path, level });
    log::set_logger(logger).map(|()| log::set_max_level(filter))
}
