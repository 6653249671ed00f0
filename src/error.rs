use std::path::PathBuf;

/// Failures that abort a whole document run.
///
/// Row-level problems never surface here; they become a
/// [`crate::event::SkipReason`] and the run continues.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetch {url}: http status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("read source {path}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read calendar {path}")]
    LoadCalendar {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse calendar {path}: {message}")]
    ParseCalendar { path: PathBuf, message: String },

    #[error("create output dir {path}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write calendar {path}")]
    WriteCalendar {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read config {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),
}
