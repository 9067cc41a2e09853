use std::path::PathBuf;

/// Returns the logs directory, relative to the working directory.
pub fn logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// Ensures directories needed before any processing exist. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(logs_dir())
}
