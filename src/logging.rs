//! Sets up where trace events go.

use std::{
    fs::{create_dir_all, OpenOptions},
    io,
    path::Path,
    sync::Arc,
};
use thiserror::Error as ThisError;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

/// Maps a trace level from `0` (quiet) to `3` (every packet) onto a filter.
pub fn level_for_trace(trace: u8) -> LevelFilter {
    match trace {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber. Only should be called once when the sim
/// starts.
///
/// Events go to stderr, or as JSON to a fresh file under `log_dir` if one is
/// given.
pub fn init(trace: u8, log_dir: Option<&Path>) -> Result<(), LoggingError> {
    let builder = FmtSubscriber::builder().with_max_level(level_for_trace(trace));
    match log_dir {
        Some(log_dir) => {
            create_dir_all(log_dir)?;
            let file_path = log_dir.join(format!(
                "sr-arq-{}.log",
                chrono::offset::Local::now().format("%y-%m-%d_%H-%M-%S")
            ));
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(file_path)?;
            let subscriber = builder.with_writer(Arc::new(file)).json().finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = builder.with_writer(io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[derive(Debug, ThisError)]
pub enum LoggingError {
    #[error("Could not open the log file: {0}")]
    Io(#[from] io::Error),
    #[error("A global subscriber was already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}
