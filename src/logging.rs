use anyhow::Result;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize structured logging system.
///
/// Console output goes to stderr, so query results on stdout stay clean.
/// When `log_file` is set, a daily-rotated JSON log is written next to it;
/// keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(log_level: Option<&str>, json_console: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Set up environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            let level = log_level.unwrap_or("info");
            EnvFilter::try_new(level)
        })
        .map_err(|e| anyhow::anyhow!("Failed to create log filter: {}", e))?;

    let registry = Registry::default().with(env_filter);

    let console_layer = if json_console {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .boxed()
    };

    let guard = if let Some(log_path) = log_file {
        let directory = log_path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = log_path.file_name().unwrap_or_else(|| "imessage-search.log".as_ref());
        let file_appender = rolling::daily(directory, file_name);
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(true)
            .json();

        registry
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
        Some(guard)
    } else {
        registry
            .with(console_layer)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {}", e))?;
        None
    };

    info!("Logging system initialized");
    Ok(guard)
}

/// Wall-clock timer for one pipeline stage.
///
/// A timer dropped without [`StageTimer::finish`] means the stage bailed out
/// early, which is logged at warn level.
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
    finished: bool,
}

impl StageTimer {
    /// Start timing `stage`
    #[must_use]
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Log and return the elapsed time
    pub fn finish(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.finished = true;
        info!(stage = self.stage, elapsed_ms = elapsed.as_millis(), "Stage completed");
        elapsed
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if !self.finished && !std::thread::panicking() {
            warn!(
                stage = self.stage,
                elapsed_ms = self.start.elapsed().as_millis(),
                "Stage ended early"
            );
        }
    }
}
