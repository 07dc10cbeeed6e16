use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Writer guards; keep alive so the non-blocking writers flush on exit.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Installs the global subscriber: stderr, plus a daily-rolling file when
/// `cfg.directory` is set. `RUST_LOG` overrides `cfg.level`.
///
/// Records go to stdout, so logs stay on stderr.
pub fn init(cfg: &LoggingConfig) -> anyhow::Result<LogGuards> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cfg.level))?;

    let (stderr_nb, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let mut guards = vec![stderr_guard];

    let file_layer = match &cfg.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, &cfg.file_name);
            let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stderr_nb))
        .with(file_layer)
        .try_init()?;

    Ok(LogGuards { _guards: guards })
}
