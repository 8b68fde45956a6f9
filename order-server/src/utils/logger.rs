//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level when set.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Install the global subscriber
///
/// Writes to a daily rolling file under `log_dir` when that directory
/// exists, to stdout otherwise. A second call leaves the first subscriber
/// in place.
pub fn init_logger(level: &str, log_dir: Option<&str>, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, ansi) = match log_dir.map(Path::new).filter(|dir| dir.is_dir()) {
        Some(dir) => (
            BoxMakeWriter::new(tracing_appender::rolling::daily(dir, "order-server.log")),
            false,
        ),
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi && !json)
        .with_writer(writer);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = installed {
        eprintln!("Logger not installed: {e}");
    }
}
