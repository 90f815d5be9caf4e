//! This module provides observability hooks for the writer and reader.
//!
//! Encoding decisions (dictionary fallback, page sealing, schema resolution path)
//! are worth seeing when a file looks odd. The `log_metric!` macro emits them as
//! structured key/value records through the `log` facade. It is compiled out of
//! release builds, so calls cost nothing in production.
//!
//! Applications that do not install their own logger can call [`init_logging`].

use std::fs::OpenOptions;
use std::sync::Once;

use log::LevelFilter;

use crate::error::ColumnarError;

/// Logs a structured key-value metric record at debug level, only in debug builds.
///
/// # Example
/// ```
/// use parquet_columnar::log_metric;
/// let pages = 4;
/// log_metric!("event"="seal_page", "column"="id", "pages"=&pages);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::debug!(target: "columnar_metric", "COLUMNAR_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend at `Info` level (overridable with `RUST_LOG`),
/// optionally appending to `log_file` instead of stderr. Later calls are no-ops.
pub fn init_logging(log_file: Option<&str>) -> Result<(), ColumnarError> {
    let target = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(LevelFilter::Info);
        builder.parse_default_env();

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = target {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        assert!(init_logging(None).is_ok());
        assert!(init_logging(None).is_ok());
        log_metric!("event" = "test", "value" = 1);
    }

    #[test]
    fn test_init_logging_reports_bad_path() {
        let result = init_logging(Some("/nonexistent-dir/for/sure/log.txt"));
        assert!(matches!(result, Err(ColumnarError::Io(_))));
    }
}
