use biblio_common::config::ObservabilityConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber
///
/// Without `-v`, `RUST_LOG` wins over the configured level.
pub fn init(config: &ObservabilityConfig, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
