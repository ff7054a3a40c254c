//! Tracing setup. Events go to stderr so stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "LABBOOK_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "labbook=debug,labbook_core=debug"
    } else {
        "labbook=warn,labbook_core=warn"
    }
}

pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
