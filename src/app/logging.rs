//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace};

/// Initialize tracing for the process; logs go to stderr so documents
/// printed on stdout stay parseable
pub fn init_logging(config: &AppConfig) {
    let filter = config.log_level();

    let initialized = tracing_subscriber::fmt()
        .with_env_filter(filter.as_str())
        .with_writer(std::io::stderr)
        .with_target(config.show_targets())
        .with_thread_ids(config.show_locations())
        .with_line_number(config.show_locations())
        .try_init();

    if initialized.is_ok() {
        debug!("sm-composer started with verbosity level: {}", config.verbose);
        trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    }
}
