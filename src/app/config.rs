//! Application configuration

/// Settings that apply to the whole process rather than one composition
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self { verbose }
    }

    /// Log filter for the verbosity level; `RUST_LOG` takes precedence when set
    pub fn log_level(&self) -> String {
        if let Ok(filter) = std::env::var("RUST_LOG") {
            if !filter.trim().is_empty() {
                return filter;
            }
        }
        match self.verbose {
            0 => "warn,sm_composer=info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,tower=debug",
        }
        .to_string()
    }

    pub fn show_targets(&self) -> bool {
        self.verbose >= 2
    }

    pub fn show_locations(&self) -> bool {
        self.verbose >= 3
    }
}
