//! Process-wide tracing setup shared by the binaries.

/// Initialize structured logging for the process.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber construction (filter, format).
pub mod tracing;
