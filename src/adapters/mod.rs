// Adapters - External system implementations

pub mod player_libav;
pub mod tracing_log;

// Re-export adapters
pub use player_libav::{LibavMediaElement, LibavMediaLoader, LibavRecorder};
pub use tracing_log::init_logging;
