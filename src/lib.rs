// Library surface for headless/integration tests and reuse.
// Terminal rendering stays in the binary.
pub mod analyze;
pub mod app_dirs;
pub mod attempt;
pub mod config;
pub mod export;
pub mod matcher;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod sentences;
pub mod session;
pub mod study;
pub mod survey;
pub mod timer;
pub mod util;
