// punkboot library
// Synchronized retro-BIOS boot sequence playback engine

pub mod audio;
pub mod cli;
pub mod config;
pub mod engine;
pub mod jitter;
pub mod logging;
pub mod reveal;
pub mod sched;
pub mod timeline;

pub use cli::Cli;
pub use config::Options;
pub use engine::{BootSequence, DEFAULT_BOOT_LINES};
pub use logging::LogLevel;
