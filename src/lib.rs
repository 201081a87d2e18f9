pub mod build;
pub mod config;
pub mod directive;
pub mod fs;
pub mod package;
pub mod progs;
pub mod run;
pub mod session;

#[cfg(feature = "logging")]
pub mod logging;

pub use build::{Builder, CyclicGuard};
pub use config::{CmdStyle, Config};
pub use session::BuildSession;
