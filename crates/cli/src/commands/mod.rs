//! CLI commands for the EOTS metrics engine.

pub mod process;
pub mod run;
pub mod show_config;

pub use process::{run_process, ProcessArgs};
pub use run::{run_loop, RunArgs};
pub use show_config::run_show_config;
