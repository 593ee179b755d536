// vidlabel-cli/src/lib.rs
//
// Library portion of the vidlabel CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, CompareArgs, ExtractArgs, InfoArgs, RunArgs};
pub use commands::compare::run_compare;
pub use commands::extract::run_extract;
pub use commands::info::run_info;
pub use commands::run::run_run;
