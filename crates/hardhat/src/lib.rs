/// Hardhat integration for the token generator
pub mod hardhat;
pub mod runner;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use hardhat::{constructor_args_module, write_constructor_args, Hardhat};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
