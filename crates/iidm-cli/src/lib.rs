pub mod cli;
pub mod config;

pub use cli::{build_cli_command, Cli, Commands, ConvertArgs, DemoNetwork};
pub use config::IidmConfig;
