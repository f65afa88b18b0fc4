#![doc = include_str!("../README.md")]

pub mod server;

pub use server::config::{CliArgs, ServerConfig};
pub use server::serve;
pub use server::service::handler::{AppState, router};
