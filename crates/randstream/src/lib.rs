#![doc = include_str!("../README.md")]

mod address;
mod channel;
mod error;
pub mod frame;
mod pool;
mod rand;
mod registry;
mod service;
mod session;
#[cfg(test)]
mod testing;
mod value;

pub use crate::address::*;
pub use crate::channel::*;
pub use crate::error::*;
pub use crate::frame::{CloseFrame, DUPLICATE_ADDRESS_REASON, ValueFrame, close_code};
pub use crate::pool::*;
pub use crate::rand::*;
pub use crate::registry::*;
pub use crate::service::*;
pub use crate::session::*;
pub use crate::value::*;
