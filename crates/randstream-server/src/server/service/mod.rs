//! HTTP surface of the service.
//!
//! ## Structure
//!
//! - [`handler`] - the upgrade route, shared state and per-socket driver.

pub mod handler;
