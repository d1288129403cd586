//! rattrap-core: ratslap adapter, output scraping, and the local settings store.
//!
//! This crate holds everything the desktop and command-line front-ends share
//! for configuring a Logitech G300 through the `ratslap` tool.

pub mod error;
pub mod profile;
pub mod runner;
pub mod scrape;
pub mod session;
pub mod store;
pub mod tool;
