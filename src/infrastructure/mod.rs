//! Infrastructure layer module
//!
//! Configuration loading, logging setup, and child process management.

pub mod config;
pub mod logging;
pub mod process;
