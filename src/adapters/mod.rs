//! Adapters implementing the domain ports.

pub mod backend;
pub mod store;
