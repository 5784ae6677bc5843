//! Domain layer: pure models, error kinds and the ports the engine talks through.

pub mod errors;
pub mod models;
pub mod ports;
pub mod text;
