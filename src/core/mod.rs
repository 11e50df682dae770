// src/core/mod.rs

//! Core data structures and types

pub mod constants;
pub mod error;
pub mod key;
pub mod shots;
pub mod state;
pub mod wire;

// Re-export public types for convenient access via `qflow::core::TypeName`
pub use error::{InterpError, Result, UnsupportedFeature};
pub use key::PrngKey;
pub use shots::{ShotConfig, Shots};
pub use state::StateVector;
pub use wire::Wire;
