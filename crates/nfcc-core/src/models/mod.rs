//! Shared data models for the NFC controller core

mod nci;
mod power;
mod tda;

pub use nci::*;
pub use power::*;
pub use tda::*;
