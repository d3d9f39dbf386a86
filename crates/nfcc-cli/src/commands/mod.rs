//! Command implementations for nfcc

pub mod dyn_config;
pub mod power;
pub mod tda;

pub use dyn_config::dyn_config;
pub use power::{level, mode, status, ActivityArg, LevelArg, ScreenOffArg};
pub use tda::{discover, exchange};
