//! TDA (card-emulation slot) sessions
//!
//! Every operation follows the same shape: issue the firmware command, wait
//! up to the TDA timeout for the completion, then copy the result out.

mod manager;
mod records;

pub use manager::{TdaManager, DEFAULT_TDA_TIMEOUT, INVALID_CONNECTION_ID};
pub use records::copy_slots;
