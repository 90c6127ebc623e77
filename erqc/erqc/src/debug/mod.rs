mod log;
mod messages;

pub use crate::debug::log::*;
pub use messages::MessageLogger;
