mod events;
mod id;
mod macros;
mod message;
pub mod packet;

pub use crate::events::*;
pub use crate::id::*;
pub use crate::message::*;
