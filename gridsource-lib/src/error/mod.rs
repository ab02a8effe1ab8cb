//! Error types

mod panic;
mod provider;
mod source;
mod view;

pub(crate) use panic::panic_message;
pub use provider::*;
pub use source::*;
pub use view::*;
