//! Fetching collections from the trigger handler.
//!
//! The [`TriggerHandler`] is the caller-supplied provider. Each delegated
//! trigger issues a new [`Generation`]; only the result of the latest
//! generation is ever applied.

mod coordinator;
mod provider;

pub use coordinator::Generation;
pub(crate) use coordinator::{FetchCoordinator, Outcome};
pub use provider::*;
