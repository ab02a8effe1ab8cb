//! Fetch generations and stale-result suppression.

use log::debug;

use super::{Collection, SourceRef};
use crate::error::ProviderError;

/// Identifier of one fetch attempt. Generations only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// No generation issued yet.
    pub const ZERO: Generation = Generation(0);

    /// Returns the raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// What to do with a completed fetch.
pub(crate) enum Outcome<T> {
    /// Latest generation succeeded; replace the raw collection.
    Apply(Collection<T>),
    /// Latest generation failed.
    Fail(ProviderError),
    /// Latest generation was declined by the handler.
    Declined,
    /// A newer generation was issued; drop the result.
    Stale,
}

/// Owns the bound handler and the generation counter.
///
/// Cancellation is cooperative: an in-flight fetch is never aborted, its
/// result is simply classified as [`Outcome::Stale`] once a newer generation
/// exists.
pub(crate) struct FetchCoordinator<T> {
    handler: Option<SourceRef<T>>,
    latest: Generation,
    in_flight: Option<Generation>,
}

impl<T> FetchCoordinator<T> {
    pub(crate) fn new() -> Self {
        Self {
            handler: None,
            latest: Generation::ZERO,
            in_flight: None,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn handler(&self) -> Option<SourceRef<T>> {
        self.handler.clone()
    }

    /// Binds a handler, replacing any bound one.
    pub(crate) fn bind(&mut self, handler: SourceRef<T>) {
        self.handler = Some(handler);
    }

    /// Unbinds the handler. Outstanding generations become stale.
    pub(crate) fn unbind(&mut self) -> Option<SourceRef<T>> {
        self.invalidate();
        self.handler.take()
    }

    /// Latest issued generation.
    pub(crate) fn latest(&self) -> Generation {
        self.latest
    }

    /// Generation currently awaited, if any.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> Option<Generation> {
        self.in_flight
    }

    /// Issues a new generation, superseding every earlier one.
    pub(crate) fn issue(&mut self) -> Generation {
        self.latest = self.latest.next();
        self.in_flight = None;
        debug!("issued fetch generation {}", self.latest);
        self.latest
    }

    /// Records that `generation` is awaiting an asynchronous result.
    pub(crate) fn begin(&mut self, generation: Generation) {
        if generation == self.latest {
            self.in_flight = Some(generation);
        }
    }

    /// Marks every outstanding generation irrelevant without issuing a fetch.
    pub(crate) fn invalidate(&mut self) {
        if self.in_flight.take().is_some() {
            debug!("invalidated in-flight generation {}", self.latest);
        }
        self.latest = self.latest.next();
    }

    /// Classifies the result of `generation`.
    pub(crate) fn complete(
        &mut self,
        generation: Generation,
        result: Result<Option<Collection<T>>, ProviderError>,
    ) -> Outcome<T> {
        if generation != self.latest {
            debug!(
                "discarding stale result of {} (latest is {})",
                generation, self.latest
            );
            return Outcome::Stale;
        }
        self.in_flight = None;
        match result {
            Ok(Some(collection)) => Outcome::Apply(collection),
            Ok(None) => Outcome::Declined,
            Err(error) => Outcome::Fail(error),
        }
    }
}
