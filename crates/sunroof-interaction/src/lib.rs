//! Remote adapters for Sunroof.
//!
//! HTTP implementations of the object storage, memory database and journey
//! listing collaborators, plus a polling reachability observer.

pub mod polling_observer;
pub mod rest_backend;

#[cfg(test)]
mod test_server;

pub use polling_observer::PollingNetworkObserver;
pub use rest_backend::{BackendClient, RestJourneyFetcher, RestMemoryDatabase, RestObjectStorage};
