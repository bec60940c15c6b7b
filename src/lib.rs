//! # visited-links - Visited-link notification registry
//!
//! Tracks which on-page link elements want to know whether a URI has been
//! visited, deduplicates the underlying store lookups per URI, and fans out
//! "visited" notifications once per owning context without ever calling an
//! observer while the registry is restructuring itself.
//!
//! ## Core Concepts
//!
//! - **LinkUri**: the identity key for tracking and lookup
//! - **LinkObserver**: an external link-like object; held through a non-owning
//!   `ObserverHandle`
//! - **Owning context**: the isolation domain deliveries are batched by
//! - **VisitedStore**: the external store that answers lookups asynchronously
//! - **TaskDispatcher**: the facility that runs deliveries later
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use visited_links::{LinkUri, ObserverHandle, RegistryConfig, VisitedLinks};
//!
//! let (mut links, store) = VisitedLinks::in_memory(RegistryConfig::default());
//! let uri = LinkUri::parse("https://example.org/")?;
//!
//! links.registry_mut().register(&uri, ObserverHandle::new(&anchor))?;
//! store.record_visit(&uri);
//! links.pump(); // anchor.mark_visited() has now run
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod observer;
pub mod registry;
pub mod store;
pub mod uri;

// Re-export primary types at crate root for convenience
pub use context::{ContextId, DispatchTarget};
pub use dispatch::{DeliveryTask, QueueDispatcher, TaskDispatcher};
pub use error::{LookupError, MisuseError, ValidationError, VisitedError, VisitedResult};
pub use history::{PumpReport, VisitedLinks};
pub use observer::{LinkObserver, ObserverHandle};
pub use registry::{MisusePolicy, RegistryConfig, RegistryStats, VisitedRegistry};
pub use store::{
    visited_signal_channel, CancelOutcome, LookupHandle, MemoryVisitedStore, VisitedSignaller,
    VisitedSignals, VisitedStore,
};
pub use uri::LinkUri;
