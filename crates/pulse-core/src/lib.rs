//! # pulse-core
//!
//! The state-cache-and-broadcast pipeline behind clusterpulse.
//!
//! ```text
//! Collector -> build -> changed? -> StateStore::swap_if_changed -> Broadcaster::publish
//!                                                                      |
//!                                   StreamSession (one per consumer) <-+
//! ```
//!
//! - [`Collector`] fetches raw cluster facts; failures skip the cycle.
//! - [`builder::build`] normalizes them into a canonical [`ClusterState`].
//! - [`detector::changed`] compares states structurally.
//! - [`StateStore`] holds the single live state behind a read-write lock.
//! - [`Broadcaster`] fans out content-free [`Notification`]s through
//!   bounded per-session buffers, dropping rather than blocking.
//! - [`StreamSession`] delivers a baseline snapshot, then re-reads the store
//!   on every notification.
//!
//! [`ClusterState`]: pulse_proto::ClusterState

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broadcaster;
pub mod builder;
pub mod collector;
pub mod detector;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use broadcaster::{Broadcaster, Notification, PublishReport, SessionId, Subscription};
pub use collector::{CollectFuture, Collector};
pub use error::{CollectionError, CollectionResult};
pub use pipeline::{CycleOutcome, Pipeline, PipelineConfig};
pub use session::{CloseReason, SessionState, StreamSession};
pub use stats::{PipelineStats, StatsSnapshot};
pub use store::{StateStore, StoreSnapshot};
