//! # pulse-proto
//!
//! Data model shared by the clusterpulse crates.
//!
//! - [`ClusterState`]: an immutable, canonically ordered snapshot of the
//!   cluster's nodes and the workloads placed on them.
//! - [`RawSnapshot`]: the un-normalized facts a collector returns, before
//!   they are turned into a [`ClusterState`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod raw;
pub mod types;

pub use error::{BuildError, ParsePhaseError};
pub use raw::{RawNode, RawSnapshot, RawWorkload};
pub use types::{ClusterState, NodeEntry, NodeStatus, WorkloadEntry, WorkloadPhase};
