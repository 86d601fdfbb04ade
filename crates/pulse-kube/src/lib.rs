//! # pulse-kube
//!
//! Kubernetes collector for clusterpulse.
//!
//! [`KubeCollector`] lists nodes and pods through the Kubernetes REST API
//! and implements [`pulse_core::Collector`]. [`KubeWatcher`] follows the
//! watch endpoints and turns every event into a content-free trigger for
//! [`pulse_core::Pipeline::run_triggered`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use pulse_core::{Pipeline, PipelineConfig};
//! use pulse_kube::{KubeCollector, KubeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), pulse_kube::KubeError> {
//! let collector = KubeCollector::new(KubeConfig::in_cluster()?)?;
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! pipeline.run_polling(&collector, CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod resources;
pub mod watch;

pub use client::KubeClient;
pub use collector::KubeCollector;
pub use config::KubeConfig;
pub use error::{KubeError, KubeResult};
pub use resources::Resource;
pub use watch::KubeWatcher;
