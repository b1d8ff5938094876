//! Filesystem side of the render bridge.
//!
//! A process without GPU access hands render jobs to a worker on another
//! host through a shared directory tree. Jobs are published atomically into
//! `queue/`, results are polled for in `output/`, and everything tied to a
//! job id can be reclaimed afterwards. No locks are taken: only the client
//! creates queue entries and only the worker creates result entries.
//!
//! The pure protocol types live in `render_bridge_core` and are re-exported
//! here.

pub mod cleanup;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod layout;
pub mod liveness;
pub mod output;
pub mod queue;

pub use cleanup::CleanupReport;
pub use client::BridgeClient;
pub use config::{BridgeConfig, KindTimeouts};
pub use error::BridgeError;
pub use layout::BridgeLayout;
pub use liveness::LivenessProbe;
pub use output::{FrameSequence, OutputStore};
pub use queue::QueueStore;

pub use render_bridge_core::builders;
pub use render_bridge_core::diagnostics::DiagnosticReport;
pub use render_bridge_core::{
    CoreError, EnvelopeStyle, JobDescriptor, JobId, JobKind, JobStatus, ParamValue, Parameters,
    ResultDescriptor,
};
