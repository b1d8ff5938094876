//! Protocol types for the filesystem render bridge.
//!
//! Everything here is pure: job and result envelopes, the typed job
//! builders, and the log parsing used by diagnostics. Reading and writing
//! the shared directories lives in the `render-bridge` crate.

pub mod builders;
pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod job;
pub mod kind;
pub mod params;
pub mod result;

pub use builders::JobBuilder;
pub use error::CoreError;
pub use ids::JobId;
pub use job::JobDescriptor;
pub use kind::{EnvelopeStyle, JobKind};
pub use params::{ParamValue, Parameters};
pub use result::{JobStatus, ResultDescriptor};
