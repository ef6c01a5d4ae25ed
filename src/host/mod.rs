//! Reference host
//!
//! An in-memory write pipeline that fires the versioning triggers around
//! each row write. Used by the CLI and the integration tests.

mod errors;
mod pipeline;

pub use errors::{HostError, HostResult};
pub use pipeline::{AfterStampHook, WritePipeline};
