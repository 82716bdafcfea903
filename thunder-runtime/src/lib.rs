//! Sherlock Thunder Runtime
//!
//! Coordinates a lookup end to end:
//! - **Orchestrator**: runs independent probes concurrently under a worker
//!   cap and unions their results
//! - **Analysis**: scores discovered handles against the target
//! - **Report**: renders the static HTML report

pub mod orchestrator;
pub mod analysis;
pub mod report;

pub use orchestrator::*;
pub use analysis::*;
pub use report::*;
