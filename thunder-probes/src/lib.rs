//! Sherlock Thunder Probes
//!
//! Independent sources of associated account handles:
//! - **Tool probes**: run an external enumeration tool (Sherlock, Maigret)
//!   and read back its JSON report
//! - **GitHub age lookup**: account creation dates fetched through the
//!   resilient client, used by identity scoring

pub mod traits;
pub mod parse;
pub mod tool;
pub mod github;

pub use traits::*;
pub use parse::*;
pub use tool::*;
pub use github::*;
