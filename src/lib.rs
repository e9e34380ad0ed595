//! Cut flagged speech out of a recording (or keep only it), driven by its transcript.
//!
//! Transcript records are classified against a policy, merged into an
//! interval plan, and rendered by an external media tool.

pub mod classify;
pub mod config;
pub mod error;
pub mod intervals;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod reconstruct;
pub mod transcript;

pub use error::{Error, Result};
