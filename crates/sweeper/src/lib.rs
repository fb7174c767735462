//! Library entrypoint for embedding the sweeper inside other binaries. The
//! binary in `main.rs` runs it standalone next to the API process.

pub mod worker;

pub use worker::{run_sweeper, SweeperError};
