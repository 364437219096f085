//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bridge.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Data flow
//! remote-write payload -> `Vec<Sample>` -> rule filter -> fan-out to every `SampleSink`

mod config;
mod error;
mod sample;
mod sink;

pub use config::*;
pub use error::*;
pub use sample::*;
pub use sink::*;
