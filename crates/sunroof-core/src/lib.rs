//! Core domain of the Sunroof offline sync subsystem.
//!
//! Models and trait seams only; durable storage, HTTP and orchestration live
//! in the infrastructure, interaction and application crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod journey;
pub mod memory;
pub mod network;
pub mod notify;
pub mod storage;

pub use error::{Result, SunroofError};
