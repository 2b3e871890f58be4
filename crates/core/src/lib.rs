//! Core business logic for agora.
//!
//! The two engines, [`VoteEngine`] and [`paginate`], are written against the
//! [`VoteStore`] and [`ScanSource`] traits. [`memory`] holds in-memory
//! implementations of both.

pub mod memory;
pub mod services;

pub use services::*;
