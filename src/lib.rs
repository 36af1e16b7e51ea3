//! Multirate - composite in-process rate limiting
//!
//! This crate enforces several independent request windows at once (for
//! example a burst window and a sustained-rate window). Callers can probe
//! without blocking, wait until every window has room, or wait for an evenly
//! paced slot of a single window.

pub mod config;
pub mod error;
pub mod ratelimit;
