//! Shared node plumbing.

pub mod logging;
