//! Counters describing how the token refresh machinery behaves.
//!
//! This module provides centralized stats recording for the auth client.

mod stats;

pub use stats::{RefreshStats, StatsSnapshot};
