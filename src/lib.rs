//! Library exports for carino-client, shared with the integration tests.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod login;
pub mod metrics;
pub mod models;
pub mod navigation;
pub mod session;
pub mod startup;
pub mod state;
pub mod utils;
