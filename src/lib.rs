// Imgway image gateway library

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;
