//! Infrastructure adapters and runtime bootstrap.

pub mod chromium;
pub mod documents;
pub mod downloads;
pub mod error;
pub mod http;
pub mod print;
pub mod telemetry;
