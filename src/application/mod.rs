//! Application services: report export and PDF generation.

pub mod error;
pub mod export;
pub mod render;
