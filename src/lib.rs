//! LPI report export pipeline and headless PDF render service.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
