// src/utils/mod.rs
//! Configuration and error types

pub mod config;
pub mod errors;
