//! # eProfile Worker Library
//!
//! Background maintenance for eProfile: periodic jobs run by an
//! interval-driven orchestrator.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `jobs`: The `Job` trait and its implementations
//! - `orchestrator`: Sweep loop and shutdown handling

pub mod config;
pub mod jobs;
pub mod orchestrator;
