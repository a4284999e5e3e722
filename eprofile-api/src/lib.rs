//! # eProfile API Server Library
//!
//! HTTP surface of eProfile: the dashboard API behind session auth, the
//! public card pages, and the payment gateway callbacks.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validating request extractors
//! - `middleware`: Security headers and public rate limiting
//! - `pagination`: Page parameters and response envelope
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod pagination;
pub mod routes;
