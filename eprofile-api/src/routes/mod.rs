/// API route handlers
///
/// Handlers are grouped by resource:
///
/// - `health`: liveness and dependency status
/// - `auth`: register, login, refresh, logout, profile
/// - `cards`: card CRUD and username availability
/// - `sections`: social links, services, gallery, testimonials
/// - `leads`: lead inbox
/// - `analytics`: per-card and account-wide statistics
/// - `subscription`: plan state and transition log
/// - `payments`: checkout, webhook, history, invoices
/// - `public`: unauthenticated card pages, contact form, click tracking

pub mod analytics;
pub mod auth;
pub mod cards;
pub mod health;
pub mod leads;
pub mod payments;
pub mod public;
pub mod sections;
pub mod subscription;
