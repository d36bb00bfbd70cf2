//! Patient and triage record services for a clinic workflow.
//!
//! The `pacientes` and `triajes` binaries each serve one router from [`app`];
//! everything else here is shared between them.

pub mod api_doc;
pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod triage_lookup;
pub mod validation;
