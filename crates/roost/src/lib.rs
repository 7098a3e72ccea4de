//! Roost control plane library.
//!
//! Each tenant owns a sandboxed directory and at most one long-lived worker
//! process ("bot"). This library provides the supervisor enforcing that
//! invariant, the resource probe and log sink backing its status view, and
//! the HTTP API consuming them.

pub mod api;
pub mod auth;
pub mod config;
pub mod logs;
pub mod probe;
pub mod supervisor;
pub mod tenants;
