//! services/api/src/lib.rs
//!
//! The SmartStudy Copilot HTTP service: adapters for every core port, the
//! configuration layer and the axum web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
