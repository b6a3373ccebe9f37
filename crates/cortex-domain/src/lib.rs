//! `cortex-domain` — shared types for the cortex workspace.
//!
//! Every other crate depends on this one for the provider-agnostic
//! message/tool model, the relational data model, config, and the
//! shared error type. Nothing here talks to a network or a database.

pub mod config;
pub mod error;
pub mod models;
pub mod tool;
pub mod trace;
