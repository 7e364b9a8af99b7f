//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep outer layers (CLI, transport) decoupled from storage details.

pub mod profile_service;
