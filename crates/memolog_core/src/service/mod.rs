//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep HTTP/CLI layers decoupled from storage and backend details.

pub mod analyzer;
pub mod article_service;
pub mod feedback_service;
pub mod generator;
