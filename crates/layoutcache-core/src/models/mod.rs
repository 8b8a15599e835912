//! Data models: learned templates and configuration.

pub mod config;
pub mod template;
