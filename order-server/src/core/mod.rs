//! Core: configuration and background task management
//!
//! - [`Config`] - engine configuration from the environment
//! - [`BackgroundTasks`] - background task registry

pub mod config;
pub mod tasks;

pub use config::Config;
pub use tasks::{BackgroundTasks, TaskKind};
