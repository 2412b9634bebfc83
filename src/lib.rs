//! Library entry point for the sonarctl CLI.

pub mod commands;
pub mod compose;
pub mod config;
pub mod error;
pub mod install;
pub mod model;
pub mod orchestrator;
pub mod platform;
pub mod prompt;
pub mod readiness;
pub mod runner;
pub mod scanner;
pub mod settings;
pub mod sonar;
pub mod token_store;
pub mod utils;
