pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod plan;
pub mod utils;
